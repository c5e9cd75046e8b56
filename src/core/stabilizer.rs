//! Temporal Stabilizer: exponential moving average with a pass streak
//!
//! The averaged vector, not the raw one, is judged against the criteria
//! table. A streak of passing averages is what unlocks capture.

use serde::Serialize;

use crate::types::{QualityCriteria, QualityVector, ReasonCode};
use crate::EMA_WEIGHT;

/// Session-scoped stabilizer state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StabilizedState {
    /// Running average, None until the first sample
    pub average: Option<QualityVector>,
    /// Consecutive samples whose average passed the criteria
    pub consecutive_pass_count: u32,
    /// Samples folded in since the last reset
    pub samples: u64,
}

/// Result of folding one sample
#[derive(Debug, Clone, PartialEq)]
pub struct StabilizedReading {
    pub average: QualityVector,
    /// Failing reasons on the average, highest priority first
    pub failures: Vec<ReasonCode>,
    pub consecutive_pass_count: u32,
}

impl StabilizedReading {
    pub fn passes(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Exponential moving average stabilizer
#[derive(Debug, Clone)]
pub struct TemporalStabilizer {
    weight: f64,
    criteria: QualityCriteria,
    state: StabilizedState,
}

impl Default for TemporalStabilizer {
    fn default() -> Self {
        Self::new(EMA_WEIGHT, QualityCriteria::default())
    }
}

impl TemporalStabilizer {
    /// `weight` is the share of each new sample, in (0, 1]
    pub fn new(weight: f64, criteria: QualityCriteria) -> Self {
        Self {
            weight: weight.clamp(f64::EPSILON, 1.0),
            criteria,
            state: StabilizedState::default(),
        }
    }

    /// Fold one vector into the average and update the streak
    pub fn push(&mut self, sample: &QualityVector) -> StabilizedReading {
        let average = match self.state.average {
            Some(prev) => prev.blend(sample, self.weight),
            None => *sample,
        };
        self.state.average = Some(average);
        self.state.samples += 1;

        let failures = self.criteria.failures(&average);
        if failures.is_empty() {
            self.state.consecutive_pass_count += 1;
        } else {
            self.state.consecutive_pass_count = 0;
        }

        StabilizedReading {
            average,
            failures,
            consecutive_pass_count: self.state.consecutive_pass_count,
        }
    }

    /// Drop the streak without touching the average (frame had no usable face)
    pub fn break_streak(&mut self) {
        self.state.consecutive_pass_count = 0;
    }

    /// Discard all state (session start or cancel)
    pub fn reset(&mut self) {
        self.state = StabilizedState::default();
    }

    pub fn state(&self) -> &StabilizedState {
        &self.state
    }

    pub fn criteria(&self) -> &QualityCriteria {
        &self.criteria
    }

    pub fn consecutive_pass_count(&self) -> u32 {
        self.state.consecutive_pass_count
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn nominal() -> QualityVector {
        QualityVector {
            face_area_fraction: 0.30,
            sharpness: 0.9,
            brightness: 0.5,
            contrast: 0.6,
            pose_deviation: 5.0,
            eye_openness: 0.9,
        }
    }

    #[test]
    fn test_first_sample_seeds_average() {
        let mut stabilizer = TemporalStabilizer::default();
        let reading = stabilizer.push(&nominal());
        assert_eq!(reading.average, nominal());
        assert_eq!(reading.consecutive_pass_count, 1);
    }

    #[test]
    fn test_average_uses_weight() {
        let mut stabilizer = TemporalStabilizer::default();
        stabilizer.push(&nominal());
        let reading = stabilizer.push(&QualityVector { pose_deviation: 45.0, ..nominal() });
        // 0.3 * 45 + 0.7 * 5
        assert!((reading.average.pose_deviation - 17.0).abs() < 1e-9);
        assert!(reading.passes());
    }

    #[test]
    fn test_single_bad_frame_does_not_flicker() {
        let mut stabilizer = TemporalStabilizer::default();
        for _ in 0..5 {
            stabilizer.push(&nominal());
        }
        let reading = stabilizer.push(&QualityVector { face_area_fraction: 0.05, ..nominal() });
        assert!(reading.passes());
        assert_eq!(reading.consecutive_pass_count, 6);
    }

    #[test]
    fn test_failing_average_resets_streak() {
        let mut stabilizer = TemporalStabilizer::default();
        stabilizer.push(&nominal());
        stabilizer.push(&nominal());
        let reading = stabilizer.push(&QualityVector { sharpness: 0.0, ..nominal() });
        // 0.7 * 0.9 = 0.63 still passes; a second blurry frame does not
        assert!(reading.passes());
        let reading = stabilizer.push(&QualityVector { sharpness: 0.0, ..nominal() });
        assert_eq!(reading.failures, vec![ReasonCode::BlurryImage]);
        assert_eq!(reading.consecutive_pass_count, 0);
    }

    #[test]
    fn test_break_streak_keeps_average() {
        let mut stabilizer = TemporalStabilizer::default();
        stabilizer.push(&nominal());
        stabilizer.push(&nominal());
        stabilizer.break_streak();
        assert_eq!(stabilizer.consecutive_pass_count(), 0);
        assert_eq!(stabilizer.state().average, Some(nominal()));
    }

    #[test]
    fn test_reset() {
        let mut stabilizer = TemporalStabilizer::default();
        stabilizer.push(&nominal());
        stabilizer.reset();
        assert_eq!(stabilizer.state(), &StabilizedState::default());
    }
}
