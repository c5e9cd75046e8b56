//! Quality vector and the criteria table it is judged against

use serde::{Deserialize, Serialize};

use crate::types::ReasonCode;
use crate::{
    BRIGHTNESS_MAX, BRIGHTNESS_MIN, CONTRAST_MIN, EYE_OPENNESS_MIN, FACE_AREA_MAX, FACE_AREA_MIN,
    POSE_DEVIATION_MAX_DEG, SHARPNESS_MIN,
};

/// Normalized per-frame quality scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityVector {
    /// Face bounding box area / frame area
    pub face_area_fraction: f64,
    /// 0.0-1.0, higher = sharper
    pub sharpness: f64,
    /// Exposure level 0.0-1.0
    pub brightness: f64,
    /// 0.0-1.0
    pub contrast: f64,
    /// Degrees from frontal
    pub pose_deviation: f64,
    /// 0.0-1.0
    pub eye_openness: f64,
}

impl QualityVector {
    /// Field-wise `weight * next + (1 - weight) * self`
    pub fn blend(&self, next: &QualityVector, weight: f64) -> QualityVector {
        let mix = |old: f64, new: f64| weight * new + (1.0 - weight) * old;
        QualityVector {
            face_area_fraction: mix(self.face_area_fraction, next.face_area_fraction),
            sharpness: mix(self.sharpness, next.sharpness),
            brightness: mix(self.brightness, next.brightness),
            contrast: mix(self.contrast, next.contrast),
            pose_deviation: mix(self.pose_deviation, next.pose_deviation),
            eye_openness: mix(self.eye_openness, next.eye_openness),
        }
    }
}

/// Acceptable range for each quality field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityCriteria {
    pub face_area_min: f64,
    pub face_area_max: f64,
    pub sharpness_min: f64,
    pub brightness_min: f64,
    pub brightness_max: f64,
    pub contrast_min: f64,
    pub pose_deviation_max: f64,
    pub eye_openness_min: f64,
}

impl Default for QualityCriteria {
    fn default() -> Self {
        Self {
            face_area_min: FACE_AREA_MIN,
            face_area_max: FACE_AREA_MAX,
            sharpness_min: SHARPNESS_MIN,
            brightness_min: BRIGHTNESS_MIN,
            brightness_max: BRIGHTNESS_MAX,
            contrast_min: CONTRAST_MIN,
            pose_deviation_max: POSE_DEVIATION_MAX_DEG,
            eye_openness_min: EYE_OPENNESS_MIN,
        }
    }
}

impl QualityCriteria {
    /// Every failing reason, deduplicated, highest priority first
    pub fn failures(&self, v: &QualityVector) -> Vec<ReasonCode> {
        let mut reasons = Vec::new();

        if v.brightness < self.brightness_min || v.brightness > self.brightness_max {
            reasons.push(ReasonCode::PoorLighting);
        }
        if v.contrast <= self.contrast_min {
            reasons.push(ReasonCode::PoorLighting);
        }
        if v.sharpness <= self.sharpness_min {
            reasons.push(ReasonCode::BlurryImage);
        }
        if v.pose_deviation > self.pose_deviation_max {
            reasons.push(ReasonCode::InvalidPose);
        }
        if v.face_area_fraction < self.face_area_min {
            reasons.push(ReasonCode::TooFarAway);
        } else if v.face_area_fraction > self.face_area_max {
            reasons.push(ReasonCode::TooClose);
        }
        if v.eye_openness <= self.eye_openness_min {
            reasons.push(ReasonCode::EyesClosed);
        }

        reasons.sort_by_key(|r| r.priority());
        reasons.dedup();
        reasons
    }

    pub fn passes(&self, v: &QualityVector) -> bool {
        self.failures(v).is_empty()
    }
}

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
    fn test_nominal_passes() {
        assert!(QualityCriteria::default().passes(&nominal()));
    }

    #[test]
    fn test_face_area_bounds() {
        let criteria = QualityCriteria::default();
        let far = QualityVector { face_area_fraction: 0.10, ..nominal() };
        let close = QualityVector { face_area_fraction: 0.70, ..nominal() };
        assert_eq!(criteria.failures(&far), vec![ReasonCode::TooFarAway]);
        assert_eq!(criteria.failures(&close), vec![ReasonCode::TooClose]);

        // Inclusive range ends
        let edge = QualityVector { face_area_fraction: 0.15, ..nominal() };
        assert!(criteria.passes(&edge));
        let edge = QualityVector { face_area_fraction: 0.60, ..nominal() };
        assert!(criteria.passes(&edge));
    }

    #[test]
    fn test_strict_thresholds() {
        let criteria = QualityCriteria::default();
        let v = QualityVector { sharpness: 0.6, ..nominal() };
        assert_eq!(criteria.failures(&v), vec![ReasonCode::BlurryImage]);
        let v = QualityVector { pose_deviation: 30.0, ..nominal() };
        assert!(criteria.passes(&v));
    }

    #[test]
    fn test_failures_are_ordered_and_deduplicated() {
        let v = QualityVector {
            face_area_fraction: 0.05,
            sharpness: 0.1,
            brightness: 0.95,
            contrast: 0.1,
            pose_deviation: 45.0,
            eye_openness: 0.2,
        };
        assert_eq!(
            QualityCriteria::default().failures(&v),
            vec![
                ReasonCode::PoorLighting,
                ReasonCode::BlurryImage,
                ReasonCode::InvalidPose,
                ReasonCode::TooFarAway,
                ReasonCode::EyesClosed,
            ]
        );
    }

    #[test]
    fn test_failures_follow_reason_priority() {
        let v = QualityVector {
            face_area_fraction: 0.9,
            sharpness: 0.1,
            eye_openness: 0.1,
            ..nominal()
        };
        let reasons = QualityCriteria::default().failures(&v);
        assert_eq!(reasons, vec![ReasonCode::BlurryImage, ReasonCode::TooClose, ReasonCode::EyesClosed]);
        assert!(reasons.windows(2).all(|w| w[0].priority() <= w[1].priority()));
    }

    #[test]
    fn test_blend() {
        let a = nominal();
        let b = QualityVector { sharpness: 0.0, ..nominal() };
        let mixed = a.blend(&b, 0.3);
        assert!((mixed.sharpness - 0.63).abs() < 1e-9);
        assert!((mixed.face_area_fraction - 0.30).abs() < 1e-9);
    }
}
