//! Liveness Evaluator: anti-spoofing over an ordered frame window
//!
//! Three independent cues, equally weighted:
//! - motion plausibility: consecutive frames neither identical nor jumping
//! - depth/texture: pose parallax present, pixel texture in the live band
//! - landmark continuity: no implausible landmark jumps between frames
//!
//! Fails closed. Any malformed frame yields confidence 0 with the defect named
//! in the evidence; nothing escapes to the caller as an error.

use tracing::{debug, trace};

use crate::types::{FrameSignals, LivenessEvidence, LivenessResult};
use crate::LIVE_THRESHOLD;

/// Per-step displacement below this counts as a frozen frame
pub const MOTION_MIN: f64 = 0.002;

/// Per-step displacement above this counts as a jump
pub const MOTION_MAX: f64 = 0.25;

/// Pose range (degrees) across the window for full depth credit
pub const DEPTH_POSE_RANGE_DEG: f64 = 4.0;

/// Laplacian variance band of live skin at capture distance
pub const TEXTURE_LAPLACIAN_MIN: f64 = 20.0;
pub const TEXTURE_LAPLACIAN_MAX: f64 = 2000.0;

/// Minimum luma spread for a textured face
pub const TEXTURE_STD_DEV_MIN: f64 = 12.0;

/// Largest plausible single-step landmark displacement (normalized)
pub const LANDMARK_JUMP_MAX: f64 = 0.08;

/// One independent anti-spoofing signal
///
/// `frames` is validated before any cue sees it: at least two frames,
/// increasing timestamps, one face each, matching non-empty landmark sets.
pub trait LivenessCue: Send + Sync {
    fn name(&self) -> &'static str;

    /// Score in [0, 1], 1 = consistent with a live subject
    fn score(&self, frames: &[FrameSignals]) -> f64;
}

/// Inter-frame displacement of face center plus pose change
#[derive(Debug, Default)]
pub struct MotionCue;

impl LivenessCue for MotionCue {
    fn name(&self) -> &'static str {
        "motion"
    }

    fn score(&self, frames: &[FrameSignals]) -> f64 {
        let plausible = frames
            .windows(2)
            .filter(|pair| {
                (MOTION_MIN..=MOTION_MAX).contains(&displacement(&pair[0], &pair[1]))
            })
            .count();
        plausible as f64 / (frames.len() - 1) as f64
    }
}

/// Pose parallax and pixel texture
#[derive(Debug, Default)]
pub struct DepthTextureCue;

impl LivenessCue for DepthTextureCue {
    fn name(&self) -> &'static str {
        "depth_texture"
    }

    fn score(&self, frames: &[FrameSignals]) -> f64 {
        // A flat print moved in front of the camera yields a near-constant pose
        let (yaw_range, pitch_range) = (
            range(frames.iter().map(|f| f.pose.yaw)),
            range(frames.iter().map(|f| f.pose.pitch)),
        );
        let depth = (yaw_range.max(pitch_range) / DEPTH_POSE_RANGE_DEG).min(1.0);

        let textured = frames
            .iter()
            .filter(|f| {
                let lap = f.pixels.laplacian_variance;
                (TEXTURE_LAPLACIAN_MIN..=TEXTURE_LAPLACIAN_MAX).contains(&lap)
                    && f.pixels.luma_std_dev >= TEXTURE_STD_DEV_MIN
            })
            .count();
        let mut texture = textured as f64 / frames.len() as f64;

        // Live sensor noise never repeats exactly
        if range(frames.iter().map(|f| f.pixels.laplacian_variance)) < 1e-6 {
            texture *= 0.5;
        }

        (depth + texture) / 2.0
    }
}

/// Landmark positions move smoothly between consecutive frames
#[derive(Debug, Default)]
pub struct LandmarkContinuityCue;

impl LivenessCue for LandmarkContinuityCue {
    fn name(&self) -> &'static str {
        "landmark_continuity"
    }

    fn score(&self, frames: &[FrameSignals]) -> f64 {
        let continuous = frames
            .windows(2)
            .filter(|pair| {
                let a = &pair[0].faces[0].landmarks;
                let b = &pair[1].faces[0].landmarks;
                a.iter()
                    .zip(b.iter())
                    .map(|(p, q)| distance((p[0], p[1]), (q[0], q[1])))
                    .fold(0.0_f64, f64::max)
                    <= LANDMARK_JUMP_MAX
            })
            .count();
        continuous as f64 / (frames.len() - 1) as f64
    }
}

/// Liveness evaluator combining the three cues
#[derive(Debug)]
pub struct LivenessEvaluator {
    motion: MotionCue,
    depth_texture: DepthTextureCue,
    landmarks: LandmarkContinuityCue,
    live_threshold: f64,
}

impl Default for LivenessEvaluator {
    fn default() -> Self {
        Self::new(LIVE_THRESHOLD)
    }
}

impl LivenessEvaluator {
    pub fn new(live_threshold: f64) -> Self {
        Self {
            motion: MotionCue,
            depth_texture: DepthTextureCue,
            landmarks: LandmarkContinuityCue,
            live_threshold,
        }
    }

    /// Evaluate an ordered authentication window
    pub fn evaluate(&self, frames: &[FrameSignals]) -> LivenessResult {
        if let Err(defect) = validate(frames) {
            debug!(%defect, frames = frames.len(), "liveness input rejected");
            return LivenessResult::malformed(defect);
        }

        let cues: [&dyn LivenessCue; 3] = [&self.motion, &self.depth_texture, &self.landmarks];
        let scores: Vec<f64> = cues.iter().map(|cue| cue.score(frames).clamp(0.0, 1.0)).collect();
        for (cue, score) in cues.iter().zip(&scores) {
            trace!(cue = cue.name(), score, "liveness cue scored");
        }
        let confidence = (scores.iter().sum::<f64>() / scores.len() as f64).clamp(0.0, 1.0);

        let result = LivenessResult {
            is_live: confidence > self.live_threshold,
            confidence,
            evidence: LivenessEvidence {
                motion: scores[0],
                depth_texture: scores[1],
                landmark_continuity: scores[2],
                defect: None,
            },
        };
        debug!(confidence, summary = %result.evidence_summary(), "liveness evaluated");
        result
    }
}

/// Check the structural preconditions every cue relies on
fn validate(frames: &[FrameSignals]) -> Result<(), String> {
    if frames.len() < 2 {
        return Err(format!("need at least 2 frames, got {}", frames.len()));
    }

    let mut landmark_count = None;
    for (i, frame) in frames.iter().enumerate() {
        let face = frame
            .single_face()
            .ok_or_else(|| format!("frame {} has {} faces", i, frame.face_count()))?;

        if !face.bbox.is_finite() || !frame.pose.is_finite() || !frame.pixels.is_finite() {
            return Err(format!("frame {} has non-finite values", i));
        }
        if face.landmarks.is_empty() {
            return Err(format!("frame {} has no landmarks", i));
        }
        if face.landmarks.iter().flatten().any(|c| !c.is_finite()) {
            return Err(format!("frame {} has non-finite landmarks", i));
        }
        match landmark_count {
            None => landmark_count = Some(face.landmarks.len()),
            Some(n) if n != face.landmarks.len() => {
                return Err(format!("frame {} has {} landmarks, expected {}", i, face.landmarks.len(), n));
            }
            Some(_) => {}
        }
        if i > 0 && frame.timestamp_ms <= frames[i - 1].timestamp_ms {
            return Err(format!("frame {} is out of order", i));
        }
    }
    Ok(())
}

/// Face-center distance plus the largest pose change scaled to a quarter turn
fn displacement(a: &FrameSignals, b: &FrameSignals) -> f64 {
    let center = distance(a.faces[0].bbox.center(), b.faces[0].bbox.center());
    let pose = (a.pose.yaw - b.pose.yaw)
        .abs()
        .max((a.pose.pitch - b.pose.pitch).abs())
        .max((a.pose.roll - b.pose.roll).abs());
    center + pose / 90.0
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

fn range(values: impl Iterator<Item = f64>) -> f64 {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min.is_finite() && max.is_finite() {
        max - min
    } else {
        0.0
    }
}

// =============================================================================
// TESTS
// =============================================================================
