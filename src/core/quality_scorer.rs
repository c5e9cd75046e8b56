//! Quality Scorer: one FrameSignals → one QualityVector
//!
//! Pure mapping from detector output:
//! - face area = bbox area (coordinates are normalized, frame area = 1)
//! - pose deviation = max(|yaw|, |pitch|, |roll|)
//! - sharpness = 1 - exp(-laplacian_variance / SHARPNESS_SCALE)
//! - brightness = mean_luma / 255 (exposure level, judged against a band)
//! - contrast = luma_std_dev / CONTRAST_FULL_STD_DEV, capped at 1

use crate::types::{FrameSignals, QualityVector, ReasonCode};
use crate::{CONTRAST_FULL_STD_DEV, SHARPNESS_SCALE};

/// Quality scorer for single frames
#[derive(Debug, Default, Clone, Copy)]
pub struct QualityScorer;

impl QualityScorer {
    /// Create new scorer
    pub fn new() -> Self {
        Self
    }

    /// Score one frame. Face count ≠ 1 is terminal for the frame.
    pub fn score(&self, frame: &FrameSignals) -> Result<QualityVector, ReasonCode> {
        let face = match frame.face_count() {
            0 => return Err(ReasonCode::NoFaceDetected),
            1 => &frame.faces[0],
            _ => return Err(ReasonCode::MultipleFaces),
        };

        let eye_openness = face.eye_openness.unwrap_or(face.landmark_confidence);

        Ok(QualityVector {
            face_area_fraction: unit(face.bbox.area()),
            sharpness: sharpness_score(frame.pixels.laplacian_variance),
            brightness: unit(frame.pixels.mean_luma / 255.0),
            contrast: unit(frame.pixels.luma_std_dev / CONTRAST_FULL_STD_DEV),
            pose_deviation: finite_or(frame.pose.deviation(), f64::MAX),
            eye_openness: unit(eye_openness),
        })
    }
}

/// Saturating map of Laplacian variance into [0, 1)
pub fn sharpness_score(laplacian_variance: f64) -> f64 {
    if !laplacian_variance.is_finite() || laplacian_variance <= 0.0 {
        return 0.0;
    }
    1.0 - (-laplacian_variance / SHARPNESS_SCALE).exp()
}

/// Clamp to [0, 1]; NaN → 0
fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

// =============================================================================
// TESTS
// =============================================================================
