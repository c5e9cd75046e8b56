//! Detector output for one analyzed camera frame

use serde::{Deserialize, Serialize};

/// Face bounding box in normalized (0-1) frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Area as a fraction of the (unit) frame
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Center point
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

/// Head pose angles in degrees, 0 = frontal
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl HeadPose {
    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Largest absolute angle
    pub fn deviation(&self) -> f64 {
        self.yaw.abs().max(self.pitch.abs()).max(self.roll.abs())
    }

    pub fn is_finite(&self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite() && self.roll.is_finite()
    }
}

/// One detected face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    pub bbox: BoundingBox,
    /// Landmark detector confidence (0.0-1.0)
    pub landmark_confidence: f64,
    /// Eye aspect score from the landmark detector (0.0-1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eye_openness: Option<f64>,
    /// Landmark positions in normalized frame coordinates
    #[serde(default)]
    pub landmarks: Vec<[f64; 2]>,
}

impl FaceObservation {
    pub fn new(bbox: BoundingBox, landmark_confidence: f64) -> Self {
        Self {
            bbox,
            landmark_confidence,
            eye_openness: None,
            landmarks: Vec::new(),
        }
    }

    pub fn with_eye_openness(mut self, eye_openness: f64) -> Self {
        self.eye_openness = Some(eye_openness);
        self
    }

    pub fn with_landmarks(mut self, landmarks: Vec<[f64; 2]>) -> Self {
        self.landmarks = landmarks;
        self
    }
}

/// Per-frame pixel statistics summarized by the extractor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelStats {
    /// Mean luma of the brightness histogram (0-255)
    pub mean_luma: f64,
    /// Luma standard deviation (0-128)
    pub luma_std_dev: f64,
    /// Variance of the Laplacian (unbounded, higher = sharper)
    pub laplacian_variance: f64,
}

impl PixelStats {
    pub fn new(mean_luma: f64, luma_std_dev: f64, laplacian_variance: f64) -> Self {
        Self {
            mean_luma,
            luma_std_dev,
            laplacian_variance,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.mean_luma.is_finite() && self.luma_std_dev.is_finite() && self.laplacian_variance.is_finite()
    }
}

/// One analyzed camera frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSignals {
    /// Capture timestamp (milliseconds, monotonic per session)
    pub timestamp_ms: u64,
    pub faces: Vec<FaceObservation>,
    pub pose: HeadPose,
    pub pixels: PixelStats,
}

impl FrameSignals {
    pub fn new(timestamp_ms: u64, faces: Vec<FaceObservation>, pose: HeadPose, pixels: PixelStats) -> Self {
        Self {
            timestamp_ms,
            faces,
            pose,
            pixels,
        }
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// The face when exactly one was detected
    pub fn single_face(&self) -> Option<&FaceObservation> {
        match self.faces.as_slice() {
            [face] => Some(face),
            _ => None,
        }
    }
}
