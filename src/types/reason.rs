//! Reason codes for guidance and rejection
//!
//! Codes are stable identifiers handed to the UI collaborator. Localized text
//! is the caller's job; `description()` is for logs only.

use serde::{Deserialize, Serialize};

/// Failure class a reason belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCategory {
    /// Reported as guidance, session continues
    SignalQuality,
    /// Ends the session as Rejected
    Authentication,
    /// Session lifecycle (cancel)
    Session,
}

/// Reason codes for all guidance and rejection outcomes
///
/// Variant order within the signal-quality block is the guidance priority:
/// earlier variants win when several criteria fail at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    // =========================================================================
    // Signal quality (priority order)
    // =========================================================================
    /// No face in frame
    NoFaceDetected,
    /// More than one face in frame
    MultipleFaces,
    /// Exposure outside the usable band, or flat contrast
    PoorLighting,
    /// Sharpness too low
    BlurryImage,
    /// Head turned too far from frontal
    InvalidPose,
    /// Face too small in frame
    TooFarAway,
    /// Face too large in frame
    TooClose,
    /// Eyes not open enough
    EyesClosed,

    // =========================================================================
    // Authentication
    // =========================================================================
    /// Biometric authentication collaborator reported failure
    BiometricFailed,
    /// Selfie capture cancelled or unusable
    SelfieFailed,
    /// Liveness confidence at or below the floor
    LivenessFailed,
    /// Captured photo no longer meets the quality criteria
    CaptureQualityDegraded,

    // =========================================================================
    // Session
    // =========================================================================
    /// User left the flow
    SessionCancelled,
}

impl ReasonCode {
    /// Get the code string (stable, for UI and logs)
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoFaceDetected => "NO_FACE_DETECTED",
            Self::MultipleFaces => "MULTIPLE_FACES",
            Self::PoorLighting => "POOR_LIGHTING",
            Self::BlurryImage => "BLURRY_IMAGE",
            Self::InvalidPose => "INVALID_POSE",
            Self::TooFarAway => "TOO_FAR_AWAY",
            Self::TooClose => "TOO_CLOSE",
            Self::EyesClosed => "EYES_CLOSED",
            Self::BiometricFailed => "BIOMETRIC_FAILED",
            Self::SelfieFailed => "SELFIE_FAILED",
            Self::LivenessFailed => "LIVENESS_FAILED",
            Self::CaptureQualityDegraded => "CAPTURE_QUALITY_DEGRADED",
            Self::SessionCancelled => "SESSION_CANCELLED",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::NoFaceDetected => "No face detected",
            Self::MultipleFaces => "More than one face in frame",
            Self::PoorLighting => "Lighting too dark, too bright or too flat",
            Self::BlurryImage => "Image is blurry",
            Self::InvalidPose => "Face the camera directly",
            Self::TooFarAway => "Move closer",
            Self::TooClose => "Move further away",
            Self::EyesClosed => "Keep your eyes open",
            Self::BiometricFailed => "Biometric authentication failed",
            Self::SelfieFailed => "Selfie capture failed or was cancelled",
            Self::LivenessFailed => "Liveness check failed",
            Self::CaptureQualityDegraded => "Captured photo failed the quality check",
            Self::SessionCancelled => "Session cancelled",
        }
    }

    pub fn category(&self) -> ReasonCategory {
        match self {
            Self::NoFaceDetected
            | Self::MultipleFaces
            | Self::PoorLighting
            | Self::BlurryImage
            | Self::InvalidPose
            | Self::TooFarAway
            | Self::TooClose
            | Self::EyesClosed => ReasonCategory::SignalQuality,
            Self::BiometricFailed | Self::SelfieFailed | Self::LivenessFailed | Self::CaptureQualityDegraded => {
                ReasonCategory::Authentication
            }
            Self::SessionCancelled => ReasonCategory::Session,
        }
    }

    /// Guidance rank, 0 = highest priority. TooFarAway and TooClose share a rank.
    pub fn priority(&self) -> u8 {
        match self {
            Self::NoFaceDetected => 0,
            Self::MultipleFaces => 1,
            Self::PoorLighting => 2,
            Self::BlurryImage => 3,
            Self::InvalidPose => 4,
            Self::TooFarAway | Self::TooClose => 5,
            Self::EyesClosed => 6,
            Self::BiometricFailed | Self::SelfieFailed | Self::LivenessFailed | Self::CaptureQualityDegraded => 10,
            Self::SessionCancelled => 20,
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
