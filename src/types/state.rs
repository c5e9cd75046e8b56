//! Verification state definitions

use serde::{Deserialize, Serialize};

/// Where a capture session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationState {
    /// No session running
    Initializing,
    /// Session started, no frame analyzed yet
    Analyzing,
    /// Quality not good enough, guidance shown
    Guidance,
    /// Stable passing quality, waiting for the capture trigger
    ReadyToCapture,
    /// Photo taken
    Captured,
    /// Waiting for the biometric collaborator
    BiometricAuth,
    /// Waiting for the selfie window
    SelfieCapture,
    /// Selfie received, liveness pending
    Processing,
    Accepted,
    Rejected,
}

impl VerificationState {
    /// Accepted and Rejected end the session
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }

    /// States in which analyzed frames are consumed
    pub fn accepts_frames(&self) -> bool {
        matches!(self, Self::Analyzing | Self::Guidance | Self::ReadyToCapture)
    }
}

impl std::fmt::Display for VerificationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initializing => "INITIALIZING",
            Self::Analyzing => "ANALYZING",
            Self::Guidance => "GUIDANCE",
            Self::ReadyToCapture => "READY_TO_CAPTURE",
            Self::Captured => "CAPTURED",
            Self::BiometricAuth => "BIOMETRIC_AUTH",
            Self::SelfieCapture => "SELFIE_CAPTURE",
            Self::Processing => "PROCESSING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        };
        write!(f, "{}", name)
    }
}
