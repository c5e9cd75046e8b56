//! Per-tick decision handed to the UI and upload collaborators

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::types::{ReasonCode, VerificationState, VerificationStatus};

/// Coarse status for the UI collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    /// Show the guidance message
    Guidance,
    /// Capture can be triggered
    ReadyToCapture,
    /// Capture taken, authentication stages running
    Authenticating,
    Accepted,
    /// Accepted, liveness confidence in the low band
    AcceptedLowConfidence,
    Rejected,
    /// Session reset by the user
    Cancelled,
}

/// Payload for the upload collaborator on acceptance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    /// SHA-256 hex of the captured frame record
    pub photo_reference: String,
    pub verification_status: VerificationStatus,
    pub liveness_confidence: f64,
}

/// Output of one evaluation tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationDecision {
    pub timestamp: DateTime<Utc>,
    pub state: VerificationState,
    pub status: DecisionStatus,
    /// Every current failure, highest priority first
    pub failure_reasons: Vec<ReasonCode>,
    /// Stable code of the top failure
    pub guidance_message: Option<String>,
    /// Consecutive passing averaged vectors
    pub pass_streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liveness_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadRequest>,
}

impl VerificationDecision {
    /// Create new decision
    pub fn new(state: VerificationState, status: DecisionStatus, failure_reasons: Vec<ReasonCode>, pass_streak: u32) -> Self {
        let guidance_message = failure_reasons.first().map(|r| r.code().to_string());
        Self {
            timestamp: Utc::now(),
            state,
            status,
            failure_reasons,
            guidance_message,
            pass_streak,
            liveness_confidence: None,
            upload: None,
        }
    }

    pub fn with_liveness(mut self, confidence: f64) -> Self {
        self.liveness_confidence = Some(confidence);
        self
    }

    pub fn with_upload(mut self, upload: UploadRequest) -> Self {
        self.upload = Some(upload);
        self
    }

    /// Top failure, if any
    pub fn primary_reason(&self) -> Option<ReasonCode> {
        self.failure_reasons.first().copied()
    }

    pub fn is_final(&self) -> bool {
        self.state.is_terminal()
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let line = self.to_parseable_string();
        match self.status {
            DecisionStatus::Accepted => line.green().to_string(),
            DecisionStatus::AcceptedLowConfidence | DecisionStatus::ReadyToCapture => line.yellow().to_string(),
            DecisionStatus::Rejected => line.red().to_string(),
            DecisionStatus::Guidance | DecisionStatus::Authenticating => line.normal().to_string(),
            DecisionStatus::Cancelled => line.dimmed().to_string(),
        }
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        let reasons: Vec<&str> = self.failure_reasons.iter().map(|r| r.code()).collect();
        let mut line = format!(
            "state={} | status={:?} | streak={} | reasons=[{}]",
            self.state,
            self.status,
            self.pass_streak,
            reasons.join(",")
        );
        if let Some(confidence) = self.liveness_confidence {
            line.push_str(&format!(" | liveness={:.3}", confidence));
        }
        line
    }
}
