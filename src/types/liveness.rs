//! Liveness evaluation result

use serde::{Deserialize, Serialize};

/// Sub-scores behind a liveness confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessEvidence {
    pub motion: f64,
    pub depth_texture: f64,
    pub landmark_continuity: f64,
    /// Set when the input was rejected before scoring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defect: Option<String>,
}

/// Outcome of one authentication attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessResult {
    pub is_live: bool,
    /// Combined confidence (0.0-1.0)
    pub confidence: f64,
    pub evidence: LivenessEvidence,
}

impl LivenessResult {
    /// Fail-closed result for unusable input
    pub fn malformed(defect: impl Into<String>) -> Self {
        Self {
            is_live: false,
            confidence: 0.0,
            evidence: LivenessEvidence {
                motion: 0.0,
                depth_texture: 0.0,
                landmark_continuity: 0.0,
                defect: Some(defect.into()),
            },
        }
    }

    /// One-line summary for logs
    pub fn evidence_summary(&self) -> String {
        match &self.evidence.defect {
            Some(defect) => format!("malformed input: {}", defect),
            None => format!(
                "motion={:.2} depth_texture={:.2} landmarks={:.2}",
                self.evidence.motion, self.evidence.depth_texture, self.evidence.landmark_continuity
            ),
        }
    }
}
