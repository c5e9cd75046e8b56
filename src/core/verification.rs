//! Verification Engine: capture state machine
//!
//! State transitions:
//! - INITIALIZING → ANALYZING: Start
//! - ANALYZING/GUIDANCE → READY_TO_CAPTURE: averaged quality passes ≥ N times in a row
//! - READY_TO_CAPTURE → GUIDANCE: quality degrades before the trigger
//! - READY_TO_CAPTURE → CAPTURED: capture trigger
//! - CAPTURED → BIOMETRIC_AUTH → SELFIE_CAPTURE → PROCESSING: straight line,
//!   any stage failure → REJECTED (no retries inside the session)
//! - PROCESSING → ACCEPTED | REJECTED: liveness bands + final quality check
//! - any → INITIALIZING: Cancel (session state discarded)
//!
//! The engine holds no timers; every transition is driven by one event.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::{LivenessConfig, VerificationConfig};
use crate::core::{LivenessEvaluator, QualityScorer, TemporalStabilizer};
use crate::types::{
    DecisionStatus, FrameSignals, LivenessResult, QualityVector, ReasonCode, UploadRequest, VerificationDecision,
    VerificationState, VerificationStatus,
};

/// Externally delivered input to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum VerificationEvent {
    /// Begin a fresh capture session
    Start,
    /// One analyzed frame
    Frame(FrameSignals),
    /// Collaborator-issued capture trigger
    CaptureTriggered,
    /// Hand the captured photo to biometric authentication
    BeginAuthentication,
    /// Biometric collaborator result
    BiometricCompleted { passed: bool },
    /// Ordered selfie frames spanning the authentication window
    SelfieCaptured(Vec<FrameSignals>),
    /// User backed out of the selfie step
    SelfieCancelled,
    /// Run liveness and the final quality check
    Process,
    /// User exited the flow
    Cancel,
}

impl VerificationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Frame(_) => "frame",
            Self::CaptureTriggered => "capture_triggered",
            Self::BeginAuthentication => "begin_authentication",
            Self::BiometricCompleted { .. } => "biometric_completed",
            Self::SelfieCaptured(_) => "selfie_captured",
            Self::SelfieCancelled => "selfie_cancelled",
            Self::Process => "process",
            Self::Cancel => "cancel",
        }
    }
}

/// The frame taken at the capture trigger and the stabilized vector that earned it
#[derive(Debug, Clone, PartialEq)]
struct CapturedPhoto {
    frame: FrameSignals,
    stabilized: QualityVector,
}

/// Capture state machine for one session
#[derive(Debug)]
pub struct VerificationEngine {
    /// Current state
    state: VerificationState,
    scorer: QualityScorer,
    stabilizer: TemporalStabilizer,
    liveness: LivenessEvaluator,
    ready_pass_count: u32,
    accept_confidence: f64,
    low_confidence_floor: f64,
    /// Most recent single-face frame and the average after it
    last_scored: Option<CapturedPhoto>,
    captured: Option<CapturedPhoto>,
    selfie: Vec<FrameSignals>,
    last_liveness: Option<LivenessResult>,
    last_decision: VerificationDecision,
    /// Number of events handled
    event_count: u64,
}

impl Default for VerificationEngine {
    fn default() -> Self {
        Self::new(&VerificationConfig::default(), &LivenessConfig::default())
    }
}

impl VerificationEngine {
    /// Create new engine in INITIALIZING
    pub fn new(verification: &VerificationConfig, liveness: &LivenessConfig) -> Self {
        Self {
            state: VerificationState::Initializing,
            scorer: QualityScorer::new(),
            stabilizer: TemporalStabilizer::new(verification.ema_weight, verification.criteria),
            liveness: LivenessEvaluator::new(liveness.live_threshold),
            ready_pass_count: verification.ready_pass_count.max(1),
            accept_confidence: liveness.accept_confidence,
            low_confidence_floor: liveness.low_confidence_floor,
            last_scored: None,
            captured: None,
            selfie: Vec::new(),
            last_liveness: None,
            last_decision: VerificationDecision::new(
                VerificationState::Initializing,
                DecisionStatus::Guidance,
                Vec::new(),
                0,
            ),
            event_count: 0,
        }
    }

    /// Apply one event, return the decision for this tick
    pub fn handle(&mut self, event: VerificationEvent) -> VerificationDecision {
        self.event_count += 1;
        let from = self.state;
        let event_name = event.name();

        let decision = match (self.state, event) {
            (_, VerificationEvent::Start) => self.start(),
            (_, VerificationEvent::Cancel) => self.cancel(),
            (state, VerificationEvent::Frame(frame)) if state.accepts_frames() => self.on_frame(frame),
            (VerificationState::ReadyToCapture, VerificationEvent::CaptureTriggered) => self.capture(),
            (VerificationState::Captured, VerificationEvent::BeginAuthentication) => {
                self.authenticating(VerificationState::BiometricAuth)
            }
            (VerificationState::BiometricAuth, VerificationEvent::BiometricCompleted { passed }) => {
                if passed {
                    self.authenticating(VerificationState::SelfieCapture)
                } else {
                    self.reject(vec![ReasonCode::BiometricFailed])
                }
            }
            (VerificationState::SelfieCapture, VerificationEvent::SelfieCaptured(frames)) => {
                if frames.is_empty() {
                    self.reject(vec![ReasonCode::SelfieFailed])
                } else {
                    self.selfie = frames;
                    self.authenticating(VerificationState::Processing)
                }
            }
            (VerificationState::SelfieCapture, VerificationEvent::SelfieCancelled) => {
                self.reject(vec![ReasonCode::SelfieFailed])
            }
            (VerificationState::Processing, VerificationEvent::Process) => self.process(),
            (state, _) => {
                debug!(%state, event = event_name, "event ignored in current state");
                return self.last_decision.clone();
            }
        };

        if from != self.state {
            let reason = decision.primary_reason();
            info!(
                from = %from,
                to = %self.state,
                event = event_name,
                reason = ?reason,
                category = ?reason.map(|r| r.category()),
                "verification transition"
            );
        }
        self.last_decision = decision.clone();
        decision
    }

    /// Discard session state and start analyzing
    fn start(&mut self) -> VerificationDecision {
        self.clear_session();
        self.state = VerificationState::Analyzing;
        VerificationDecision::new(self.state, DecisionStatus::Guidance, Vec::new(), 0)
    }

    /// Discard session state without touching anything outside the session
    fn cancel(&mut self) -> VerificationDecision {
        self.clear_session();
        self.state = VerificationState::Initializing;
        VerificationDecision::new(self.state, DecisionStatus::Cancelled, vec![ReasonCode::SessionCancelled], 0)
    }

    fn clear_session(&mut self) {
        self.stabilizer.reset();
        self.last_scored = None;
        self.captured = None;
        self.selfie.clear();
        self.last_liveness = None;
    }

    fn on_frame(&mut self, frame: FrameSignals) -> VerificationDecision {
        let quality = match self.scorer.score(&frame) {
            Ok(quality) => quality,
            Err(reason) => {
                self.stabilizer.break_streak();
                self.last_scored = None;
                self.state = VerificationState::Guidance;
                return VerificationDecision::new(self.state, DecisionStatus::Guidance, vec![reason], 0);
            }
        };

        let reading = self.stabilizer.push(&quality);
        self.last_scored = Some(CapturedPhoto {
            frame,
            stabilized: reading.average,
        });

        if reading.passes() && reading.consecutive_pass_count >= self.ready_pass_count {
            self.state = VerificationState::ReadyToCapture;
            VerificationDecision::new(self.state, DecisionStatus::ReadyToCapture, Vec::new(), reading.consecutive_pass_count)
        } else {
            self.state = VerificationState::Guidance;
            VerificationDecision::new(self.state, DecisionStatus::Guidance, reading.failures, reading.consecutive_pass_count)
        }
    }

    fn capture(&mut self) -> VerificationDecision {
        match self.last_scored.take() {
            Some(photo) => {
                self.captured = Some(photo);
                self.authenticating(VerificationState::Captured)
            }
            // ReadyToCapture is only reachable through a scored frame
            None => {
                self.state = VerificationState::Guidance;
                VerificationDecision::new(self.state, DecisionStatus::Guidance, vec![ReasonCode::NoFaceDetected], 0)
            }
        }
    }

    fn authenticating(&mut self, next: VerificationState) -> VerificationDecision {
        self.state = next;
        VerificationDecision::new(
            self.state,
            DecisionStatus::Authenticating,
            Vec::new(),
            self.stabilizer.consecutive_pass_count(),
        )
    }

    fn reject(&mut self, reasons: Vec<ReasonCode>) -> VerificationDecision {
        self.state = VerificationState::Rejected;
        let decision = VerificationDecision::new(self.state, DecisionStatus::Rejected, reasons, 0);
        match &self.last_liveness {
            Some(result) => decision.with_liveness(result.confidence),
            None => decision,
        }
    }

    /// Liveness on captured + selfie frames, then the final quality check
    fn process(&mut self) -> VerificationDecision {
        let Some(captured) = self.captured.clone() else {
            return self.reject(vec![ReasonCode::SelfieFailed]);
        };

        let mut window = Vec::with_capacity(self.selfie.len() + 1);
        window.push(captured.frame.clone());
        window.extend(self.selfie.iter().cloned());
        let liveness = self.liveness.evaluate(&window);
        let confidence = liveness.confidence;
        info!(confidence, is_live = liveness.is_live, summary = %liveness.evidence_summary(), "liveness result");
        self.last_liveness = Some(liveness);

        let quality_failures = self.stabilizer.criteria().failures(&captured.stabilized);

        let mut reasons = Vec::new();
        if confidence <= self.low_confidence_floor {
            reasons.push(ReasonCode::LivenessFailed);
        }
        if !quality_failures.is_empty() {
            reasons.push(ReasonCode::CaptureQualityDegraded);
            reasons.extend(quality_failures);
        }
        if !reasons.is_empty() {
            return self.reject(reasons);
        }

        let (status, verification_status) = if confidence > self.accept_confidence {
            (DecisionStatus::Accepted, VerificationStatus::Accepted)
        } else {
            (DecisionStatus::AcceptedLowConfidence, VerificationStatus::AcceptedLowConfidence)
        };
        self.state = VerificationState::Accepted;

        VerificationDecision::new(self.state, status, Vec::new(), self.stabilizer.consecutive_pass_count())
            .with_liveness(confidence)
            .with_upload(UploadRequest {
                photo_reference: frame_fingerprint(&captured.frame),
                verification_status,
                liveness_confidence: confidence,
            })
    }

    /// Get current state
    pub fn state(&self) -> VerificationState {
        self.state
    }

    /// Decision from the last handled event
    pub fn current_decision(&self) -> &VerificationDecision {
        &self.last_decision
    }

    pub fn consecutive_pass_count(&self) -> u32 {
        self.stabilizer.consecutive_pass_count()
    }

    /// Liveness result of the last authentication attempt
    pub fn last_liveness(&self) -> Option<&LivenessResult> {
        self.last_liveness.as_ref()
    }

    /// Get event count
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// True when no session-scoped data is held
    pub fn is_clear(&self) -> bool {
        self.stabilizer.state().samples == 0
            && self.last_scored.is_none()
            && self.captured.is_none()
            && self.selfie.is_empty()
            && self.last_liveness.is_none()
    }
}

/// SHA-256 hex over the captured frame's fields
pub fn frame_fingerprint(frame: &FrameSignals) -> String {
    let mut hasher = Sha256::new();
    hasher.update(frame.timestamp_ms.to_le_bytes());
    for face in &frame.faces {
        for v in [face.bbox.x, face.bbox.y, face.bbox.width, face.bbox.height, face.landmark_confidence] {
            hasher.update(v.to_le_bytes());
        }
        hasher.update(face.eye_openness.unwrap_or(-1.0).to_le_bytes());
        for point in &face.landmarks {
            hasher.update(point[0].to_le_bytes());
            hasher.update(point[1].to_le_bytes());
        }
    }
    for v in [
        frame.pose.yaw,
        frame.pose.pitch,
        frame.pose.roll,
        frame.pixels.mean_luma,
        frame.pixels.luma_std_dev,
        frame.pixels.laplacian_variance,
    ] {
        hasher.update(v.to_le_bytes());
    }
    hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, FaceObservation, HeadPose, PixelStats};

    fn face(side: f64, offset: f64) -> FaceObservation {
        FaceObservation::new(BoundingBox::new(0.2 + offset, 0.2, side, side), 0.95)
            .with_eye_openness(0.9)
            .with_landmarks(vec![[0.4 + offset, 0.4], [0.6 + offset, 0.4], [0.5 + offset, 0.6]])
    }

    /// side 0.5477 → area ≈ 0.30
    fn good_frame(t: u64) -> FrameSignals {
        FrameSignals::new(t, vec![face(0.5477, 0.0)], HeadPose::new(2.0, 1.0, 0.0), PixelStats::new(128.0, 40.0, 300.0))
    }

    fn selfie(start: u64) -> Vec<FrameSignals> {
        (1..=4)
            .map(|i| {
                FrameSignals::new(
                    start + i * 100,
                    vec![face(0.5477, i as f64 * 0.01)],
                    HeadPose::new(2.0 + i as f64 * 2.0, 1.0, 0.0),
                    PixelStats::new(128.0, 40.0, 300.0 + i as f64 * 10.0),
                )
            })
            .collect()
    }

    fn ready_engine() -> VerificationEngine {
        let mut engine = VerificationEngine::default();
        engine.handle(VerificationEvent::Start);
        for i in 0..3 {
            engine.handle(VerificationEvent::Frame(good_frame(i * 100)));
        }
        assert_eq!(engine.state(), VerificationState::ReadyToCapture);
        engine
    }

    #[test]
    fn test_initial_state_is_initializing() {
        let engine = VerificationEngine::default();
        assert_eq!(engine.state(), VerificationState::Initializing);
    }

    #[test]
    fn test_start_enters_analyzing() {
        let mut engine = VerificationEngine::default();
        let decision = engine.handle(VerificationEvent::Start);
        assert_eq!(decision.state, VerificationState::Analyzing);
    }

    #[test]
    fn test_frames_ignored_before_start() {
        let mut engine = VerificationEngine::default();
        engine.handle(VerificationEvent::Frame(good_frame(0)));
        assert_eq!(engine.state(), VerificationState::Initializing);
        assert!(engine.is_clear());
    }

    #[test]
    fn test_streak_reaches_ready() {
        let mut engine = VerificationEngine::default();
        engine.handle(VerificationEvent::Start);
        let d1 = engine.handle(VerificationEvent::Frame(good_frame(0)));
        let d2 = engine.handle(VerificationEvent::Frame(good_frame(100)));
        assert_eq!(d1.status, DecisionStatus::Guidance);
        assert!(d1.failure_reasons.is_empty());
        assert_eq!(d2.pass_streak, 2);
        let d3 = engine.handle(VerificationEvent::Frame(good_frame(200)));
        assert_eq!(d3.status, DecisionStatus::ReadyToCapture);
    }

    #[test]
    fn test_capture_trigger_ignored_in_guidance() {
        let mut engine = VerificationEngine::default();
        engine.handle(VerificationEvent::Start);
        engine.handle(VerificationEvent::Frame(good_frame(0)));
        engine.handle(VerificationEvent::CaptureTriggered);
        assert_eq!(engine.state(), VerificationState::Guidance);
    }

    #[test]
    fn test_full_accept_path() {
        let mut engine = ready_engine();
        assert_eq!(engine.handle(VerificationEvent::CaptureTriggered).state, VerificationState::Captured);
        assert_eq!(engine.handle(VerificationEvent::BeginAuthentication).state, VerificationState::BiometricAuth);
        assert_eq!(
            engine.handle(VerificationEvent::BiometricCompleted { passed: true }).state,
            VerificationState::SelfieCapture
        );
        assert_eq!(engine.handle(VerificationEvent::SelfieCaptured(selfie(200))).state, VerificationState::Processing);

        let decision = engine.handle(VerificationEvent::Process);
        assert_eq!(decision.state, VerificationState::Accepted);
        assert_eq!(decision.status, DecisionStatus::Accepted);
        let upload = decision.upload.expect("upload payload");
        assert_eq!(upload.verification_status, VerificationStatus::Accepted);
        assert_eq!(upload.photo_reference.len(), 64);
        assert!(upload.liveness_confidence > 0.8);
    }

    #[test]
    fn test_biometric_failure_rejects() {
        let mut engine = ready_engine();
        engine.handle(VerificationEvent::CaptureTriggered);
        engine.handle(VerificationEvent::BeginAuthentication);
        let decision = engine.handle(VerificationEvent::BiometricCompleted { passed: false });
        assert_eq!(decision.status, DecisionStatus::Rejected);
        assert_eq!(decision.failure_reasons, vec![ReasonCode::BiometricFailed]);

        // Terminal: later events change nothing
        let again = engine.handle(VerificationEvent::Process);
        assert_eq!(again.state, VerificationState::Rejected);
    }

    #[test]
    fn test_selfie_cancel_rejects() {
        let mut engine = ready_engine();
        engine.handle(VerificationEvent::CaptureTriggered);
        engine.handle(VerificationEvent::BeginAuthentication);
        engine.handle(VerificationEvent::BiometricCompleted { passed: true });
        let decision = engine.handle(VerificationEvent::SelfieCancelled);
        assert_eq!(decision.failure_reasons, vec![ReasonCode::SelfieFailed]);
    }

    #[test]
    fn test_frozen_selfie_fails_liveness() {
        let mut engine = ready_engine();
        engine.handle(VerificationEvent::CaptureTriggered);
        engine.handle(VerificationEvent::BeginAuthentication);
        engine.handle(VerificationEvent::BiometricCompleted { passed: true });
        let frozen: Vec<_> = (1..=4).map(|i| good_frame(200 + i * 100)).collect();
        engine.handle(VerificationEvent::SelfieCaptured(frozen));
        let decision = engine.handle(VerificationEvent::Process);
        assert_eq!(decision.status, DecisionStatus::Rejected);
        assert_eq!(decision.primary_reason(), Some(ReasonCode::LivenessFailed));
        assert!(decision.upload.is_none());
    }

    #[test]
    fn test_cancel_clears_session() {
        let mut engine = ready_engine();
        engine.handle(VerificationEvent::CaptureTriggered);
        engine.handle(VerificationEvent::BeginAuthentication);
        let decision = engine.handle(VerificationEvent::Cancel);
        assert_eq!(decision.status, DecisionStatus::Cancelled);
        assert_eq!(engine.state(), VerificationState::Initializing);
        assert!(engine.is_clear());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(frame_fingerprint(&good_frame(0)), frame_fingerprint(&good_frame(0)));
        assert_ne!(frame_fingerprint(&good_frame(0)), frame_fingerprint(&good_frame(1)));
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_string(&VerificationEvent::BiometricCompleted { passed: true }).unwrap();
        assert_eq!(json, r#"{"event":"biometric_completed","data":{"passed":true}}"#);
        let start: VerificationEvent = serde_json::from_str(r#"{"event":"start"}"#).unwrap();
        assert_eq!(start, VerificationEvent::Start);
    }
}
