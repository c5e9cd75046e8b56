//! Per-session owner of the frame gate and the verification engine
//!
//! Each session is an independent value. Nothing here is shared between
//! sessions, and nothing here reaches the rating side.

use tracing::{info_span, trace};

use crate::config::Config;
use crate::core::{FrameGate, VerificationEngine, VerificationEvent};
use crate::types::{FrameSignals, VerificationDecision, VerificationState};

#[derive(Debug)]
pub struct VerificationSession {
    id: String,
    gate: FrameGate,
    engine: VerificationEngine,
}

impl VerificationSession {
    /// New session; call `start` (or send `Start`) before frames are analyzed
    pub fn new(id: impl Into<String>, config: &Config) -> Self {
        Self {
            id: id.into(),
            gate: FrameGate::new(config.verification.analysis_interval_ms),
            engine: VerificationEngine::new(&config.verification, &config.liveness),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start(&mut self) -> VerificationDecision {
        self.handle(VerificationEvent::Start)
    }

    pub fn cancel(&mut self) -> VerificationDecision {
        self.handle(VerificationEvent::Cancel)
    }

    /// Offer a frame from the extractor; None when it was dropped by the gate
    pub fn offer_frame(&mut self, frame: FrameSignals) -> Option<VerificationDecision> {
        self.handle_event(VerificationEvent::Frame(frame))
    }

    /// Apply any event. Dropped frames return the current decision.
    pub fn handle(&mut self, event: VerificationEvent) -> VerificationDecision {
        match self.handle_event(event) {
            Some(decision) => decision,
            None => self.engine.current_decision().clone(),
        }
    }

    fn handle_event(&mut self, event: VerificationEvent) -> Option<VerificationDecision> {
        let _span = info_span!("session", id = %self.id).entered();

        match &event {
            VerificationEvent::Start | VerificationEvent::Cancel => self.gate.reset(),
            VerificationEvent::Frame(frame) if self.engine.state().accepts_frames() => {
                if !self.gate.admit(frame.timestamp_ms) {
                    trace!(timestamp_ms = frame.timestamp_ms, dropped = self.gate.dropped(), "frame dropped");
                    return None;
                }
            }
            _ => {}
        }
        Some(self.engine.handle(event))
    }

    pub fn state(&self) -> VerificationState {
        self.engine.state()
    }

    pub fn current_decision(&self) -> &VerificationDecision {
        self.engine.current_decision()
    }

    pub fn engine(&self) -> &VerificationEngine {
        &self.engine
    }

    pub fn dropped_frames(&self) -> u64 {
        self.gate.dropped()
    }
}
