//! Core modules for photorank

pub mod quality_scorer;
pub mod stabilizer;
pub mod frame_gate;
pub mod liveness;
pub mod verification;
pub mod session;
pub mod elo;
pub mod pair_selection;
pub mod store;
pub mod rating;
pub mod api;

pub use quality_scorer::QualityScorer;
pub use stabilizer::{StabilizedReading, StabilizedState, TemporalStabilizer};
pub use frame_gate::FrameGate;
pub use liveness::{LivenessCue, LivenessEvaluator};
pub use verification::{frame_fingerprint, VerificationEngine, VerificationEvent};
pub use session::VerificationSession;
pub use pair_selection::select_pair;
pub use store::{CommitOutcome, InMemoryRatingStore, RatingStore};
pub use rating::RatingEngine;
pub use api::{create_router, router_with_state, run_server, AppState};
