//! Core types for photorank

mod frame;
mod quality;
mod reason;
mod state;
mod decision;
mod liveness;
mod photo;

pub use frame::{BoundingBox, FaceObservation, FrameSignals, HeadPose, PixelStats};
pub use quality::{QualityCriteria, QualityVector};
pub use reason::{ReasonCategory, ReasonCode};
pub use state::VerificationState;
pub use decision::{DecisionStatus, UploadRequest, VerificationDecision};
pub use liveness::{LivenessEvidence, LivenessResult};
pub use photo::{CommittedRating, ComparisonPair, PhotoRecord, RatingEvent, VerificationStatus};
