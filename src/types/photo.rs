//! Pool records and rating events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of the verification pipeline as stored on a photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Accepted,
    /// Accepted with liveness confidence in the low band; caller decides policy
    AcceptedLowConfidence,
    Rejected,
}

/// A photo as owned by the storage collaborator
///
/// `elo_score` and `rating_count` have no public setters: they only move
/// through a rating commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    pub owner_id: String,
    pub in_pool: bool,
    elo_score: i32,
    rating_count: u32,
    pub verification_status: VerificationStatus,
}

impl PhotoRecord {
    /// A new photo at the given starting rating with no comparisons
    pub fn new(id: impl Into<String>, owner_id: impl Into<String>, initial_elo: i32) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            in_pool: false,
            elo_score: initial_elo,
            rating_count: 0,
            verification_status: VerificationStatus::Pending,
        }
    }

    pub fn in_pool(mut self, in_pool: bool) -> Self {
        self.in_pool = in_pool;
        self
    }

    pub fn with_status(mut self, status: VerificationStatus) -> Self {
        self.verification_status = status;
        self
    }

    pub fn elo_score(&self) -> i32 {
        self.elo_score
    }

    pub fn rating_count(&self) -> u32 {
        self.rating_count
    }

    /// Record one more comparison at the new rating
    pub(crate) fn apply_rating(&mut self, new_elo: i32) {
        self.elo_score = new_elo;
        self.rating_count += 1;
    }
}

/// One user decision between two photos
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingEvent {
    pub winner_photo_id: String,
    pub loser_photo_id: String,
    pub timestamp: DateTime<Utc>,
    pub idempotency_key: String,
}

impl RatingEvent {
    pub fn new(winner: impl Into<String>, loser: impl Into<String>, idempotency_key: impl Into<String>) -> Self {
        Self {
            winner_photo_id: winner.into(),
            loser_photo_id: loser.into(),
            timestamp: Utc::now(),
            idempotency_key: idempotency_key.into(),
        }
    }

    /// Same outcome regardless of submission time
    pub fn same_outcome(&self, winner: &str, loser: &str) -> bool {
        self.winner_photo_id == winner && self.loser_photo_id == loser
    }
}

/// Two distinct pool photos to show side by side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonPair {
    pub left: PhotoRecord,
    pub right: PhotoRecord,
}

/// What the storage collaborator committed for one idempotency key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedRating {
    pub idempotency_key: String,
    pub winner_photo_id: String,
    pub loser_photo_id: String,
    pub new_winner_elo: i32,
    pub new_loser_elo: i32,
    pub rating_count_winner: u32,
    pub rating_count_loser: u32,
    pub committed_at: DateTime<Utc>,
}
