//! Pairwise rating engine
//!
//! Selection reads a pool snapshot; commits go through the store's
//! idempotent write. The engine itself holds no mutable state.

use std::collections::HashSet;
use std::sync::Arc;

use rand::Rng;
use tracing::{debug, error, info};

use crate::config::RatingConfig;
use crate::core::elo;
use crate::core::pair_selection::select_pair;
use crate::core::store::{CommitOutcome, RatingStore};
use crate::error::RatingError;
use crate::types::{ComparisonPair, RatingEvent};
use crate::ELO_K_FACTOR;

#[derive(Debug)]
pub struct RatingEngine<S: RatingStore> {
    store: Arc<S>,
    k_factor: f64,
}

impl<S: RatingStore> Clone for RatingEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            k_factor: self.k_factor,
        }
    }
}

impl<S: RatingStore> RatingEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            k_factor: ELO_K_FACTOR,
        }
    }

    pub fn from_config(store: Arc<S>, config: &RatingConfig) -> Self {
        Self {
            store,
            k_factor: config.k_factor,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn k_factor(&self) -> f64 {
        self.k_factor
    }

    /// Pair for a requester, excluding every photo they own
    pub fn select_pair_for<R: Rng + ?Sized>(&self, owner_id: &str, rng: &mut R) -> Result<ComparisonPair, RatingError> {
        let excluded = self.store.photos_owned_by(owner_id);
        self.select_pair_from(&excluded, rng)
    }

    /// Pair from the current pool snapshot with explicit exclusions
    pub fn select_pair_from<R: Rng + ?Sized>(
        &self,
        excluded_ids: &HashSet<String>,
        rng: &mut R,
    ) -> Result<ComparisonPair, RatingError> {
        let pool = self.store.pool_snapshot();
        let pair = select_pair(&pool, excluded_ids, rng);
        match &pair {
            Ok(p) => debug!(left = %p.left.id, right = %p.right.id, pool = pool.len(), "pair selected"),
            Err(e) => debug!(error = %e, pool = pool.len(), "no pair available"),
        }
        pair
    }

    /// Apply a comparison outcome at most once per idempotency key
    pub fn record_outcome(&self, event: &RatingEvent) -> Result<CommitOutcome, RatingError> {
        let result = self.validate(event).and_then(|()| {
            let k = self.k_factor;
            self.store.commit_rating(event, &move |w, l| elo::update(w, l, k))
        });

        match &result {
            Ok(CommitOutcome::Applied(c)) => info!(
                key = %c.idempotency_key,
                winner = %c.winner_photo_id,
                loser = %c.loser_photo_id,
                winner_elo = c.new_winner_elo,
                loser_elo = c.new_loser_elo,
                "rating committed"
            ),
            Ok(CommitOutcome::Duplicate(c)) => debug!(key = %c.idempotency_key, "duplicate rating event ignored"),
            Err(e) if e.is_integrity_failure() => error!(
                key = %event.idempotency_key,
                winner = %event.winner_photo_id,
                loser = %event.loser_photo_id,
                error = %e,
                "rating event rejected"
            ),
            Err(_) => {}
        }
        result
    }

    fn validate(&self, event: &RatingEvent) -> Result<(), RatingError> {
        if event.idempotency_key.trim().is_empty() {
            return Err(RatingError::EmptyIdempotencyKey);
        }
        if event.winner_photo_id == event.loser_photo_id {
            return Err(RatingError::SelfComparison(event.winner_photo_id.clone()));
        }
        Ok(())
    }
}

// ===== TESTS =====
