//! Storage collaborator contract and an in-memory implementation
//!
//! The at-most-once guarantee lives here: `commit_rating` is a single
//! conditional write keyed on the idempotency key. Commits are serialized
//! per key, not per photo and not across the whole pool.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};

use crate::error::RatingError;
use crate::types::{CommittedRating, PhotoRecord, RatingEvent, VerificationStatus};
use crate::INITIAL_ELO;

/// Whether a commit changed state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// First application of this key
    Applied(CommittedRating),
    /// Key seen before; nothing changed, original result returned
    Duplicate(CommittedRating),
}

impl CommitOutcome {
    pub fn committed(&self) -> &CommittedRating {
        match self {
            Self::Applied(c) | Self::Duplicate(c) => c,
        }
    }

    pub fn into_committed(self) -> CommittedRating {
        match self {
            Self::Applied(c) | Self::Duplicate(c) => c,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// Rating function handed to the store: (winner elo, loser elo) → new pair
pub type RateFn<'a> = &'a (dyn Fn(i32, i32) -> (i32, i32) + Sync);

/// What the rating engine needs from persistent storage
pub trait RatingStore: Send + Sync {
    fn photo(&self, id: &str) -> Option<PhotoRecord>;

    /// Photos currently in the pool. May be slightly stale under concurrency.
    fn pool_snapshot(&self) -> Vec<PhotoRecord>;

    /// Ids of every photo owned by `owner_id`
    fn photos_owned_by(&self, owner_id: &str) -> HashSet<String>;

    /// Insert a new photo at the initial rating, outside the pool
    fn register_photo(&self, id: &str, owner_id: &str, status: VerificationStatus) -> Result<PhotoRecord, RatingError>;

    fn set_pool_membership(&self, id: &str, in_pool: bool) -> Result<PhotoRecord, RatingError>;

    /// Previously committed result for a key
    fn committed(&self, idempotency_key: &str) -> Option<CommittedRating>;

    /// Atomically apply `rate` to both photos unless the key was already committed
    fn commit_rating(&self, event: &RatingEvent, rate: RateFn<'_>) -> Result<CommitOutcome, RatingError>;
}

/// In-memory store with a per-key lock table
#[derive(Debug)]
pub struct InMemoryRatingStore {
    initial_elo: i32,
    photos: RwLock<BTreeMap<String, PhotoRecord>>,
    ledger: RwLock<HashMap<String, CommittedRating>>,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Default for InMemoryRatingStore {
    fn default() -> Self {
        Self::new(INITIAL_ELO)
    }
}

impl InMemoryRatingStore {
    pub fn new(initial_elo: i32) -> Self {
        Self {
            initial_elo,
            photos: RwLock::new(BTreeMap::new()),
            ledger: RwLock::new(HashMap::new()),
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Every photo, pooled or not, ordered by id
    pub fn all_photos(&self) -> Vec<PhotoRecord> {
        self.photos.read().values().cloned().collect()
    }

    pub fn committed_count(&self) -> usize {
        self.ledger.read().len()
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.key_locks
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the table entry once no other caller is waiting on it
    fn release_key_lock(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut table = self.key_locks.lock();
        // Held by the table and by us
        if Arc::strong_count(&lock) <= 2 {
            table.remove(key);
        }
    }

    fn apply(&self, event: &RatingEvent, rate: RateFn<'_>) -> Result<CommitOutcome, RatingError> {
        let key = event.idempotency_key.as_str();

        let existing = self.ledger.read().get(key).cloned();
        if let Some(existing) = existing {
            if !event.same_outcome(&existing.winner_photo_id, &existing.loser_photo_id) {
                return Err(RatingError::IdempotencyConflict { key: key.to_string() });
            }
            return Ok(CommitOutcome::Duplicate(existing));
        }

        let mut photos = self.photos.write();
        let (winner_elo, loser_elo) = {
            let winner = pooled(&photos, &event.winner_photo_id)?;
            let loser = pooled(&photos, &event.loser_photo_id)?;
            (winner.elo_score(), loser.elo_score())
        };
        let (new_winner, new_loser) = rate(winner_elo, loser_elo);

        let mut bump = |id: &str, elo: i32| -> Result<u32, RatingError> {
            let photo = photos.get_mut(id).ok_or_else(|| RatingError::UnknownPhoto(id.to_string()))?;
            photo.apply_rating(elo);
            Ok(photo.rating_count())
        };
        let rating_count_winner = bump(&event.winner_photo_id, new_winner)?;
        let rating_count_loser = bump(&event.loser_photo_id, new_loser)?;

        let committed = CommittedRating {
            idempotency_key: key.to_string(),
            winner_photo_id: event.winner_photo_id.clone(),
            loser_photo_id: event.loser_photo_id.clone(),
            new_winner_elo: new_winner,
            new_loser_elo: new_loser,
            rating_count_winner,
            rating_count_loser,
            committed_at: Utc::now(),
        };
        self.ledger.write().insert(key.to_string(), committed.clone());
        Ok(CommitOutcome::Applied(committed))
    }
}

fn pooled<'a>(photos: &'a BTreeMap<String, PhotoRecord>, id: &str) -> Result<&'a PhotoRecord, RatingError> {
    let photo = photos.get(id).ok_or_else(|| RatingError::UnknownPhoto(id.to_string()))?;
    if !photo.in_pool {
        return Err(RatingError::NotInPool(id.to_string()));
    }
    Ok(photo)
}

impl RatingStore for InMemoryRatingStore {
    fn photo(&self, id: &str) -> Option<PhotoRecord> {
        self.photos.read().get(id).cloned()
    }

    fn pool_snapshot(&self) -> Vec<PhotoRecord> {
        self.photos.read().values().filter(|p| p.in_pool).cloned().collect()
    }

    fn photos_owned_by(&self, owner_id: &str) -> HashSet<String> {
        self.photos
            .read()
            .values()
            .filter(|p| p.owner_id == owner_id)
            .map(|p| p.id.clone())
            .collect()
    }

    fn register_photo(&self, id: &str, owner_id: &str, status: VerificationStatus) -> Result<PhotoRecord, RatingError> {
        let mut photos = self.photos.write();
        if photos.contains_key(id) {
            return Err(RatingError::DuplicatePhoto(id.to_string()));
        }
        let photo = PhotoRecord::new(id, owner_id, self.initial_elo).with_status(status);
        photos.insert(id.to_string(), photo.clone());
        Ok(photo)
    }

    fn set_pool_membership(&self, id: &str, in_pool: bool) -> Result<PhotoRecord, RatingError> {
        let mut photos = self.photos.write();
        let photo = photos.get_mut(id).ok_or_else(|| RatingError::UnknownPhoto(id.to_string()))?;
        photo.in_pool = in_pool;
        Ok(photo.clone())
    }

    fn committed(&self, idempotency_key: &str) -> Option<CommittedRating> {
        self.ledger.read().get(idempotency_key).cloned()
    }

    fn commit_rating(&self, event: &RatingEvent, rate: RateFn<'_>) -> Result<CommitOutcome, RatingError> {
        let lock = self.key_lock(&event.idempotency_key);
        let outcome = {
            let _serialized = lock.lock();
            self.apply(event, rate)
        };
        self.release_key_lock(&event.idempotency_key, lock);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::elo;

    fn store_with(ids: &[(&str, &str)]) -> InMemoryRatingStore {
        let store = InMemoryRatingStore::default();
        for (id, owner) in ids {
            store.register_photo(id, owner, VerificationStatus::Accepted).unwrap();
            store.set_pool_membership(id, true).unwrap();
        }
        store
    }

    fn rate(w: i32, l: i32) -> (i32, i32) {
        elo::update(w, l, 32.0)
    }

    #[test]
    fn test_register_starts_at_initial_elo() {
        let store = InMemoryRatingStore::new(1200);
        let photo = store.register_photo("p1", "u1", VerificationStatus::Accepted).unwrap();
        assert_eq!(photo.elo_score(), 1200);
        assert!(!photo.in_pool);
        assert_eq!(
            store.register_photo("p1", "u2", VerificationStatus::Accepted),
            Err(RatingError::DuplicatePhoto("p1".to_string()))
        );
    }

    #[test]
    fn test_commit_applies_once() {
        let store = store_with(&[("a", "u1"), ("b", "u2")]);
        let event = RatingEvent::new("a", "b", "k1");

        let first = store.commit_rating(&event, &rate).unwrap();
        assert!(!first.is_duplicate());
        assert_eq!(first.committed().new_winner_elo, 1016);

        let second = store.commit_rating(&event, &rate).unwrap();
        assert!(second.is_duplicate());
        assert_eq!(second.committed(), first.committed());
        assert_eq!(store.photo("a").unwrap().rating_count(), 1);
        assert_eq!(store.committed_count(), 1);
    }

    #[test]
    fn test_conflicting_reuse_of_key() {
        let store = store_with(&[("a", "u1"), ("b", "u2")]);
        store.commit_rating(&RatingEvent::new("a", "b", "k1"), &rate).unwrap();
        let result = store.commit_rating(&RatingEvent::new("b", "a", "k1"), &rate);
        assert_eq!(result, Err(RatingError::IdempotencyConflict { key: "k1".to_string() }));
        assert_eq!(store.photo("a").unwrap().elo_score(), 1016);
    }

    #[test]
    fn test_not_in_pool_leaves_state_unchanged() {
        let store = store_with(&[("a", "u1"), ("b", "u2")]);
        store.set_pool_membership("b", false).unwrap();
        let before = store.all_photos();
        let result = store.commit_rating(&RatingEvent::new("a", "b", "k1"), &rate);
        assert_eq!(result, Err(RatingError::NotInPool("b".to_string())));
        assert_eq!(store.all_photos(), before);
        assert!(store.committed("k1").is_none());
    }

    #[test]
    fn test_unknown_photo() {
        let store = store_with(&[("a", "u1")]);
        let result = store.commit_rating(&RatingEvent::new("a", "zzz", "k1"), &rate);
        assert_eq!(result, Err(RatingError::UnknownPhoto("zzz".to_string())));
    }

    #[test]
    fn test_key_lock_table_is_cleaned_up() {
        let store = store_with(&[("a", "u1"), ("b", "u2")]);
        store.commit_rating(&RatingEvent::new("a", "b", "k1"), &rate).unwrap();
        assert!(store.key_locks.lock().is_empty());
    }

    #[test]
    fn test_concurrent_duplicates_apply_once() {
        let store = store_with(&[("a", "u1"), ("b", "u2")]);
        let event = RatingEvent::new("a", "b", "retry-me");

        let outcomes: Vec<CommitOutcome> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| store.commit_rating(&event, &rate).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|o| !o.is_duplicate()).count(), 1);
        let a = store.photo("a").unwrap();
        assert_eq!(a.elo_score(), 1016);
        assert_eq!(a.rating_count(), 1);
        assert!(outcomes.iter().all(|o| o.committed().new_winner_elo == 1016));
    }

    #[test]
    fn test_owned_and_pool_queries() {
        let store = store_with(&[("a", "u1"), ("b", "u1"), ("c", "u2")]);
        store.set_pool_membership("c", false).unwrap();
        assert_eq!(store.photos_owned_by("u1").len(), 2);
        assert_eq!(store.pool_snapshot().len(), 2);
    }
}
