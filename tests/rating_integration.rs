//! Integration tests for the rating engine
//!
//! Pair selection, ELO commits and idempotency through RatingEngine
//! over the in-memory store.

use std::sync::Arc;

use photorank::core::{elo, InMemoryRatingStore, RatingEngine, RatingStore};
use photorank::error::RatingError;
use photorank::types::{RatingEvent, VerificationStatus};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn engine_with(photos: &[(&str, &str, bool)]) -> RatingEngine<InMemoryRatingStore> {
    let store = Arc::new(InMemoryRatingStore::default());
    for (id, owner, in_pool) in photos {
        store.register_photo(id, owner, VerificationStatus::Accepted).unwrap();
        store.set_pool_membership(id, *in_pool).unwrap();
    }
    RatingEngine::new(store)
}

fn elo_of(engine: &RatingEngine<InMemoryRatingStore>, id: &str) -> (i32, u32) {
    let photo = engine.store().photo(id).unwrap();
    (photo.elo_score(), photo.rating_count())
}

// ============================================================================
// ELO
// ============================================================================

#[test]
fn test_equal_ratings_move_by_sixteen() {
    let engine = engine_with(&[("a", "u1", true), ("b", "u2", true)]);
    engine.record_outcome(&RatingEvent::new("a", "b", "k1")).unwrap();
    assert_eq!(elo_of(&engine, "a"), (1016, 1));
    assert_eq!(elo_of(&engine, "b"), (984, 1));
}

#[test]
fn test_favourite_win_moves_by_eight() {
    assert_eq!(elo::update(1200, 1000, 32.0), (1208, 992));
}

#[test]
fn test_sequential_outcomes_apply_in_order() {
    let engine = engine_with(&[("a", "u1", true), ("b", "u2", true), ("c", "u3", true)]);
    engine.record_outcome(&RatingEvent::new("a", "b", "k1")).unwrap();
    engine.record_outcome(&RatingEvent::new("a", "c", "k2")).unwrap();

    // a: 1000 → 1016, then 1016 vs 1000
    let (expected_a, expected_c) = elo::update(1016, 1000, 32.0);
    assert_eq!(elo_of(&engine, "a"), (expected_a, 2));
    assert_eq!(elo_of(&engine, "c"), (expected_c, 1));
}

// ============================================================================
// Idempotency and integrity
// ============================================================================

#[test]
fn test_resubmitted_event_is_applied_once() {
    let engine = engine_with(&[("a", "u1", true), ("b", "u2", true)]);
    let event = RatingEvent::new("a", "b", "tap-42");

    let first = engine.record_outcome(&event).unwrap();
    let second = engine.record_outcome(&event).unwrap();
    let third = engine.record_outcome(&event).unwrap();

    assert!(!first.is_duplicate());
    assert!(second.is_duplicate() && third.is_duplicate());
    assert_eq!(second.committed(), first.committed());
    assert_eq!(elo_of(&engine, "a"), (1016, 1));
    assert_eq!(elo_of(&engine, "b"), (984, 1));
}

#[test]
fn test_concurrent_resubmits_from_many_threads() {
    let engine = engine_with(&[("a", "u1", true), ("b", "u2", true)]);
    let event = RatingEvent::new("a", "b", "double-tap");

    std::thread::scope(|scope| {
        for _ in 0..16 {
            scope.spawn(|| engine.record_outcome(&event).unwrap());
        }
    });

    assert_eq!(elo_of(&engine, "a"), (1016, 1));
    assert_eq!(engine.store().committed_count(), 1);
}

#[test]
fn test_concurrent_distinct_keys_all_apply() {
    let engine = engine_with(&[("a", "u1", true), ("b", "u2", true)]);

    std::thread::scope(|scope| {
        for i in 0..20 {
            let engine = &engine;
            scope.spawn(move || engine.record_outcome(&RatingEvent::new("a", "b", format!("k{}", i))).unwrap());
        }
    });

    let (a_elo, a_count) = elo_of(&engine, "a");
    let (b_elo, b_count) = elo_of(&engine, "b");
    assert_eq!((a_count, b_count), (20, 20));
    assert!(a_elo > 1000 && b_elo < 1000);
}

#[test]
fn test_malformed_events_leave_state_unchanged() {
    let engine = engine_with(&[("a", "u1", true), ("b", "u2", true), ("c", "u3", false)]);
    let before = engine.store().all_photos();

    assert_eq!(
        engine.record_outcome(&RatingEvent::new("a", "a", "k1")),
        Err(RatingError::SelfComparison("a".to_string()))
    );
    assert_eq!(
        engine.record_outcome(&RatingEvent::new("a", "c", "k2")),
        Err(RatingError::NotInPool("c".to_string()))
    );
    assert_eq!(
        engine.record_outcome(&RatingEvent::new("a", "zz", "k3")),
        Err(RatingError::UnknownPhoto("zz".to_string()))
    );
    assert_eq!(
        engine.record_outcome(&RatingEvent::new("a", "b", "")),
        Err(RatingError::EmptyIdempotencyKey)
    );

    assert_eq!(engine.store().all_photos(), before);
    assert_eq!(engine.store().committed_count(), 0);
}

#[test]
fn test_key_reused_for_other_outcome_conflicts() {
    let engine = engine_with(&[("a", "u1", true), ("b", "u2", true), ("c", "u3", true)]);
    engine.record_outcome(&RatingEvent::new("a", "b", "k1")).unwrap();
    let err = engine.record_outcome(&RatingEvent::new("c", "b", "k1")).unwrap_err();
    assert!(err.is_integrity_failure());
    assert_eq!(elo_of(&engine, "c"), (1000, 0));
}

// ============================================================================
// Pair selection
// ============================================================================

#[test]
fn test_pool_of_two_always_returns_that_pair() {
    let engine = engine_with(&[("a", "u1", true), ("b", "u2", true), ("c", "u3", false)]);
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..25 {
        let pair = engine.select_pair_for("viewer", &mut rng).unwrap();
        let mut ids = vec![pair.left.id, pair.right.id];
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }
}

#[test]
fn test_too_few_eligible_after_self_exclusion() {
    let mut rng = StdRng::seed_from_u64(1);

    let one_left = engine_with(&[("a", "u1", true), ("b", "u2", true)]);
    assert_eq!(
        one_left.select_pair_for("u1", &mut rng),
        Err(RatingError::InsufficientPoolSize { eligible: 1 })
    );

    let none_left = engine_with(&[("a", "u1", true), ("b", "u1", true)]);
    assert_eq!(
        none_left.select_pair_for("u1", &mut rng),
        Err(RatingError::InsufficientPoolSize { eligible: 0 })
    );

    let empty = engine_with(&[]);
    assert_eq!(
        empty.select_pair_for("u1", &mut rng),
        Err(RatingError::InsufficientPoolSize { eligible: 0 })
    );
}

#[test]
fn test_removed_from_pool_stops_appearing() {
    let engine = engine_with(&[("a", "u1", true), ("b", "u2", true), ("c", "u3", true)]);
    engine.store().set_pool_membership("b", false).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..50 {
        let pair = engine.select_pair_for("viewer", &mut rng).unwrap();
        assert_ne!(pair.left.id, "b");
        assert_ne!(pair.right.id, "b");
    }
}
