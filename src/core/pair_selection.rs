//! Uniform pair selection over the eligible pool
//!
//! Eligible = in pool and not owned by the requester. Every eligible photo
//! has the same exposure probability; ratings play no part.

use std::collections::HashSet;

use rand::seq::index;
use rand::Rng;

use crate::error::RatingError;
use crate::types::{ComparisonPair, PhotoRecord};

/// Pick two distinct eligible records uniformly at random
pub fn select_pair<R: Rng + ?Sized>(
    pool: &[PhotoRecord],
    excluded_ids: &HashSet<String>,
    rng: &mut R,
) -> Result<ComparisonPair, RatingError> {
    let eligible: Vec<&PhotoRecord> = pool
        .iter()
        .filter(|p| p.in_pool && !excluded_ids.contains(&p.id))
        .collect();

    if eligible.len() < 2 {
        return Err(RatingError::InsufficientPoolSize { eligible: eligible.len() });
    }

    let picked = index::sample(rng, eligible.len(), 2);
    Ok(ComparisonPair {
        left: eligible[picked.index(0)].clone(),
        right: eligible[picked.index(1)].clone(),
    })
}
