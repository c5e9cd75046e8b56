//! ELO update for a single win/loss outcome
//!
//! expected_w = 1 / (1 + 10^((Rl - Rw) / 400))
//! new_w = round(Rw + K * (1 - expected_w))
//! new_l = round(Rl + K * (0 - expected_l))

/// Expected score of `rating` against `opponent`
pub fn expected_score(rating: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf((f64::from(opponent) - f64::from(rating)) / 400.0))
}

/// New (winner, loser) ratings
pub fn update(winner: i32, loser: i32, k_factor: f64) -> (i32, i32) {
    let expected_w = expected_score(winner, loser);
    let expected_l = 1.0 - expected_w;
    let new_w = (f64::from(winner) + k_factor * (1.0 - expected_w)).round();
    let new_l = (f64::from(loser) + k_factor * (0.0 - expected_l)).round();
    (new_w as i32, new_l as i32)
}
