//! Elo rating engine
//!
//! `R' = R + K * (S - E)` with `E = 1 / (1 + 10^((R_opp - R) / c))`.
//! Values are kept exact; only presentation rounds.

use serde::{Deserialize, Serialize};

use crate::config::RatingConfig;

/// Expected score of a player rated `rating` against `opponent_rating`
pub fn expected_score(rating: f64, opponent_rating: f64, scale: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent_rating - rating) / scale))
}

/// New rating after one game. `won` is 1.0 for a win and 0.0 for a loss.
pub fn rate(rating: f64, k: f64, won: f64, opponent_rating: f64, scale: f64) -> f64 {
    rating + k * (won - expected_score(rating, opponent_rating, scale))
}

/// Ratings of both sides before and after a match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub winner_before: f64,
    pub winner_after: f64,
    pub loser_before: f64,
    pub loser_after: f64,
}

impl RatingUpdate {
    /// Rounded rating change for the winner, as shown to players
    pub fn winner_delta(&self) -> i64 {
        (self.winner_after - self.winner_before).round() as i64
    }

    pub fn loser_delta(&self) -> i64 {
        (self.loser_after - self.loser_before).round() as i64
    }
}

/// Rating engine with fixed K-factor and scale
#[derive(Debug, Clone, Copy)]
pub struct RatingEngine {
    k_factor: f64,
    scale: f64,
}

impl RatingEngine {
    pub fn new(k_factor: f64, scale: f64) -> Self {
        Self { k_factor, scale }
    }

    pub fn from_config(config: &RatingConfig) -> Self {
        Self::new(config.k_factor, config.scale)
    }

    /// Rate both sides of a decided match from their pre-match ratings
    pub fn settle(&self, winner_rating: f64, loser_rating: f64) -> RatingUpdate {
        RatingUpdate {
            winner_before: winner_rating,
            winner_after: rate(winner_rating, self.k_factor, 1.0, loser_rating, self.scale),
            loser_before: loser_rating,
            loser_after: rate(loser_rating, self.k_factor, 0.0, winner_rating, self.scale),
        }
    }
}

impl Default for RatingEngine {
    fn default() -> Self {
        Self::from_config(&RatingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_equal_opponents_move_by_half_k() {
        for r in [800.0, 1500.0, 2213.75] {
            assert!((rate(r, 32.0, 1.0, r, 400.0) - (r + 16.0)).abs() < EPS);
            assert!((rate(r, 32.0, 0.0, r, 400.0) - (r - 16.0)).abs() < EPS);
        }
    }

    #[test]
    fn test_even_duel_scenario() {
        let update = RatingEngine::default().settle(1500.0, 1500.0);
        assert!((update.winner_after - 1516.0).abs() < EPS);
        assert!((update.loser_after - 1484.0).abs() < EPS);
        assert_eq!(update.winner_delta(), 16);
        assert_eq!(update.loser_delta(), -16);
    }

    #[test]
    fn test_winner_never_loses_and_loser_never_gains() {
        let engine = RatingEngine::default();
        let ratings = [600.0, 1200.0, 1500.0, 1800.0, 2600.0];
        for &w in &ratings {
            for &l in &ratings {
                let update = engine.settle(w, l);
                assert!(update.winner_after >= update.winner_before);
                assert!(update.loser_after <= update.loser_before);
            }
        }
    }

    #[test]
    fn test_upset_moves_more_than_expected_win() {
        let engine = RatingEngine::default();
        let upset = engine.settle(1300.0, 1700.0);
        let expected = engine.settle(1700.0, 1300.0);
        assert!(upset.winner_after - upset.winner_before > 29.0);
        assert!(expected.winner_after - expected.winner_before < 3.0);
    }

    #[test]
    fn test_expected_scores_are_complementary() {
        let a = expected_score(1620.0, 1480.0, 400.0);
        let b = expected_score(1480.0, 1620.0, 400.0);
        assert!((a + b - 1.0).abs() < EPS);
        assert!(a > 0.5);
    }

    #[test]
    fn test_rating_points_are_conserved_between_two_sides() {
        let update = RatingEngine::default().settle(1712.4, 1388.9);
        let before = update.winner_before + update.loser_before;
        let after = update.winner_after + update.loser_after;
        assert!((before - after).abs() < EPS);
    }
}
