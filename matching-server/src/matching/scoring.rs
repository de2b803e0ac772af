//! Candidate scoring.
//!
//! A candidate's score is a weighted sum of three components in [0, 1]:
//! proximity to the pickup, driver rating and availability. Boosted
//! requests multiply the score of nearby candidates by a premium factor.
//! The result depends only on its inputs.

use crate::domain::{CandidateDriver, MatchingRequest};

use super::config::{MatchingConfig, ScoringWeights};

/// Highest possible driver rating.
const MAX_RATING: f64 = 5.0;

/// Computes deterministic candidate scores.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    weights: ScoringWeights,
    max_search_radius_km: f64,
    priority_boost_radius_km: f64,
    premium_priority_boost: f64,
}

impl ScoringEngine {
    pub fn new(config: &MatchingConfig) -> Self {
        Self {
            weights: config.weights,
            max_search_radius_km: config.max_search_radius_km,
            priority_boost_radius_km: config.priority_boost_radius_km,
            premium_priority_boost: config.premium_priority_boost,
        }
    }

    /// Score a candidate at `distance_km` from the pickup.
    ///
    /// Offline and busy candidates always score exactly 0.
    pub fn score(
        &self,
        candidate: &CandidateDriver,
        request: &MatchingRequest,
        distance_km: f64,
    ) -> f64 {
        if !candidate.is_online() {
            return 0.0;
        }

        let distance_score = (1.0 - distance_km / self.max_search_radius_km).max(0.0);
        let rating_score = candidate.rating.clamp(0.0, MAX_RATING) / MAX_RATING;
        let availability_score = 1.0;

        let base = self.weights.distance * distance_score
            + self.weights.rating * rating_score
            + self.weights.availability * availability_score;

        if request.is_boosted() && distance_km <= self.priority_boost_radius_km {
            base * self.premium_priority_boost
        } else {
            base
        }
    }
}
