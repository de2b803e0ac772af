//! Candidate filtering, ranking and winner selection.

use std::cmp::Ordering;

use tracing::trace;

use crate::domain::{CandidateDriver, MatchingRequest, RequestError};

use super::config::MatchingConfig;
use super::scoring::ScoringEngine;

/// A candidate with its computed pickup distance and score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub driver: CandidateDriver,
    pub distance_km: f64,
    pub score: f64,
}

/// Eligible candidates, best first. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidates {
    ranked: Vec<ScoredCandidate>,
}

impl RankedCandidates {
    /// The best candidate.
    pub fn winner(&self) -> &ScoredCandidate {
        &self.ranked[0]
    }

    pub fn into_winner(mut self) -> ScoredCandidate {
        self.ranked.swap_remove(0)
    }

    pub fn as_slice(&self) -> &[ScoredCandidate] {
        &self.ranked
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

/// Result of one selection pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Found(RankedCandidates),
    /// No eligible driver this attempt. A normal outcome, not an error.
    NoMatch,
}

/// Ranking order: score descending, then distance ascending, then driver id.
///
/// The final key makes the order total, so selection never depends on
/// the order the locator returned candidates in.
pub fn compare_ranked(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.distance_km.total_cmp(&b.distance_km))
        .then_with(|| a.driver.driver_id.cmp(&b.driver.driver_id))
}

/// Filters, scores and ranks candidates for a request.
#[derive(Debug, Clone)]
pub struct MatchSelector {
    scoring: ScoringEngine,
    max_search_radius_km: f64,
}

impl MatchSelector {
    pub fn new(config: &MatchingConfig) -> Self {
        Self {
            scoring: ScoringEngine::new(config),
            max_search_radius_km: config.max_search_radius_km,
        }
    }

    /// Select the best candidate for `request`.
    ///
    /// Returns an error only for an invalid request; an empty or fully
    /// ineligible pool yields [`Selection::NoMatch`].
    pub fn select(
        &self,
        candidates: &[CandidateDriver],
        request: &MatchingRequest,
    ) -> Result<Selection, RequestError> {
        request.validate()?;

        let mut scored: Vec<ScoredCandidate> = candidates
            .iter()
            .filter(|c| self.is_eligible(c, request))
            .filter_map(|c| {
                let distance_km = request.pickup.distance_km(&c.location);
                if distance_km > self.max_search_radius_km {
                    return None;
                }
                let score = self.scoring.score(c, request, distance_km);
                (score > 0.0).then(|| ScoredCandidate {
                    driver: c.clone(),
                    distance_km,
                    score,
                })
            })
            .collect();

        trace!(
            trip_id = %request.trip_id,
            offered = candidates.len(),
            eligible = scored.len(),
            "candidates scored"
        );

        if scored.is_empty() {
            return Ok(Selection::NoMatch);
        }

        scored.sort_by(compare_ranked);

        Ok(Selection::Found(RankedCandidates { ranked: scored }))
    }

    /// Hard filters that do not depend on distance.
    fn is_eligible(&self, candidate: &CandidateDriver, request: &MatchingRequest) -> bool {
        if !candidate.is_online() {
            return false;
        }

        if let Some(wanted) = &request.vehicle_type
            && &candidate.vehicle_type != wanted
        {
            return false;
        }

        if candidate.seats < request.passenger_count {
            return false;
        }

        if let Some(min) = request.min_driver_rating()
            && candidate.rating < min
        {
            return false;
        }

        if request.needs_accessibility() && !candidate.accessible {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Availability, DriverId, GeoPoint, RiderId, RiderPreferences, TripId, VehicleId,
        VehicleType,
    };
    use chrono::{TimeZone, Utc};

    const PICKUP: (f64, f64) = (40.7128, -74.0060);

    fn vt(s: &str) -> VehicleType {
        VehicleType::parse(s).unwrap()
    }

    fn driver(id: &str, offset: (f64, f64), vehicle: &str, rating: f64) -> CandidateDriver {
        CandidateDriver::new(
            DriverId::new(id).unwrap(),
            VehicleId::new(format!("v-{id}")).unwrap(),
            GeoPoint::new(PICKUP.0 + offset.0, PICKUP.1 + offset.1),
            vt(vehicle),
            rating,
            Utc.with_ymd_and_hms(2026, 1, 3, 10, 0, 0).unwrap(),
        )
    }

    fn request() -> MatchingRequest {
        MatchingRequest::new(
            TripId::new("trip-1").unwrap(),
            RiderId::new("rider-1").unwrap(),
            GeoPoint::new(PICKUP.0, PICKUP.1),
            GeoPoint::new(40.7580, -73.9855),
        )
    }

    fn selector() -> MatchSelector {
        MatchSelector::new(&MatchingConfig::default())
    }

    fn winner_id(selection: &Selection) -> &str {
        match selection {
            Selection::Found(ranked) => ranked.winner().driver.driver_id.as_str(),
            Selection::NoMatch => panic!("expected a match"),
        }
    }

    #[test]
    fn best_weighted_score_beats_nearest() {
        let a = driver("a", (0.01, 0.01), "sedan", 4.8);
        let b = driver("b", (-0.005, 0.015), "sedan", 4.6);
        let c = driver("c", (0.02, -0.01), "sedan", 4.9).with_availability(Availability::Busy);
        let req = request().with_vehicle_type(vt("sedan"));

        let selection = selector().select(&[a, b, c], &req).unwrap();

        let Selection::Found(ranked) = &selection else {
            panic!("expected a match");
        };
        assert_eq!(ranked.len(), 2);
        assert_eq!(winner_id(&selection), "a");
        // "b" is geometrically nearer but loses on rating
        let b_scored = &ranked.as_slice()[1];
        assert_eq!(b_scored.driver.driver_id.as_str(), "b");
        assert!(b_scored.distance_km < ranked.winner().distance_km);
    }

    #[test]
    fn empty_pool_is_no_match() {
        let selection = selector().select(&[], &request()).unwrap();
        assert_eq!(selection, Selection::NoMatch);
    }

    #[test]
    fn vehicle_type_mismatch_is_no_match() {
        let pool = vec![
            driver("a", (0.01, 0.0), "sedan", 4.8),
            driver("b", (0.0, 0.01), "sedan", 4.9),
        ];
        let req = request().with_vehicle_type(vt("luxury"));
        assert_eq!(selector().select(&pool, &req).unwrap(), Selection::NoMatch);
    }

    #[test]
    fn invalid_coordinates_rejected() {
        let mut req = request();
        req.pickup = GeoPoint::new(91.0, -74.0);
        let pool = vec![driver("a", (0.0, 0.0), "sedan", 4.8)];
        assert!(matches!(
            selector().select(&pool, &req),
            Err(RequestError::InvalidCoordinates { field: "pickup", .. })
        ));
    }

    #[test]
    fn offline_candidates_excluded() {
        let pool = vec![
            driver("a", (0.0, 0.0), "sedan", 5.0).with_availability(Availability::Offline),
            driver("b", (0.0, 0.0), "sedan", 5.0).with_availability(Availability::Busy),
        ];
        assert_eq!(selector().select(&pool, &request()).unwrap(), Selection::NoMatch);
    }

    #[test]
    fn beyond_radius_excluded() {
        // 0.2 degrees of latitude is ~22 km
        let pool = vec![driver("far", (0.2, 0.0), "sedan", 5.0)];
        assert_eq!(selector().select(&pool, &request()).unwrap(), Selection::NoMatch);
    }

    #[test]
    fn any_vehicle_type_when_unspecified() {
        let pool = vec![driver("suv", (0.001, 0.0), "suv", 4.0)];
        assert_eq!(winner_id(&selector().select(&pool, &request()).unwrap()), "suv");
    }

    #[test]
    fn tie_broken_by_distance_then_id() {
        // Same spot and rating: tie on score and distance, resolved by id
        let pool = vec![
            driver("y", (0.01, 0.0), "sedan", 4.5),
            driver("x", (0.01, 0.0), "sedan", 4.5),
        ];
        let Selection::Found(ranked) = selector().select(&pool, &request()).unwrap() else {
            panic!("expected a match");
        };
        let ids: Vec<_> = ranked
            .as_slice()
            .iter()
            .map(|c| c.driver.driver_id.as_str())
            .collect();
        assert_eq!(ids, vec!["x", "y"]);
    }

    #[test]
    fn compare_prefers_nearer_on_equal_score() {
        let base = driver("b", (0.0, 0.0), "sedan", 4.0);
        let near = ScoredCandidate {
            driver: base.clone(),
            distance_km: 1.0,
            score: 0.5,
        };
        let far = ScoredCandidate {
            driver: driver("a", (0.0, 0.0), "sedan", 4.0),
            distance_km: 2.0,
            score: 0.5,
        };
        assert_eq!(compare_ranked(&near, &far), Ordering::Less);
        assert_eq!(compare_ranked(&far, &near), Ordering::Greater);
    }

    #[test]
    fn capacity_filter() {
        let pool = vec![
            driver("small", (0.001, 0.0), "sedan", 5.0),
            driver("big", (0.01, 0.0), "sedan", 4.0).with_seats(6),
        ];
        let req = request().with_passenger_count(5);
        assert_eq!(winner_id(&selector().select(&pool, &req).unwrap()), "big");
    }

    #[test]
    fn min_rating_preference() {
        let pool = vec![
            driver("low", (0.001, 0.0), "sedan", 4.2),
            driver("high", (0.02, 0.0), "sedan", 4.9),
        ];
        let req = request().with_preferences(RiderPreferences {
            min_driver_rating: Some(4.5),
            ..RiderPreferences::default()
        });
        assert_eq!(winner_id(&selector().select(&pool, &req).unwrap()), "high");
    }

    #[test]
    fn accessibility_preference() {
        let pool = vec![
            driver("std", (0.001, 0.0), "van", 5.0),
            driver("wav", (0.02, 0.0), "van", 4.0).with_accessible(true),
        ];
        let req = request().with_preferences(RiderPreferences {
            accessibility_needs: true,
            ..RiderPreferences::default()
        });
        assert_eq!(winner_id(&selector().select(&pool, &req).unwrap()), "wav");
    }

    #[test]
    fn boosted_request_multiplies_nearby_score() {
        let pool = vec![driver("a", (0.01, 0.0), "sedan", 4.0)];
        let plain = selector().select(&pool, &request()).unwrap();
        let boosted = selector()
            .select(&pool, &request().with_priority(1))
            .unwrap();
        let (Selection::Found(p), Selection::Found(b)) = (plain, boosted) else {
            panic!("expected matches");
        };
        assert!((b.winner().score - p.winner().score * 1.5).abs() < 1e-12);
    }

    #[test]
    fn into_winner_returns_best() {
        let pool = vec![
            driver("b", (0.02, 0.0), "sedan", 4.0),
            driver("a", (0.001, 0.0), "sedan", 5.0),
        ];
        let Selection::Found(ranked) = selector().select(&pool, &request()).unwrap() else {
            panic!("expected a match");
        };
        assert_eq!(ranked.into_winner().driver.driver_id.as_str(), "a");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::{
        Availability, DriverId, GeoPoint, RiderId, TripId, VehicleId, VehicleType,
    };
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    const VEHICLES: [&str; 3] = ["sedan", "suv", "luxury"];

    fn candidate_strategy() -> impl Strategy<Value = CandidateDriver> {
        (
            0u32..20,
            -0.05f64..0.05,
            -0.05f64..0.05,
            0usize..3,
            0.0f64..=5.0,
            0u8..3,
        )
            .prop_map(|(id, dlat, dlng, vehicle, rating, status)| {
                let availability = match status {
                    0 => Availability::Online,
                    1 => Availability::Busy,
                    _ => Availability::Offline,
                };
                CandidateDriver::new(
                    DriverId::new(format!("d{id}")).unwrap(),
                    VehicleId::new(format!("v{id}")).unwrap(),
                    GeoPoint::new(40.0 + dlat, -74.0 + dlng),
                    VehicleType::parse(VEHICLES[vehicle]).unwrap(),
                    rating,
                    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
                )
                .with_availability(availability)
            })
    }

    fn request(vehicle: Option<usize>) -> MatchingRequest {
        let req = MatchingRequest::new(
            TripId::new("t").unwrap(),
            RiderId::new("r").unwrap(),
            GeoPoint::new(40.0, -74.0),
            GeoPoint::new(40.1, -74.1),
        );
        match vehicle {
            Some(v) => req.with_vehicle_type(VehicleType::parse(VEHICLES[v]).unwrap()),
            None => req,
        }
    }

    proptest! {
        #[test]
        fn winner_matches_requested_vehicle_type(
            pool in prop::collection::vec(candidate_strategy(), 0..15),
            vehicle in 0usize..3,
        ) {
            let req = request(Some(vehicle));
            let selector = MatchSelector::new(&MatchingConfig::default());
            if let Selection::Found(ranked) = selector.select(&pool, &req).unwrap() {
                for c in ranked.as_slice() {
                    prop_assert_eq!(c.driver.vehicle_type.as_str(), VEHICLES[vehicle]);
                    prop_assert!(c.driver.is_online());
                }
            }
        }

        #[test]
        fn selection_independent_of_input_order(
            pool in prop::collection::vec(candidate_strategy(), 1..15),
        ) {
            let req = request(None);
            let selector = MatchSelector::new(&MatchingConfig::default());
            let forward = selector.select(&pool, &req).unwrap();

            let mut reversed = pool.clone();
            reversed.reverse();
            let backward = selector.select(&reversed, &req).unwrap();

            match (forward, backward) {
                (Selection::Found(f), Selection::Found(b)) => {
                    prop_assert_eq!(&f.winner().driver.driver_id, &b.winner().driver.driver_id);
                    prop_assert_eq!(f.winner().score, b.winner().score);
                }
                (Selection::NoMatch, Selection::NoMatch) => {}
                _ => prop_assert!(false, "selection depended on input order"),
            }
        }

        #[test]
        fn ranked_is_sorted(pool in prop::collection::vec(candidate_strategy(), 1..15)) {
            let selector = MatchSelector::new(&MatchingConfig::default());
            if let Selection::Found(ranked) = selector.select(&pool, &request(None)).unwrap() {
                for pair in ranked.as_slice().windows(2) {
                    prop_assert_ne!(compare_ranked(&pair[0], &pair[1]), Ordering::Greater);
                    prop_assert!(pair[0].score >= pair[1].score);
                }
            }
        }
    }
}
