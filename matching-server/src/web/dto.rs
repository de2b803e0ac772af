//! Data transfer objects for web requests and responses.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{GeoPoint, MatchingRequest, RiderId, RiderPreferences, TripId, VehicleType};
use crate::matching::{MatchingOutcome, MetricsSnapshot, SessionSnapshot};

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl From<Location> for GeoPoint {
    fn from(l: Location) -> Self {
        GeoPoint::new(l.lat, l.lng)
    }
}

/// Rider preferences in a match request.
#[derive(Debug, Default, Deserialize)]
pub struct PreferencesRequest {
    pub min_driver_rating: Option<f64>,

    #[serde(default)]
    pub accessibility_needs: bool,

    #[serde(default)]
    pub allow_shared_ride: bool,
}

/// Request to find a driver for a trip.
#[derive(Debug, Deserialize)]
pub struct FindMatchRequest {
    pub trip_id: String,
    pub rider_id: String,
    pub pickup: Location,
    pub destination: Location,

    /// Requested vehicle class (e.g., "sedan"); any if absent
    pub vehicle_type: Option<String>,

    /// Defaults to 1
    pub passenger_count: Option<u8>,

    /// 0 is standard, anything above is boosted
    #[serde(default)]
    pub priority_level: u8,

    /// Give up after this many seconds; no limit if absent
    pub max_wait_secs: Option<u64>,

    pub preferences: Option<PreferencesRequest>,
}

impl FindMatchRequest {
    /// Convert into a domain request.
    ///
    /// Identifier and vehicle type syntax is checked here; coordinates and
    /// passenger counts are left to the engine's own validation.
    pub fn into_request(self) -> Result<MatchingRequest, String> {
        let trip_id = TripId::new(self.trip_id).map_err(|e| e.to_string())?;
        let rider_id = RiderId::new(self.rider_id).map_err(|e| e.to_string())?;

        let mut request =
            MatchingRequest::new(trip_id, rider_id, self.pickup.into(), self.destination.into())
                .with_priority(self.priority_level);

        if let Some(vehicle_type) = &self.vehicle_type {
            let vehicle_type = VehicleType::parse_normalized(vehicle_type).map_err(|e| e.to_string())?;
            request = request.with_vehicle_type(vehicle_type);
        }
        if let Some(count) = self.passenger_count {
            request = request.with_passenger_count(count);
        }
        if let Some(secs) = self.max_wait_secs {
            request = request.with_max_wait(Duration::from_secs(secs));
        }
        if let Some(prefs) = self.preferences {
            request = request.with_preferences(RiderPreferences {
                min_driver_rating: prefs.min_driver_rating,
                accessibility_needs: prefs.accessibility_needs,
                allow_shared_ride: prefs.allow_shared_ride,
            });
        }

        Ok(request)
    }
}

/// A fare quote.
#[derive(Debug, Serialize)]
pub struct FareResult {
    /// Amount in minor units (e.g., cents)
    pub amount_minor: u64,
    pub currency: String,
}

/// Result of a match request.
#[derive(Debug, Serialize)]
pub struct MatchOutcomeResponse {
    pub trip_id: String,
    pub success: bool,

    /// "matched", "failed" or "cancelled"
    pub status: &'static str,

    pub driver_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub score: Option<f64>,

    /// Driver's estimated time to the pickup
    pub eta_secs: Option<u64>,

    pub pickup_distance_km: Option<f64>,
    pub fare: Option<FareResult>,

    /// Why no driver was assigned
    pub reason: Option<&'static str>,

    pub retry_count: u32,
    pub processing_time_ms: u64,
}

impl MatchOutcomeResponse {
    pub fn from_outcome(outcome: &MatchingOutcome) -> Self {
        let matched = outcome.matched.as_ref();
        Self {
            trip_id: outcome.trip_id.to_string(),
            success: outcome.is_success(),
            status: outcome.status.as_str(),
            driver_id: matched.map(|m| m.driver_id.to_string()),
            vehicle_id: matched.map(|m| m.vehicle_id.to_string()),
            score: matched.map(|m| m.score),
            eta_secs: matched.map(|m| m.eta.as_secs()),
            pickup_distance_km: matched.map(|m| m.pickup_distance_km),
            fare: matched.and_then(|m| m.fare.as_ref()).map(|f| FareResult {
                amount_minor: f.amount_minor,
                currency: f.currency.clone(),
            }),
            reason: outcome.reason.map(|r| r.as_str()),
            retry_count: outcome.retry_count,
            processing_time_ms: millis(outcome.processing_time),
        }
    }
}

/// Current state of a matching session.
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub trip_id: String,

    /// "searching", "matched", "failed" or "cancelled"
    pub state: &'static str,

    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub last_attempt_at: Option<DateTime<Utc>>,

    /// No further attempt before this time
    pub cooldown_until: Option<DateTime<Utc>>,

    pub finished_at: Option<DateTime<Utc>>,
    pub last_reason: Option<&'static str>,

    /// Present once the session is terminal
    pub outcome: Option<MatchOutcomeResponse>,
}

impl SessionStatusResponse {
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        Self {
            trip_id: snapshot.trip_id.to_string(),
            state: snapshot.state.as_str(),
            attempts: snapshot.attempts,
            created_at: snapshot.created_at,
            last_attempt_at: snapshot.last_attempt_at,
            cooldown_until: snapshot.cooldown_until,
            finished_at: snapshot.finished_at,
            last_reason: snapshot.last_reason.map(|r| r.as_str()),
            outcome: snapshot.outcome.as_ref().map(MatchOutcomeResponse::from_outcome),
        }
    }
}

/// Engine-wide counters.
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub total_requests: u64,
    pub successful_matches: u64,
    pub failed_matches: u64,
    pub cancelled: u64,
    pub upstream_errors: u64,
    pub active_sessions: usize,
    pub success_rate: f64,
    pub average_processing_time_ms: f64,
}

impl From<MetricsSnapshot> for MetricsResponse {
    fn from(m: MetricsSnapshot) -> Self {
        Self {
            total_requests: m.total_requests,
            successful_matches: m.successful_matches,
            failed_matches: m.failed_matches,
            cancelled: m.cancelled,
            upstream_errors: m.upstream_errors,
            active_sessions: m.active_sessions,
            success_rate: m.success_rate,
            average_processing_time_ms: m.average_processing_time.as_secs_f64() * 1000.0,
        }
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
