//! Terminal results of a matching session and engine-wide metrics.

use std::fmt;
use std::time::Duration;

use crate::domain::{DriverId, TripId, VehicleId};
use crate::pricing::FareEstimate;

/// Why a session ended without a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    NoDriversAvailable,
    MaxWaitExceeded,
    Cancelled,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::NoDriversAvailable => "no drivers available",
            FailureReason::MaxWaitExceeded => "max wait time exceeded",
            FailureReason::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal status recorded in an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeStatus {
    Matched,
    Failed,
    Cancelled,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Matched => "matched",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Details of the assigned driver.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedDriver {
    pub driver_id: DriverId,
    pub vehicle_id: VehicleId,
    pub score: f64,
    pub pickup_distance_km: f64,
    /// Estimated time for the driver to reach the pickup.
    pub eta: Duration,
    /// `None` when no fare estimate was available.
    pub fare: Option<FareEstimate>,
}

/// The result returned to the caller of a matching request.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingOutcome {
    pub trip_id: TripId,
    pub status: OutcomeStatus,
    /// Present exactly when `status` is `Matched`.
    pub matched: Option<MatchedDriver>,
    /// Present exactly when `status` is not `Matched`.
    pub reason: Option<FailureReason>,
    /// Number of attempts made.
    pub retry_count: u32,
    pub processing_time: Duration,
}

impl MatchingOutcome {
    pub fn matched(
        trip_id: TripId,
        driver: MatchedDriver,
        retry_count: u32,
        processing_time: Duration,
    ) -> Self {
        Self {
            trip_id,
            status: OutcomeStatus::Matched,
            matched: Some(driver),
            reason: None,
            retry_count,
            processing_time,
        }
    }

    pub fn failed(
        trip_id: TripId,
        reason: FailureReason,
        retry_count: u32,
        processing_time: Duration,
    ) -> Self {
        Self {
            trip_id,
            status: OutcomeStatus::Failed,
            matched: None,
            reason: Some(reason),
            retry_count,
            processing_time,
        }
    }

    pub fn cancelled(trip_id: TripId, retry_count: u32, processing_time: Duration) -> Self {
        Self {
            trip_id,
            status: OutcomeStatus::Cancelled,
            matched: None,
            reason: Some(FailureReason::Cancelled),
            retry_count,
            processing_time,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Matched
    }

    pub fn driver_id(&self) -> Option<&DriverId> {
        self.matched.as_ref().map(|m| &m.driver_id)
    }
}

/// Point-in-time view of engine counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_matches: u64,
    pub failed_matches: u64,
    pub cancelled: u64,
    pub upstream_errors: u64,
    pub active_sessions: usize,
    /// `successful_matches / total_requests`, 0 when there are no requests.
    pub success_rate: f64,
    /// Mean processing time over completed requests.
    pub average_processing_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip() -> TripId {
        TripId::new("trip-1").unwrap()
    }

    #[test]
    fn failed_outcome_has_reason_and_no_driver() {
        let outcome = MatchingOutcome::failed(
            trip(),
            FailureReason::NoDriversAvailable,
            3,
            Duration::from_millis(5),
        );
        assert!(!outcome.is_success());
        assert_eq!(outcome.driver_id(), None);
        assert_eq!(outcome.reason, Some(FailureReason::NoDriversAvailable));
        assert_eq!(outcome.status.as_str(), "failed");
    }

    #[test]
    fn cancelled_outcome() {
        let outcome = MatchingOutcome::cancelled(trip(), 1, Duration::ZERO);
        assert_eq!(outcome.status, OutcomeStatus::Cancelled);
        assert_eq!(outcome.reason.map(|r| r.to_string()).as_deref(), Some("cancelled"));
    }

    #[test]
    fn reason_strings() {
        assert_eq!(
            FailureReason::NoDriversAvailable.to_string(),
            "no drivers available"
        );
        assert_eq!(
            FailureReason::MaxWaitExceeded.to_string(),
            "max wait time exceeded"
        );
    }
}
