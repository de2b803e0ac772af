//! Lock-free engine counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::outcome::{MatchingOutcome, MetricsSnapshot, OutcomeStatus};

#[derive(Debug, Default)]
pub(crate) struct EngineMetrics {
    total_requests: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    upstream_errors: AtomicU64,
    completed: AtomicU64,
    processing_micros: AtomicU64,
}

impl EngineMetrics {
    pub(crate) fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a freshly produced outcome.
    ///
    /// Cancellations are counted by [`record_cancel`](Self::record_cancel)
    /// so that a cancelled in-flight search is not counted twice.
    pub(crate) fn record_outcome(&self, outcome: &MatchingOutcome) {
        match outcome.status {
            OutcomeStatus::Matched => {
                self.successful.fetch_add(1, Ordering::Relaxed);
            }
            OutcomeStatus::Failed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            OutcomeStatus::Cancelled => {}
        }
        let micros = u64::try_from(outcome.processing_time.as_micros()).unwrap_or(u64::MAX);
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.processing_micros.fetch_add(micros, Ordering::Relaxed);
    }

    pub(crate) fn record_cancel(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_upstream_error(&self) {
        self.upstream_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, active_sessions: usize) -> MetricsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let successful_matches = self.successful.load(Ordering::Relaxed);
        let completed = self.completed.load(Ordering::Relaxed);
        let micros = self.processing_micros.load(Ordering::Relaxed);

        let success_rate = if total_requests == 0 {
            0.0
        } else {
            successful_matches as f64 / total_requests as f64
        };
        let average_processing_time = if completed == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(micros / completed)
        };

        MetricsSnapshot {
            total_requests,
            successful_matches,
            failed_matches: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            upstream_errors: self.upstream_errors.load(Ordering::Relaxed),
            active_sessions,
            success_rate,
            average_processing_time,
        }
    }
}
