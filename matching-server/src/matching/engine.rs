//! The matching engine.
//!
//! [`MatchingEngine::find_match`] drives one trip's session through repeated
//! attempts: look up nearby drivers, select the best one, and either commit
//! the match or wait out the retry delay. Calls for the same trip run one at
//! a time; calls for different trips run independently.
//!
//! Cancellation is cooperative. [`MatchingEngine::cancel`] marks the session
//! `Cancelled` and wakes the attempt loop, which returns a cancelled outcome
//! at its next checkpoint. A match found after the cancel is discarded
//! because committing it goes through the session state machine.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{InvalidCoordinates, MatchingRequest, RequestError, TripId};
use crate::geo::{CandidateLocator, RouteEstimator, TravelMode, UpstreamError};
use crate::pricing::{FareContext, FareEstimate, FareEstimator};

use super::config::{ConfigError, MatchingConfig};
use super::guard::{ConcurrencyGuard, SessionSlot};
use super::metrics::EngineMetrics;
use super::outcome::{FailureReason, MatchedDriver, MatchingOutcome, MetricsSnapshot};
use super::select::{MatchSelector, ScoredCandidate, Selection};
use super::session::{MatchingSession, SessionError, SessionSnapshot, SessionState};

/// Errors from engine operations.
///
/// "No driver found" is not an error: it is a failed [`MatchingOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("{field}: {source}")]
    InvalidCoordinates {
        field: &'static str,
        #[source]
        source: InvalidCoordinates,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[source] UpstreamError),

    #[error("no matching session for trip {0}")]
    SessionNotFound(TripId),

    #[error("trip {trip_id} is already {state}")]
    AlreadyTerminal { trip_id: TripId, state: SessionState },

    #[error(transparent)]
    Session(SessionError),
}

impl From<RequestError> for MatchError {
    fn from(e: RequestError) -> Self {
        match e {
            RequestError::InvalidCoordinates { field, source } => {
                MatchError::InvalidCoordinates { field, source }
            }
            RequestError::Invalid(message) => MatchError::InvalidRequest(message),
        }
    }
}

impl From<SessionError> for MatchError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::AlreadyTerminal { trip_id, state } => {
                MatchError::AlreadyTerminal { trip_id, state }
            }
            other => MatchError::Session(other),
        }
    }
}

/// ETA from straight-line distance at a constant speed, rounded up to
/// whole seconds.
pub fn fallback_eta(distance_km: f64, speed_kmh: f64) -> Duration {
    let secs = (distance_km / speed_kmh * 3600.0).ceil();
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

/// Matches riders to drivers.
pub struct MatchingEngine {
    config: MatchingConfig,
    selector: MatchSelector,
    locator: Arc<dyn CandidateLocator>,
    routes: Option<Arc<dyn RouteEstimator>>,
    fares: Option<Arc<dyn FareEstimator>>,
    guard: ConcurrencyGuard,
    metrics: EngineMetrics,
}

impl MatchingEngine {
    pub fn new(config: MatchingConfig, locator: Arc<dyn CandidateLocator>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            selector: MatchSelector::new(&config),
            config,
            locator,
            routes: None,
            fares: None,
            guard: ConcurrencyGuard::new(),
            metrics: EngineMetrics::default(),
        })
    }

    /// Use road-network ETAs instead of the straight-line fallback.
    pub fn with_route_estimator(mut self, routes: Arc<dyn RouteEstimator>) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Attach fare estimates to matches.
    pub fn with_fare_estimator(mut self, fares: Arc<dyn FareEstimator>) -> Self {
        self.fares = Some(fares);
        self
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Find a driver for `request`.
    ///
    /// Runs attempts until a driver is matched, the attempt budget or the
    /// rider's `max_wait` is exhausted, or the trip is cancelled. If the
    /// trip's session is already terminal, its recorded outcome is returned
    /// without another search.
    ///
    /// Invalid requests are rejected before a session is created. A locator
    /// failure aborts the call with [`MatchError::UpstreamUnavailable`] and
    /// leaves the session searching, without counting the attempt. A session
    /// nobody resumes is evicted once idle for the retention window, as is
    /// one whose caller dropped the future mid-search.
    pub async fn find_match(&self, request: &MatchingRequest) -> Result<MatchingOutcome, MatchError> {
        request.validate()?;

        let started = Instant::now();
        let trip_id = &request.trip_id;
        let (slot, _in_flight) = self.acquire(trip_id).await;

        {
            let mut session = slot.session.write().await;
            if session.is_terminal() {
                debug!(trip_id = %trip_id, state = %session.state(), "replaying terminal outcome");
                return settle(&mut session, Duration::ZERO).ok_or_else(|| MatchError::AlreadyTerminal {
                    trip_id: trip_id.clone(),
                    state: session.state(),
                });
            }
        }

        self.metrics.record_request();
        let mut cancelled = slot.subscribe();

        loop {
            if let Some(outcome) = self.checkpoint(&slot, started).await {
                return Ok(outcome);
            }

            let candidates = self
                .locator
                .find_nearby_drivers(
                    request.pickup,
                    self.config.max_search_radius_km,
                    self.config.candidate_limit,
                )
                .await
                .map_err(|e| {
                    self.metrics.record_upstream_error();
                    warn!(trip_id = %trip_id, error = %e, "candidate lookup failed");
                    MatchError::UpstreamUnavailable(e)
                })?;

            match self.selector.select(&candidates, request)? {
                Selection::Found(ranked) => {
                    let winner = ranked.into_winner();
                    let (eta, fare) = tokio::join!(
                        self.estimate_eta(&winner, request),
                        self.estimate_fare(&winner, request),
                    );

                    let mut session = slot.session.write().await;
                    if let Err(e) = session.record_match(Utc::now()) {
                        if session.state() == SessionState::Cancelled {
                            debug!(trip_id = %trip_id, "match discarded after cancellation");
                            continue;
                        }
                        return Err(e.into());
                    }

                    let outcome = MatchingOutcome::matched(
                        trip_id.clone(),
                        MatchedDriver {
                            driver_id: winner.driver.driver_id,
                            vehicle_id: winner.driver.vehicle_id,
                            score: winner.score,
                            pickup_distance_km: winner.distance_km,
                            eta,
                            fare,
                        },
                        session.attempts(),
                        started.elapsed(),
                    );
                    session.set_outcome(outcome.clone());
                    drop(session);

                    self.metrics.record_outcome(&outcome);
                    info!(
                        trip_id = %trip_id,
                        driver_id = ?outcome.driver_id(),
                        attempts = outcome.retry_count,
                        eta_secs = eta.as_secs(),
                        "driver matched"
                    );
                    return Ok(outcome);
                }
                Selection::NoMatch => {
                    let mut session = slot.session.write().await;
                    let attempt = session.attempts() + 1;
                    let delay = self.config.retry.delay_after(attempt);
                    let now = Utc::now();

                    let state = match session.record_no_match(
                        self.config.max_attempts,
                        delay,
                        FailureReason::NoDriversAvailable,
                        now,
                    ) {
                        Ok(state) => state,
                        Err(_) if session.state() == SessionState::Cancelled => continue,
                        Err(e) => return Err(e.into()),
                    };
                    debug!(
                        trip_id = %trip_id,
                        attempt,
                        candidates = candidates.len(),
                        "no eligible driver"
                    );

                    let out_of_time = !request.max_wait.is_zero()
                        && started.elapsed().saturating_add(delay) > request.max_wait;
                    if state == SessionState::Searching && out_of_time {
                        session.fail(FailureReason::MaxWaitExceeded, now)?;
                    }

                    if session.is_terminal() {
                        let reason = session
                            .last_reason()
                            .unwrap_or(FailureReason::NoDriversAvailable);
                        let outcome = MatchingOutcome::failed(
                            trip_id.clone(),
                            reason,
                            session.attempts(),
                            started.elapsed(),
                        );
                        session.set_outcome(outcome.clone());
                        drop(session);

                        self.metrics.record_outcome(&outcome);
                        info!(
                            trip_id = %trip_id,
                            attempts = outcome.retry_count,
                            reason = %reason,
                            "matching failed"
                        );
                        return Ok(outcome);
                    }
                    drop(session);

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancelled.changed() => {
                            debug!(trip_id = %trip_id, "retry wait interrupted");
                        }
                    }
                }
            }
        }
    }

    /// The trip's slot with its in-flight lock held.
    ///
    /// The janitor may evict an idle slot between lookup and locking, so
    /// the slot is re-checked once locked and looked up again if it was
    /// removed.
    async fn acquire(&self, trip_id: &TripId) -> (Arc<SessionSlot>, OwnedMutexGuard<()>) {
        loop {
            let slot = self.guard.get_or_create(trip_id, Utc::now()).await;
            let in_flight = Arc::clone(&slot.in_flight).lock_owned().await;
            if self.guard.holds(trip_id, &slot).await {
                return (slot, in_flight);
            }
            debug!(trip_id = %trip_id, "session evicted while waiting, retrying lookup");
        }
    }

    /// Return the terminal outcome if the session has ended.
    async fn checkpoint(&self, slot: &SessionSlot, started: Instant) -> Option<MatchingOutcome> {
        let mut session = slot.session.write().await;
        if !session.is_terminal() {
            return None;
        }
        let outcome = settle(&mut session, started.elapsed())?;
        drop(session);

        self.metrics.record_outcome(&outcome);
        info!(trip_id = %outcome.trip_id, attempts = outcome.retry_count, "matching stopped by cancellation");
        Some(outcome)
    }

    async fn estimate_eta(&self, winner: &ScoredCandidate, request: &MatchingRequest) -> Duration {
        if let Some(routes) = &self.routes {
            match routes
                .calculate_eta(winner.driver.location, request.pickup, TravelMode::Driving)
                .await
            {
                Ok(eta) => return eta,
                Err(e) => {
                    warn!(trip_id = %request.trip_id, error = %e, "ETA estimate failed, using straight-line fallback");
                }
            }
        }
        fallback_eta(winner.distance_km, self.config.fallback_speed_kmh)
    }

    async fn estimate_fare(&self, winner: &ScoredCandidate, request: &MatchingRequest) -> Option<FareEstimate> {
        let fares = self.fares.as_ref()?;
        let context = FareContext {
            trip_id: request.trip_id.clone(),
            pickup: request.pickup,
            destination: request.destination,
            vehicle_type: winner.driver.vehicle_type.clone(),
            trip_distance_km: request.pickup.distance_km(&request.destination),
            passenger_count: request.passenger_count,
            shared_ride: request.allows_shared_ride(),
        };
        match fares.estimate_fare(context).await {
            Ok(fare) => Some(fare),
            Err(e) => {
                warn!(trip_id = %request.trip_id, error = %e, "fare estimate failed");
                None
            }
        }
    }

    /// Current state of a trip's session.
    pub async fn status(&self, trip_id: &TripId) -> Result<SessionSnapshot, MatchError> {
        let slot = self
            .guard
            .get(trip_id)
            .await
            .ok_or_else(|| MatchError::SessionNotFound(trip_id.clone()))?;
        let snapshot = slot.session.read().await.snapshot();
        Ok(snapshot)
    }

    /// Cancel a searching session.
    ///
    /// An in-flight `find_match` for the trip stops at its next checkpoint
    /// and returns a cancelled outcome.
    pub async fn cancel(&self, trip_id: &TripId) -> Result<SessionSnapshot, MatchError> {
        let slot = self
            .guard
            .get(trip_id)
            .await
            .ok_or_else(|| MatchError::SessionNotFound(trip_id.clone()))?;

        let snapshot = {
            let mut session = slot.session.write().await;
            session.cancel(Utc::now())?;
            // Nobody is searching, so record the outcome here
            if slot.in_flight.try_lock().is_ok() {
                settle(&mut session, Duration::ZERO);
            }
            session.snapshot()
        };
        slot.notify_cancelled();
        self.metrics.record_cancel();

        info!(trip_id = %trip_id, "matching cancelled");
        Ok(snapshot)
    }

    pub async fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.guard.active().await)
    }

    /// Number of sessions currently held, terminal or not.
    pub async fn session_count(&self) -> usize {
        self.guard.len().await
    }

    /// Remove sessions idle for longer than the configured retention:
    /// terminal ones, and searching ones nobody is driving.
    pub async fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let evicted = self
            .guard
            .evict_expired(now, self.config.session_retention)
            .await;
        if evicted > 0 {
            debug!(evicted, "expired sessions evicted");
        }
        evicted
    }

    /// Spawn a background task that evicts expired sessions every `period`.
    pub fn spawn_janitor(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // First tick is immediate, skip it
            loop {
                interval.tick().await;
                engine.evict_expired(Utc::now()).await;
            }
        })
    }
}

/// The terminal outcome of `session`, recording one if none is stored yet.
///
/// Returns `None` for a searching session, and for a matched session
/// without an outcome, which the engine never produces.
fn settle(session: &mut MatchingSession, processing_time: Duration) -> Option<MatchingOutcome> {
    if let Some(outcome) = session.outcome() {
        return Some(outcome.clone());
    }

    let trip_id = session.trip_id().clone();
    let outcome = match session.state() {
        SessionState::Cancelled => {
            MatchingOutcome::cancelled(trip_id, session.attempts(), processing_time)
        }
        SessionState::Failed => MatchingOutcome::failed(
            trip_id,
            session
                .last_reason()
                .unwrap_or(FailureReason::NoDriversAvailable),
            session.attempts(),
            processing_time,
        ),
        SessionState::Searching | SessionState::Matched => return None,
    };
    session.set_outcome(outcome.clone());
    Some(outcome)
}
