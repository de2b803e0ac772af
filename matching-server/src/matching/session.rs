//! Per-trip matching session state machine.
//!
//! ```text
//! Searching --match-->                        Matched
//! Searching --no match, attempts <  max-->    Searching (cooldown)
//! Searching --no match, attempts == max-->    Failed
//! Searching --deadline-->                     Failed
//! Searching --cancel-->                       Cancelled
//! ```
//!
//! `Matched`, `Failed` and `Cancelled` are terminal. Every transition is
//! checked: applying an event to a terminal session is an error, never a
//! silent no-op.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::TripId;

use super::outcome::{FailureReason, MatchingOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Searching,
    Matched,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Searching)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Searching => "searching",
            SessionState::Matched => "matched",
            SessionState::Failed => "failed",
            SessionState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event applied to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Match,
    NoMatch,
    Fail,
    Cancel,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionEvent::Match => "match",
            SessionEvent::NoMatch => "no-match",
            SessionEvent::Fail => "fail",
            SessionEvent::Cancel => "cancel",
        })
    }
}

/// Rejected session transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("trip {trip_id}: cannot apply {event} in state {from}")]
    InvalidTransition {
        trip_id: TripId,
        from: SessionState,
        event: SessionEvent,
    },

    #[error("trip {trip_id} is already {state}")]
    AlreadyTerminal { trip_id: TripId, state: SessionState },
}

/// Matching progress for one trip.
///
/// Fields are private so that state only changes through the checked
/// transition methods.
#[derive(Debug, Clone)]
pub struct MatchingSession {
    trip_id: TripId,
    state: SessionState,
    attempts: u32,
    created_at: DateTime<Utc>,
    last_attempt_at: Option<DateTime<Utc>>,
    cooldown_until: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    last_reason: Option<FailureReason>,
    outcome: Option<MatchingOutcome>,
}

/// Read-only copy of a session, as returned by status queries.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub trip_id: TripId,
    pub state: SessionState,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_reason: Option<FailureReason>,
    pub outcome: Option<MatchingOutcome>,
}

impl MatchingSession {
    pub fn new(trip_id: TripId, now: DateTime<Utc>) -> Self {
        Self {
            trip_id,
            state: SessionState::Searching,
            attempts: 0,
            created_at: now,
            last_attempt_at: None,
            cooldown_until: None,
            finished_at: None,
            last_reason: None,
            outcome: None,
        }
    }

    pub fn trip_id(&self) -> &TripId {
        &self.trip_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn cooldown_until(&self) -> Option<DateTime<Utc>> {
        self.cooldown_until
    }

    pub fn last_reason(&self) -> Option<FailureReason> {
        self.last_reason
    }

    /// The recorded terminal outcome, if any.
    pub fn outcome(&self) -> Option<&MatchingOutcome> {
        self.outcome.as_ref()
    }

    fn ensure_searching(&self, event: SessionEvent) -> Result<(), SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::InvalidTransition {
                trip_id: self.trip_id.clone(),
                from: self.state,
                event,
            });
        }
        Ok(())
    }

    fn finish(&mut self, state: SessionState, now: DateTime<Utc>) {
        self.state = state;
        self.finished_at = Some(now);
        self.cooldown_until = None;
    }

    /// An attempt found a driver.
    pub fn record_match(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure_searching(SessionEvent::Match)?;
        self.attempts += 1;
        self.last_attempt_at = Some(now);
        self.finish(SessionState::Matched, now);
        Ok(())
    }

    /// An attempt found nobody.
    ///
    /// Fails the session once `max_attempts` attempts have been made,
    /// otherwise stays `Searching` with a cooldown of `retry_delay`.
    /// Returns the resulting state.
    pub fn record_no_match(
        &mut self,
        max_attempts: u32,
        retry_delay: Duration,
        reason: FailureReason,
        now: DateTime<Utc>,
    ) -> Result<SessionState, SessionError> {
        self.ensure_searching(SessionEvent::NoMatch)?;
        self.attempts += 1;
        self.last_attempt_at = Some(now);
        self.last_reason = Some(reason);

        if self.attempts >= max_attempts {
            self.finish(SessionState::Failed, now);
        } else {
            self.cooldown_until = TimeDelta::from_std(retry_delay)
                .ok()
                .and_then(|delay| now.checked_add_signed(delay));
        }
        Ok(self.state)
    }

    /// Fail without another attempt, e.g. when the deadline would pass.
    pub fn fail(&mut self, reason: FailureReason, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure_searching(SessionEvent::Fail)?;
        self.last_reason = Some(reason);
        self.finish(SessionState::Failed, now);
        Ok(())
    }

    /// Cancel a searching session.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::AlreadyTerminal {
                trip_id: self.trip_id.clone(),
                state: self.state,
            });
        }
        self.last_reason = Some(FailureReason::Cancelled);
        self.finish(SessionState::Cancelled, now);
        Ok(())
    }

    /// Store the outcome for a terminal session. Only the first one sticks.
    pub fn set_outcome(&mut self, outcome: MatchingOutcome) {
        if self.state.is_terminal() && self.outcome.is_none() {
            self.outcome = Some(outcome);
        }
    }

    /// When the session last changed: when it finished, else its latest
    /// attempt, else its creation.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.finished_at
            .or(self.last_attempt_at)
            .unwrap_or(self.created_at)
    }

    /// True if idle for at least `retention` as of `now`.
    ///
    /// A searching session that nobody drives any more (the caller went away,
    /// or gave up after an upstream error) expires the same way as a
    /// terminal one. The caller must check that no search is in flight.
    pub fn is_expired(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        match TimeDelta::from_std(retention) {
            Ok(retention) => now - self.last_activity() >= retention,
            Err(_) => false,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            trip_id: self.trip_id.clone(),
            state: self.state,
            attempts: self.attempts,
            created_at: self.created_at,
            last_attempt_at: self.last_attempt_at,
            cooldown_until: self.cooldown_until,
            finished_at: self.finished_at,
            last_reason: self.last_reason,
            outcome: self.outcome.clone(),
        }
    }
}
