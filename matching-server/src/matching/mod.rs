//! Rider-to-driver matching.
//!
//! Scoring and selection are pure functions of their inputs. The
//! [`MatchingEngine`] owns per-trip sessions, drives retries and talks to the
//! geospatial and pricing collaborators.

mod config;
mod engine;
mod guard;
mod metrics;
mod outcome;
mod scoring;
mod select;
mod session;


pub use config::{ConfigError, MatchingConfig, RetryPolicy, ScoringWeights};
pub use engine::{MatchError, MatchingEngine, fallback_eta};
pub use outcome::{FailureReason, MatchedDriver, MatchingOutcome, MetricsSnapshot, OutcomeStatus};
pub use scoring::ScoringEngine;
pub use select::{MatchSelector, RankedCandidates, ScoredCandidate, Selection, compare_ranked};
pub use session::{MatchingSession, SessionError, SessionEvent, SessionSnapshot, SessionState};
