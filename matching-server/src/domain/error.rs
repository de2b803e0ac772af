//! Request validation errors.
//!
//! These represent malformed input rejected before any candidate lookup.
//! They are distinct from upstream/IO errors and are never retried.

use super::geo::InvalidCoordinates;

/// Validation failures for a [`MatchingRequest`](super::MatchingRequest).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    /// Pickup or destination outside the valid latitude/longitude range
    #[error("{field}: {source}")]
    InvalidCoordinates {
        field: &'static str,
        #[source]
        source: InvalidCoordinates,
    },

    /// Any other malformed field
    #[error("invalid request: {0}")]
    Invalid(String),
}
