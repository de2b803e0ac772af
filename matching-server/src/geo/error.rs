//! Errors from external collaborators.

/// Failure talking to the geospatial or pricing service.
///
/// The matching core never retries these; they abort the current attempt
/// and surface to the caller as `UpstreamUnavailable`.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// Service returned an error status code
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the service
    #[error("rate limited by {0}")]
    RateLimited(&'static str),

    /// Credentials rejected
    #[error("unauthorized (check the configured API key)")]
    Unauthorized,

    /// Collaborator cannot serve requests right now
    #[error("{0}")]
    Unavailable(String),
}
