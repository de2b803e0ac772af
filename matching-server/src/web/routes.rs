//! HTTP route handlers.

use axum::body::Bytes;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::domain::TripId;
use crate::matching::MatchError;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/matching", post(find_match))
        .route("/matching/metrics", get(metrics))
        .route("/matching/:trip_id", get(status).delete(cancel))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Find a driver for a trip. Responds once the session reaches a terminal
/// state, which may take several retry delays.
async fn find_match(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    // Parse JSON manually so we can log the body on failure
    let req: FindMatchRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, body = %String::from_utf8_lossy(&body), "invalid match request JSON");
        AppError::BadRequest {
            message: format!("Invalid JSON: {e}"),
        }
    })?;

    let request = req
        .into_request()
        .map_err(|message| AppError::BadRequest { message })?;

    let outcome = state.engine.find_match(&request).await?;

    Ok(Json(MatchOutcomeResponse::from_outcome(&outcome)).into_response())
}

/// Current state of a trip's matching session.
async fn status(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<SessionStatusResponse>, AppError> {
    let trip_id = parse_trip_id(trip_id)?;
    let snapshot = state.engine.status(&trip_id).await?;
    Ok(Json(SessionStatusResponse::from_snapshot(&snapshot)))
}

/// Cancel a trip's matching session.
async fn cancel(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<SessionStatusResponse>, AppError> {
    let trip_id = parse_trip_id(trip_id)?;
    let snapshot = state.engine.cancel(&trip_id).await?;
    Ok(Json(SessionStatusResponse::from_snapshot(&snapshot)))
}

/// Engine counters.
async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(state.engine.metrics().await.into())
}

fn parse_trip_id(raw: String) -> Result<TripId, AppError> {
    TripId::new(raw).map_err(|e| AppError::BadRequest {
        message: e.to_string(),
    })
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Conflict { message: String },
    BadGateway { message: String },
    Internal { message: String },
}

impl From<MatchError> for AppError {
    fn from(e: MatchError) -> Self {
        let message = e.to_string();
        match e {
            MatchError::InvalidCoordinates { .. } | MatchError::InvalidRequest(_) => {
                AppError::BadRequest { message }
            }
            MatchError::SessionNotFound(_) => AppError::NotFound { message },
            MatchError::AlreadyTerminal { .. } => AppError::Conflict { message },
            MatchError::UpstreamUnavailable(_) => AppError::BadGateway { message },
            MatchError::Session(_) => AppError::Internal { message },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Conflict { message } => (StatusCode::CONFLICT, message),
            AppError::BadGateway { message } => (StatusCode::BAD_GATEWAY, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
