//! Web layer for the matching service.
//!
//! Provides HTTP endpoints for requesting, inspecting and cancelling
//! driver matches.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
