//! Wire types for the geospatial service JSON API.
//!
//! These mirror the service's response shapes exactly and are converted to
//! domain types in `convert`. The mock fleet file uses the same shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A driver entry in a nearby-drivers response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyDriver {
    pub driver_id: String,
    pub vehicle_id: String,
    pub lat: f64,
    pub lng: f64,
    pub vehicle_type: String,
    pub rating: f64,
    /// "online", "busy" or "offline"
    pub status: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seats: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessible: Option<bool>,
}

/// Response of `GET /v1/drivers/nearby`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NearbyDriversResponse {
    #[serde(default)]
    pub drivers: Vec<NearbyDriver>,
}

/// Response of `GET /v1/eta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtaResponse {
    pub eta_seconds: f64,
    #[serde(default)]
    pub distance_km: Option<f64>,
}
