//! Geospatial service collaborators.
//!
//! The matching core depends on two capabilities of the geospatial service:
//! - [`CandidateLocator`]: nearby candidate drivers for a point and radius
//!   (required)
//! - [`RouteEstimator`]: road ETA between two points, used to refine the
//!   winner's ETA (optional; the engine falls back to haversine distance at
//!   a configured speed)
//!
//! Both are object-safe so the engine can hold them as `Arc<dyn ...>` and
//! tests can substitute doubles at the boundary.

mod client;
mod convert;
mod error;
mod mock;
mod types;

use std::fmt;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::domain::{CandidateDriver, GeoPoint};

pub use client::{GeoClientConfig, HttpGeoClient};
pub(crate) use client::{build_http, decode_response};
pub use convert::{ConversionError, convert_driver, convert_drivers};
pub use error::UpstreamError;
pub use mock::MockFleetLocator;
pub use types::{EtaResponse, NearbyDriver, NearbyDriversResponse};

/// Source of candidate drivers near a point.
pub trait CandidateLocator: Send + Sync {
    /// Return up to `limit` drivers within `radius_km` of `center`.
    ///
    /// Implementations may return drivers in any order and in any
    /// availability state; filtering is the selector's job.
    fn find_nearby_drivers(
        &self,
        center: GeoPoint,
        radius_km: f64,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<CandidateDriver>, UpstreamError>>;
}

/// How the traveller moves between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TravelMode {
    Driving,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Road-network travel time estimates.
pub trait RouteEstimator: Send + Sync {
    fn calculate_eta(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
    ) -> BoxFuture<'_, Result<Duration, UpstreamError>>;
}
