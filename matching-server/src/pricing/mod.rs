//! Pricing service collaborator.
//!
//! Fare estimates are attached to successful outcomes when a
//! [`FareEstimator`] is configured. Pricing is strictly optional: a missing
//! or failing estimator yields `fare: None` and never blocks matching.

mod client;

use futures::future::BoxFuture;

use crate::domain::{GeoPoint, TripId, VehicleType};
use crate::geo::UpstreamError;

pub use client::{HttpPricingClient, PricingClientConfig};

/// Trip facts the pricing service needs to quote a fare.
#[derive(Debug, Clone, PartialEq)]
pub struct FareContext {
    pub trip_id: TripId,
    pub pickup: GeoPoint,
    pub destination: GeoPoint,
    /// Vehicle class of the matched driver.
    pub vehicle_type: VehicleType,
    /// Straight-line trip distance, pickup to destination.
    pub trip_distance_km: f64,
    pub passenger_count: u8,
    pub shared_ride: bool,
}

/// A quoted fare in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FareEstimate {
    pub amount_minor: u64,
    /// ISO 4217 code, e.g. "USD"
    pub currency: String,
}

/// Source of fare estimates.
pub trait FareEstimator: Send + Sync {
    fn estimate_fare(&self, context: FareContext) -> BoxFuture<'_, Result<FareEstimate, UpstreamError>>;
}
