//! Domain types for the matching engine.
//!
//! This module contains the validated value types that flow through
//! matching: identifiers, coordinates, vehicle classes, candidate drivers
//! and rider requests. Types that come from outside the process expose a
//! `validate` or `parse` step so downstream code can trust them.

mod driver;
mod error;
mod geo;
mod ids;
mod request;
mod vehicle;

pub use driver::{Availability, CandidateDriver, DEFAULT_SEATS, UnknownAvailability};
pub use error::RequestError;
pub use geo::{EARTH_RADIUS_KM, GeoPoint, InvalidCoordinates, haversine_km};
pub use ids::{DriverId, InvalidId, RiderId, TripId, VehicleId};
pub use request::{MatchingRequest, RiderPreferences};
pub use vehicle::{InvalidVehicleType, VehicleType};
