//! Conversion from geospatial service DTOs to domain types.

use tracing::warn;

use crate::domain::{
    Availability, CandidateDriver, DEFAULT_SEATS, DriverId, GeoPoint, InvalidCoordinates,
    InvalidId, InvalidVehicleType, UnknownAvailability, VehicleId, VehicleType,
};

use super::types::NearbyDriver;

/// Error during DTO to domain conversion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error(transparent)]
    InvalidId(#[from] InvalidId),

    #[error(transparent)]
    InvalidVehicleType(#[from] InvalidVehicleType),

    #[error("driver location: {0}")]
    InvalidLocation(#[from] InvalidCoordinates),

    #[error(transparent)]
    InvalidStatus(#[from] UnknownAvailability),

    #[error("rating {0} is outside [0, 5]")]
    InvalidRating(f64),
}

/// Convert a single nearby-driver entry.
pub fn convert_driver(dto: &NearbyDriver) -> Result<CandidateDriver, ConversionError> {
    let location = GeoPoint::new(dto.lat, dto.lng);
    location.validate()?;

    if !(0.0..=5.0).contains(&dto.rating) {
        return Err(ConversionError::InvalidRating(dto.rating));
    }

    let availability: Availability = dto.status.parse()?;

    Ok(CandidateDriver {
        driver_id: DriverId::new(dto.driver_id.as_str())?,
        vehicle_id: VehicleId::new(dto.vehicle_id.as_str())?,
        location,
        vehicle_type: VehicleType::parse_normalized(&dto.vehicle_type)?,
        rating: dto.rating,
        availability,
        last_update: dto.updated_at,
        seats: dto.seats.unwrap_or(DEFAULT_SEATS),
        accessible: dto.accessible.unwrap_or(false),
    })
}

/// Convert a batch of drivers, skipping malformed entries.
///
/// Malformed entries are logged and dropped.
pub fn convert_drivers(dtos: &[NearbyDriver]) -> Vec<CandidateDriver> {
    dtos.iter()
        .filter_map(|dto| match convert_driver(dto) {
            Ok(driver) => Some(driver),
            Err(e) => {
                warn!(driver_id = %dto.driver_id, error = %e, "skipping malformed driver");
                None
            }
        })
        .collect()
}
