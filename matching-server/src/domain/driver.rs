//! Candidate drivers as reported by the geospatial service.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::geo::GeoPoint;
use super::ids::{DriverId, VehicleId};
use super::vehicle::VehicleType;

/// Default passenger capacity when the locator does not report one.
pub const DEFAULT_SEATS: u8 = 4;

/// Driver availability at the time of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Availability {
    Online,
    Busy,
    Offline,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Online => "online",
            Availability::Busy => "busy",
            Availability::Offline => "offline",
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Availability::Online)
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown availability status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown availability status: {0}")]
pub struct UnknownAvailability(pub String);

impl FromStr for Availability {
    type Err = UnknownAvailability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" | "available" => Ok(Availability::Online),
            "busy" | "on_trip" => Ok(Availability::Busy),
            "offline" => Ok(Availability::Offline),
            _ => Err(UnknownAvailability(s.to_string())),
        }
    }
}

/// A driver considered for a matching attempt.
///
/// This is a read-only snapshot owned by the locator; the engine never
/// mutates driver state.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateDriver {
    pub driver_id: DriverId,
    pub vehicle_id: VehicleId,
    pub location: GeoPoint,
    pub vehicle_type: VehicleType,
    /// Rating in [0.0, 5.0].
    pub rating: f64,
    pub availability: Availability,
    pub last_update: DateTime<Utc>,
    /// Passenger seats available in the vehicle.
    pub seats: u8,
    /// Wheelchair-accessible vehicle.
    pub accessible: bool,
}

impl CandidateDriver {
    /// Create an online candidate with default seats and no accessibility.
    pub fn new(
        driver_id: DriverId,
        vehicle_id: VehicleId,
        location: GeoPoint,
        vehicle_type: VehicleType,
        rating: f64,
        last_update: DateTime<Utc>,
    ) -> Self {
        Self {
            driver_id,
            vehicle_id,
            location,
            vehicle_type,
            rating,
            availability: Availability::Online,
            last_update,
            seats: DEFAULT_SEATS,
            accessible: false,
        }
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn with_seats(mut self, seats: u8) -> Self {
        self.seats = seats;
        self
    }

    pub fn with_accessible(mut self, accessible: bool) -> Self {
        self.accessible = accessible;
        self
    }

    pub fn is_online(&self) -> bool {
        self.availability.is_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_availability() {
        assert_eq!("online".parse::<Availability>(), Ok(Availability::Online));
        assert_eq!("ONLINE".parse::<Availability>(), Ok(Availability::Online));
        assert_eq!("available".parse::<Availability>(), Ok(Availability::Online));
        assert_eq!("busy".parse::<Availability>(), Ok(Availability::Busy));
        assert_eq!("on_trip".parse::<Availability>(), Ok(Availability::Busy));
        assert_eq!(" offline ".parse::<Availability>(), Ok(Availability::Offline));
        assert!("asleep".parse::<Availability>().is_err());
    }

    #[test]
    fn availability_roundtrips_through_display() {
        for a in [Availability::Online, Availability::Busy, Availability::Offline] {
            assert_eq!(a.to_string().parse::<Availability>(), Ok(a));
        }
    }

    #[test]
    fn builder_defaults() {
        let driver = CandidateDriver::new(
            DriverId::new("d1").unwrap(),
            VehicleId::new("v1").unwrap(),
            GeoPoint::new(1.0, 2.0),
            VehicleType::parse("sedan").unwrap(),
            4.5,
            Utc::now(),
        );
        assert!(driver.is_online());
        assert_eq!(driver.seats, DEFAULT_SEATS);
        assert!(!driver.accessible);

        let driver = driver
            .with_availability(Availability::Busy)
            .with_seats(6)
            .with_accessible(true);
        assert!(!driver.is_online());
        assert_eq!(driver.seats, 6);
        assert!(driver.accessible);
    }
}
