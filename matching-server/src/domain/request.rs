//! Matching requests submitted by riders.

use std::time::Duration;

use super::error::RequestError;
use super::geo::GeoPoint;
use super::ids::{RiderId, TripId};
use super::vehicle::VehicleType;

/// Optional rider preferences that narrow the candidate pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiderPreferences {
    /// Drivers rated below this are never offered.
    pub min_driver_rating: Option<f64>,
    /// Rider needs a wheelchair-accessible vehicle.
    pub accessibility_needs: bool,
    /// Rider accepts a shared ride. Passed through to fare estimation.
    pub allow_shared_ride: bool,
}

/// A request to find a driver for one trip.
///
/// Requests are immutable once submitted: the engine only ever borrows them.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingRequest {
    pub trip_id: TripId,
    pub rider_id: RiderId,
    pub pickup: GeoPoint,
    pub destination: GeoPoint,
    /// Requested vehicle class; `None` accepts any.
    pub vehicle_type: Option<VehicleType>,
    pub passenger_count: u8,
    /// 0 is standard, anything above is boosted.
    pub priority_level: u8,
    /// Upper bound on the whole search. Zero means no deadline.
    pub max_wait: Duration,
    pub preferences: Option<RiderPreferences>,
}

impl MatchingRequest {
    /// Create a standard-priority, single-passenger request for any vehicle type.
    pub fn new(trip_id: TripId, rider_id: RiderId, pickup: GeoPoint, destination: GeoPoint) -> Self {
        Self {
            trip_id,
            rider_id,
            pickup,
            destination,
            vehicle_type: None,
            passenger_count: 1,
            priority_level: 0,
            max_wait: Duration::ZERO,
            preferences: None,
        }
    }

    pub fn with_vehicle_type(mut self, vehicle_type: VehicleType) -> Self {
        self.vehicle_type = Some(vehicle_type);
        self
    }

    pub fn with_passenger_count(mut self, count: u8) -> Self {
        self.passenger_count = count;
        self
    }

    pub fn with_priority(mut self, level: u8) -> Self {
        self.priority_level = level;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_preferences(mut self, preferences: RiderPreferences) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn is_boosted(&self) -> bool {
        self.priority_level > 0
    }

    /// Minimum driver rating from preferences, if any.
    pub fn min_driver_rating(&self) -> Option<f64> {
        self.preferences.as_ref().and_then(|p| p.min_driver_rating)
    }

    pub fn needs_accessibility(&self) -> bool {
        self.preferences
            .as_ref()
            .is_some_and(|p| p.accessibility_needs)
    }

    pub fn allows_shared_ride(&self) -> bool {
        self.preferences.as_ref().is_some_and(|p| p.allow_shared_ride)
    }

    /// Validate the request before any candidate lookup.
    ///
    /// Coordinates are checked first so that malformed locations always
    /// surface as [`RequestError::InvalidCoordinates`].
    pub fn validate(&self) -> Result<(), RequestError> {
        self.pickup
            .validate()
            .map_err(|source| RequestError::InvalidCoordinates {
                field: "pickup",
                source,
            })?;
        self.destination
            .validate()
            .map_err(|source| RequestError::InvalidCoordinates {
                field: "destination",
                source,
            })?;

        if self.passenger_count == 0 {
            return Err(RequestError::Invalid(
                "passenger count must be at least 1".to_string(),
            ));
        }

        if let Some(min) = self.min_driver_rating()
            && !(0.0..=5.0).contains(&min)
        {
            return Err(RequestError::Invalid(format!(
                "minimum driver rating {min} is outside [0, 5]"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> MatchingRequest {
        MatchingRequest::new(
            TripId::new("trip-1").unwrap(),
            RiderId::new("rider-1").unwrap(),
            GeoPoint::new(40.7128, -74.0060),
            GeoPoint::new(40.7580, -73.9855),
        )
    }

    #[test]
    fn defaults() {
        let req = request();
        assert_eq!(req.passenger_count, 1);
        assert_eq!(req.priority_level, 0);
        assert!(!req.is_boosted());
        assert_eq!(req.max_wait, Duration::ZERO);
        assert!(req.vehicle_type.is_none());
        assert!(req.min_driver_rating().is_none());
        assert!(!req.needs_accessibility());
        assert!(!req.allows_shared_ride());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn invalid_pickup_latitude() {
        let mut req = request();
        req.pickup = GeoPoint::new(91.0, -74.0);
        match req.validate() {
            Err(RequestError::InvalidCoordinates { field, .. }) => assert_eq!(field, "pickup"),
            other => panic!("expected invalid coordinates, got {other:?}"),
        }
    }

    #[test]
    fn invalid_destination_longitude() {
        let mut req = request();
        req.destination = GeoPoint::new(0.0, -181.0);
        match req.validate() {
            Err(RequestError::InvalidCoordinates { field, .. }) => {
                assert_eq!(field, "destination")
            }
            other => panic!("expected invalid coordinates, got {other:?}"),
        }
    }

    #[test]
    fn zero_passengers_rejected() {
        let req = request().with_passenger_count(0);
        assert!(matches!(req.validate(), Err(RequestError::Invalid(_))));
    }

    #[test]
    fn min_rating_out_of_range_rejected() {
        let req = request().with_preferences(RiderPreferences {
            min_driver_rating: Some(5.5),
            ..RiderPreferences::default()
        });
        assert!(matches!(req.validate(), Err(RequestError::Invalid(_))));

        let req = request().with_preferences(RiderPreferences {
            min_driver_rating: Some(f64::NAN),
            ..RiderPreferences::default()
        });
        assert!(req.validate().is_err());
    }

    #[test]
    fn preference_accessors() {
        let req = request().with_priority(2).with_preferences(RiderPreferences {
            min_driver_rating: Some(4.5),
            accessibility_needs: true,
            allow_shared_ride: true,
        });
        assert!(req.is_boosted());
        assert_eq!(req.min_driver_rating(), Some(4.5));
        assert!(req.needs_accessibility());
        assert!(req.allows_shared_ride());
        assert!(req.validate().is_ok());
    }
}
