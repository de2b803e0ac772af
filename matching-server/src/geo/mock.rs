//! Mock locator for running without the geospatial service.
//!
//! Loads a fleet snapshot from a JSON file (same shape as the service's
//! nearby-drivers response) and answers radius queries with haversine
//! distance.

use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::domain::{CandidateDriver, GeoPoint};

use super::CandidateLocator;
use super::convert::convert_drivers;
use super::error::UpstreamError;
use super::types::NearbyDriversResponse;

/// Mock locator that serves a static fleet snapshot.
///
/// This is useful for development and testing without a running
/// geospatial service.
#[derive(Clone, Default)]
pub struct MockFleetLocator {
    drivers: Arc<RwLock<Vec<CandidateDriver>>>,
}

impl MockFleetLocator {
    /// Create a locator serving the given drivers.
    pub fn from_drivers(drivers: Vec<CandidateDriver>) -> Self {
        Self {
            drivers: Arc::new(RwLock::new(drivers)),
        }
    }

    /// Load a fleet snapshot from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, UpstreamError> {
        Ok(Self::from_drivers(load_fleet(path.as_ref())?))
    }

    /// Replace the fleet.
    pub async fn set_drivers(&self, drivers: Vec<CandidateDriver>) {
        *self.drivers.write().await = drivers;
    }

    /// Number of drivers in the fleet.
    pub async fn len(&self) -> usize {
        self.drivers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.drivers.read().await.is_empty()
    }

    /// Drivers within `radius_km` of `center`, nearest first, at most `limit`.
    pub async fn nearby(&self, center: GeoPoint, radius_km: f64, limit: usize) -> Vec<CandidateDriver> {
        let drivers = self.drivers.read().await;

        let mut nearby: Vec<(f64, &CandidateDriver)> = drivers
            .iter()
            .map(|d| (center.distance_km(&d.location), d))
            .filter(|(distance, _)| *distance <= radius_km)
            .collect();

        nearby.sort_by(|a, b| a.0.total_cmp(&b.0));

        nearby
            .into_iter()
            .take(limit)
            .map(|(_, d)| d.clone())
            .collect()
    }
}

fn load_fleet(path: &Path) -> Result<Vec<CandidateDriver>, UpstreamError> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        UpstreamError::Unavailable(format!("failed to read fleet file {:?}: {}", path, e))
    })?;

    let snapshot: NearbyDriversResponse =
        serde_json::from_str(&json).map_err(|e| UpstreamError::Json {
            message: format!("failed to parse {:?}: {}", path, e),
            body: None,
        })?;

    Ok(convert_drivers(&snapshot.drivers))
}

impl CandidateLocator for MockFleetLocator {
    fn find_nearby_drivers(
        &self,
        center: GeoPoint,
        radius_km: f64,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<CandidateDriver>, UpstreamError>> {
        Box::pin(async move { Ok(self.nearby(center, radius_km, limit).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DriverId, VehicleId, VehicleType};
    use chrono::Utc;

    fn driver(id: &str, lat: f64, lng: f64) -> CandidateDriver {
        CandidateDriver::new(
            DriverId::new(id).unwrap(),
            VehicleId::new(format!("v-{id}")).unwrap(),
            GeoPoint::new(lat, lng),
            VehicleType::parse("sedan").unwrap(),
            4.5,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn load_fleet_file() {
        let locator = MockFleetLocator::from_file("data/mock_fleet.json").unwrap();
        assert!(!locator.is_empty().await);
    }

    #[tokio::test]
    async fn missing_file_is_error() {
        assert!(MockFleetLocator::from_file("data/does_not_exist.json").is_err());
    }

    #[tokio::test]
    async fn radius_and_limit_applied_nearest_first() {
        let locator = MockFleetLocator::from_drivers(vec![
            driver("far", 41.0, -74.0),
            driver("mid", 40.02, -74.0),
            driver("near", 40.005, -74.0),
        ]);
        let center = GeoPoint::new(40.0, -74.0);

        let found = locator.find_nearby_drivers(center, 5.0, 10).await.unwrap();
        let ids: Vec<_> = found.iter().map(|d| d.driver_id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);

        let found = locator.find_nearby_drivers(center, 5.0, 1).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].driver_id.as_str(), "near");
    }

    #[tokio::test]
    async fn set_drivers_replaces_fleet() {
        let locator = MockFleetLocator::default();
        assert_eq!(locator.len().await, 0);
        locator.set_drivers(vec![driver("a", 0.0, 0.0)]).await;
        assert_eq!(locator.len().await, 1);
    }
}
