//! Caching layer for candidate lookups.
//!
//! Concurrent requests from the same neighbourhood ask the geospatial
//! service nearly identical questions. Pickup points are snapped to a grid
//! (0.001 degrees, roughly 100 m) and nearby-driver responses are cached
//! for a short TTL so bursts share one upstream call.
//!
//! On a miss the upstream is asked about the cell centre, with the radius
//! widened by half the cell diagonal, so the cached pool covers the radius
//! around any pickup in the cell. Responses may therefore include drivers
//! slightly beyond the requested radius; the selector filters by exact
//! distance.
//!
//! Driver positions move, so the TTL is kept to a couple of seconds.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use moka::future::Cache as MokaCache;
use tracing::trace;

use crate::domain::{CandidateDriver, EARTH_RADIUS_KM, GeoPoint};
use crate::geo::{CandidateLocator, UpstreamError};

/// Cache key: (lat bucket, lng bucket, radius in metres, limit).
type LookupKey = (i64, i64, u64, usize);

/// Cached nearby-driver response.
type LookupEntry = Arc<Vec<CandidateDriver>>;

/// Configuration for the lookup cache.
#[derive(Debug, Clone)]
pub struct LocatorCacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,

    /// Grid size in degrees.
    pub bucket_deg: f64,
}

impl Default for LocatorCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(2),
            max_capacity: 10_000,
            bucket_deg: 0.001,
        }
    }
}

/// Cache for nearby-driver responses.
pub struct LocatorCache {
    lookups: MokaCache<LookupKey, LookupEntry>,
    bucket_deg: f64,
}

impl LocatorCache {
    pub fn new(config: &LocatorCacheConfig) -> Self {
        let lookups = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self {
            lookups,
            bucket_deg: config.bucket_deg,
        }
    }

    /// Snap a query onto the cache grid.
    fn key(&self, center: GeoPoint, radius_km: f64, limit: usize) -> LookupKey {
        let lat = (center.lat / self.bucket_deg).round() as i64;
        let lng = (center.lng / self.bucket_deg).round() as i64;
        let radius_m = (radius_km * 1000.0).round() as u64;
        (lat, lng, radius_m, limit)
    }

    /// Centre of the grid cell a key was snapped to.
    fn cell_center(&self, key: &LookupKey) -> GeoPoint {
        GeoPoint::new(key.0 as f64 * self.bucket_deg, key.1 as f64 * self.bucket_deg)
    }

    /// Upper bound on the distance from a cell centre to any point in it.
    fn cell_padding_km(&self) -> f64 {
        let km_per_deg = EARTH_RADIUS_KM.to_radians();
        self.bucket_deg * km_per_deg * std::f64::consts::FRAC_1_SQRT_2
    }

    pub async fn get(&self, key: &LookupKey) -> Option<LookupEntry> {
        self.lookups.get(key).await
    }

    pub async fn insert(&self, key: LookupKey, entry: LookupEntry) {
        self.lookups.insert(key, entry).await;
    }

    pub fn invalidate_all(&self) {
        self.lookups.invalidate_all();
    }
}

/// Candidate locator with caching.
///
/// Errors are never cached.
pub struct CachedLocator {
    inner: Arc<dyn CandidateLocator>,
    cache: LocatorCache,
}

impl CachedLocator {
    pub fn new(inner: Arc<dyn CandidateLocator>, config: &LocatorCacheConfig) -> Self {
        Self {
            inner,
            cache: LocatorCache::new(config),
        }
    }

    /// Nearby drivers, using the cache if available.
    pub async fn nearby(
        &self,
        center: GeoPoint,
        radius_km: f64,
        limit: usize,
    ) -> Result<LookupEntry, UpstreamError> {
        let key = self.cache.key(center, radius_km, limit);

        if let Some(cached) = self.cache.get(&key).await {
            trace!(center = %center, "nearby drivers served from cache");
            return Ok(cached);
        }

        let drivers = self
            .inner
            .find_nearby_drivers(
                self.cache.cell_center(&key),
                radius_km + self.cache.cell_padding_km(),
                limit,
            )
            .await?;
        let entry = Arc::new(drivers);
        self.cache.insert(key, entry.clone()).await;

        Ok(entry)
    }

    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }
}

impl CandidateLocator for CachedLocator {
    fn find_nearby_drivers(
        &self,
        center: GeoPoint,
        radius_km: f64,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<CandidateDriver>, UpstreamError>> {
        Box::pin(async move {
            let entry = self.nearby(center, radius_km, limit).await?;
            Ok(entry.as_ref().clone())
        })
    }
}
