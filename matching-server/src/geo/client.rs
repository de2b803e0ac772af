//! Geospatial service HTTP client.
//!
//! Provides async methods for querying nearby drivers and road ETAs.
//! Handles authentication, concurrency limiting, and conversion to domain
//! types.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::{CandidateDriver, GeoPoint};

use super::convert::convert_drivers;
use super::error::UpstreamError;
use super::types::{EtaResponse, NearbyDriversResponse};
use super::{CandidateLocator, RouteEstimator, TravelMode};

/// Default base URL for the geospatial service.
const DEFAULT_BASE_URL: &str = "http://localhost:8081";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 32;

/// Configuration for the geospatial client.
#[derive(Debug, Clone)]
pub struct GeoClientConfig {
    /// Base URL of the service
    pub base_url: String,
    /// Optional API key sent as `x-api-key`
    pub api_key: Option<String>,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl GeoClientConfig {
    /// Create a config pointing at the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 5,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for GeoClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Build a reqwest client with an optional `x-api-key` header.
pub(crate) fn build_http(
    api_key: Option<&str>,
    timeout_secs: u64,
) -> Result<reqwest::Client, UpstreamError> {
    let mut headers = HeaderMap::new();
    if let Some(key) = api_key {
        let value = HeaderValue::from_str(key).map_err(|_| UpstreamError::Api {
            status: 0,
            message: "Invalid API key format".to_string(),
        })?;
        headers.insert("x-api-key", value);
    }

    Ok(reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Map status codes to errors and decode a JSON body.
pub(crate) async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
    service: &'static str,
) -> Result<T, UpstreamError> {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(UpstreamError::Unauthorized);
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(UpstreamError::RateLimited(service));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(UpstreamError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    let body = response.text().await?;

    serde_json::from_str(&body).map_err(|e| UpstreamError::Json {
        message: e.to_string(),
        body: Some(body.chars().take(500).collect()),
    })
}

/// Geospatial service API client.
///
/// Uses a semaphore to limit concurrent requests so a burst of trip
/// requests cannot overwhelm the service.
#[derive(Debug, Clone)]
pub struct HttpGeoClient {
    http: reqwest::Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
}

impl HttpGeoClient {
    /// Create a new client with the given configuration.
    pub fn new(config: GeoClientConfig) -> Result<Self, UpstreamError> {
        let http = build_http(config.api_key.as_deref(), config.timeout_secs)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    /// Fetch drivers near a point.
    ///
    /// Malformed driver records are skipped rather than failing the lookup.
    pub async fn nearby_drivers(
        &self,
        center: GeoPoint,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<CandidateDriver>, UpstreamError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| UpstreamError::Unavailable("geo client semaphore closed".to_string()))?;

        let url = format!("{}/v1/drivers/nearby", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("lat", center.lat.to_string()),
                ("lng", center.lng.to_string()),
                ("radiusKm", radius_km.to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;

        let body: NearbyDriversResponse = decode_response(response, "geospatial service").await?;
        let drivers = convert_drivers(&body.drivers);

        debug!(
            %center,
            radius_km,
            returned = body.drivers.len(),
            usable = drivers.len(),
            "nearby drivers fetched"
        );

        Ok(drivers)
    }

    /// Fetch a road ETA between two points.
    pub async fn eta(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
    ) -> Result<Duration, UpstreamError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| UpstreamError::Unavailable("geo client semaphore closed".to_string()))?;

        let url = format!("{}/v1/eta", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("originLat", origin.lat.to_string()),
                ("originLng", origin.lng.to_string()),
                ("destLat", destination.lat.to_string()),
                ("destLng", destination.lng.to_string()),
                ("mode", mode.as_str().to_string()),
            ])
            .send()
            .await?;

        let body: EtaResponse = decode_response(response, "geospatial service").await?;

        Duration::try_from_secs_f64(body.eta_seconds).map_err(|_| UpstreamError::Json {
            message: format!("invalid etaSeconds: {}", body.eta_seconds),
            body: None,
        })
    }
}

impl CandidateLocator for HttpGeoClient {
    fn find_nearby_drivers(
        &self,
        center: GeoPoint,
        radius_km: f64,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<CandidateDriver>, UpstreamError>> {
        Box::pin(self.nearby_drivers(center, radius_km, limit))
    }
}

impl RouteEstimator for HttpGeoClient {
    fn calculate_eta(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
    ) -> BoxFuture<'_, Result<Duration, UpstreamError>> {
        Box::pin(self.eta(origin, destination, mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = GeoClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api_key, None);
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn builder_methods() {
        let config = GeoClientConfig::new("http://geo.internal/")
            .with_api_key("secret")
            .with_max_concurrent(4)
            .with_timeout(2);
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.timeout_secs, 2);
    }

    #[test]
    fn trailing_slash_trimmed() {
        let client = HttpGeoClient::new(GeoClientConfig::new("http://geo.internal/")).unwrap();
        assert_eq!(client.base_url, "http://geo.internal");
    }

    #[test]
    fn invalid_api_key_rejected() {
        let result = HttpGeoClient::new(GeoClientConfig::default().with_api_key("bad\nkey"));
        assert!(matches!(result, Err(UpstreamError::Api { status: 0, .. })));
    }

    #[tokio::test]
    async fn unreachable_service_is_http_error() {
        let client =
            HttpGeoClient::new(GeoClientConfig::new("http://127.0.0.1:9").with_timeout(1))
                .unwrap();
        let result = client
            .find_nearby_drivers(GeoPoint::new(40.0, -74.0), 5.0, 10)
            .await;
        assert!(matches!(result, Err(UpstreamError::Http(_))));
    }
}
