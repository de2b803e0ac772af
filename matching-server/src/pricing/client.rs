//! Pricing service HTTP client.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::geo::{UpstreamError, build_http, decode_response};

use super::{FareContext, FareEstimate, FareEstimator};

/// Default base URL for the pricing service.
const DEFAULT_BASE_URL: &str = "http://localhost:8082";

/// Configuration for the pricing client.
#[derive(Debug, Clone)]
pub struct PricingClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl PricingClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            max_concurrent: 16,
            timeout_secs: 2,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for PricingClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Request body for `POST /v1/fares/estimate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FareRequestBody<'a> {
    trip_id: &'a str,
    pickup_lat: f64,
    pickup_lng: f64,
    dest_lat: f64,
    dest_lng: f64,
    vehicle_type: &'a str,
    distance_km: f64,
    passenger_count: u8,
    shared_ride: bool,
}

impl<'a> FareRequestBody<'a> {
    fn from_context(context: &'a FareContext) -> Self {
        FareRequestBody {
            trip_id: context.trip_id.as_str(),
            pickup_lat: context.pickup.lat,
            pickup_lng: context.pickup.lng,
            dest_lat: context.destination.lat,
            dest_lng: context.destination.lng,
            vehicle_type: context.vehicle_type.as_str(),
            distance_km: context.trip_distance_km,
            passenger_count: context.passenger_count,
            shared_ride: context.shared_ride,
        }
    }
}

/// Response body for `POST /v1/fares/estimate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FareResponseBody {
    amount_minor: u64,
    currency: String,
}

/// Pricing service API client.
#[derive(Debug, Clone)]
pub struct HttpPricingClient {
    http: reqwest::Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
}

impl HttpPricingClient {
    pub fn new(config: PricingClientConfig) -> Result<Self, UpstreamError> {
        let http = build_http(config.api_key.as_deref(), config.timeout_secs)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    /// Request a fare estimate.
    pub async fn estimate(&self, context: &FareContext) -> Result<FareEstimate, UpstreamError> {
        let _permit = self.semaphore.acquire().await.map_err(|_| {
            UpstreamError::Unavailable("pricing client semaphore closed".to_string())
        })?;

        let body = FareRequestBody::from_context(context);

        let response = self
            .http
            .post(format!("{}/v1/fares/estimate", self.base_url))
            .json(&body)
            .send()
            .await?;

        let fare: FareResponseBody = decode_response(response, "pricing service").await?;

        Ok(FareEstimate {
            amount_minor: fare.amount_minor,
            currency: fare.currency,
        })
    }
}

impl FareEstimator for HttpPricingClient {
    fn estimate_fare(&self, context: FareContext) -> BoxFuture<'_, Result<FareEstimate, UpstreamError>> {
        Box::pin(async move { self.estimate(&context).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GeoPoint, TripId, VehicleType};

    #[test]
    fn default_config() {
        let config = PricingClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 2);
        assert_eq!(config.max_concurrent, 16);
    }

    #[test]
    fn request_body_shape() {
        let context = FareContext {
            trip_id: TripId::new("trip-9").unwrap(),
            pickup: GeoPoint::new(1.0, 2.0),
            destination: GeoPoint::new(3.0, 4.0),
            vehicle_type: VehicleType::parse("sedan").unwrap(),
            trip_distance_km: 12.5,
            passenger_count: 2,
            shared_ride: true,
        };
        let body = FareRequestBody::from_context(&context);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["tripId"], "trip-9");
        assert_eq!(json["vehicleType"], "sedan");
        assert_eq!(json["passengerCount"], 2);
        assert_eq!(json["sharedRide"], true);
    }

    #[test]
    fn parse_response() {
        let fare: FareResponseBody =
            serde_json::from_str(r#"{"amountMinor": 1850, "currency": "USD"}"#).unwrap();
        assert_eq!(fare.amount_minor, 1850);
        assert_eq!(fare.currency, "USD");
    }
}
