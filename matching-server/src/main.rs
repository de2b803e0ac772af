use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use matching_server::cache::CachedLocator;
use matching_server::config::ServerConfig;
use matching_server::geo::{CandidateLocator, HttpGeoClient, MockFleetLocator};
use matching_server::matching::MatchingEngine;
use matching_server::pricing::HttpPricingClient;
use matching_server::web::{AppState, create_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env().expect("Invalid MATCHING_* configuration");

    // Candidate source: a fleet file for local development, otherwise the
    // geospatial service
    let geo = HttpGeoClient::new(config.geo.clone()).expect("Failed to create geo client");
    let source: Arc<dyn CandidateLocator> = match &config.mock_fleet {
        Some(path) => {
            let fleet = MockFleetLocator::from_file(path).expect("Failed to load mock fleet");
            info!(path = %path.display(), drivers = fleet.len().await, "serving mock fleet");
            Arc::new(fleet)
        }
        None => {
            info!(base_url = %config.geo.base_url, "using geospatial service");
            Arc::new(geo.clone())
        }
    };
    let locator = Arc::new(CachedLocator::new(source, &config.cache));

    let mut engine = MatchingEngine::new(config.matching.clone(), locator)
        .expect("Invalid matching configuration");
    if config.mock_fleet.is_none() {
        engine = engine.with_route_estimator(Arc::new(geo));
    }
    match &config.pricing {
        Some(pricing) => {
            let client = HttpPricingClient::new(pricing.clone()).expect("Failed to create pricing client");
            engine = engine.with_fare_estimator(Arc::new(client));
        }
        None => warn!("MATCHING_PRICING_URL not set, outcomes will carry no fare"),
    }
    let engine = Arc::new(engine);

    // Spawn background task to drop finished sessions
    engine.spawn_janitor(config.janitor_interval);

    let app = create_router(AppState::new(engine));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listener");
    info!(addr = %config.bind_addr, "matching server listening");
    info!("  POST   /matching           - Find a driver");
    info!("  GET    /matching/:trip_id  - Session status");
    info!("  DELETE /matching/:trip_id  - Cancel matching");
    info!("  GET    /matching/metrics   - Engine metrics");
    info!("  GET    /health             - Health check");

    axum::serve(listener, app).await.expect("Server error");
}
