//! Server configuration from `MATCHING_*` environment variables.
//!
//! | Variable                            | Default            |
//! |-------------------------------------|--------------------|
//! | `MATCHING_BIND_ADDR`                | `127.0.0.1:3000`   |
//! | `MATCHING_GEO_URL`                  | `http://localhost:8081` |
//! | `MATCHING_GEO_API_KEY`              | none               |
//! | `MATCHING_PRICING_URL`              | none (no fares)    |
//! | `MATCHING_PRICING_API_KEY`          | none               |
//! | `MATCHING_MOCK_FLEET`               | none (use geo service) |
//! | `MATCHING_MAX_ATTEMPTS`             | 3                  |
//! | `MATCHING_RETRY_DELAY_SECS`         | 5                  |
//! | `MATCHING_SEARCH_RADIUS_KM`         | 10                 |
//! | `MATCHING_CANDIDATE_LIMIT`          | 50                 |
//! | `MATCHING_SESSION_RETENTION_SECS`   | 600                |
//! | `MATCHING_JANITOR_INTERVAL_SECS`    | 60                 |
//! | `MATCHING_CACHE_TTL_MS`             | 2000               |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::LocatorCacheConfig;
use crate::geo::GeoClientConfig;
use crate::matching::{MatchingConfig, RetryPolicy};
use crate::pricing::PricingClientConfig;

/// An environment variable that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value {value:?} for {var}: {reason}")]
pub struct EnvError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub geo: GeoClientConfig,
    /// Fares are only attached when this is set.
    pub pricing: Option<PricingClientConfig>,
    /// Serve candidates from this fleet file instead of the geo service.
    pub mock_fleet: Option<PathBuf>,
    pub matching: MatchingConfig,
    pub cache: LocatorCacheConfig,
    pub janitor_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            geo: GeoClientConfig::default(),
            pricing: None,
            mock_fleet: None,
            matching: MatchingConfig::default(),
            cache: LocatorCacheConfig::default(),
            janitor_interval: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, EnvError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from any variable source. Unset variables keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EnvError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let env = Env { lookup };

        if let Some(addr) = env.parse::<SocketAddr>("MATCHING_BIND_ADDR")? {
            config.bind_addr = addr;
        }

        if let Some(url) = env.get("MATCHING_GEO_URL") {
            config.geo = GeoClientConfig::new(url);
        }
        if let Some(key) = env.get("MATCHING_GEO_API_KEY") {
            config.geo = config.geo.with_api_key(key);
        }

        if let Some(url) = env.get("MATCHING_PRICING_URL") {
            let mut pricing = PricingClientConfig::new(url);
            if let Some(key) = env.get("MATCHING_PRICING_API_KEY") {
                pricing = pricing.with_api_key(key);
            }
            config.pricing = Some(pricing);
        }

        config.mock_fleet = env.get("MATCHING_MOCK_FLEET").map(PathBuf::from);

        if let Some(n) = env.parse::<u32>("MATCHING_MAX_ATTEMPTS")? {
            config.matching = config.matching.with_max_attempts(n);
        }
        if let Some(secs) = env.parse::<u64>("MATCHING_RETRY_DELAY_SECS")? {
            config.matching = config
                .matching
                .with_retry(RetryPolicy::Fixed(Duration::from_secs(secs)));
        }
        if let Some(km) = env.parse::<f64>("MATCHING_SEARCH_RADIUS_KM")? {
            config.matching = config.matching.with_search_radius_km(km);
        }
        if let Some(n) = env.parse::<usize>("MATCHING_CANDIDATE_LIMIT")? {
            config.matching = config.matching.with_candidate_limit(n);
        }
        if let Some(secs) = env.parse::<u64>("MATCHING_SESSION_RETENTION_SECS")? {
            config.matching = config
                .matching
                .with_session_retention(Duration::from_secs(secs));
        }

        if let Some(secs) = env.parse::<u64>("MATCHING_JANITOR_INTERVAL_SECS")? {
            if secs == 0 {
                return Err(EnvError {
                    var: "MATCHING_JANITOR_INTERVAL_SECS",
                    value: secs.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            config.janitor_interval = Duration::from_secs(secs);
        }
        if let Some(ms) = env.parse::<u64>("MATCHING_CACHE_TTL_MS")? {
            config.cache.ttl = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty, trimmed value of `var`.
    fn get(&self, var: &str) -> Option<String> {
        (self.lookup)(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, var: &'static str) -> Result<Option<T>, EnvError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(value) = self.get(var) else {
            return Ok(None);
        };
        value.parse::<T>().map(Some).map_err(|e| EnvError {
            var,
            reason: e.to_string(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, EnvError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 3000)));
        assert_eq!(config.geo.base_url, "http://localhost:8081");
        assert!(config.pricing.is_none());
        assert!(config.mock_fleet.is_none());
        assert_eq!(config.matching.max_attempts, 3);
        assert_eq!(config.janitor_interval, Duration::from_secs(60));
    }

    #[test]
    fn overrides_applied() {
        let config = config_from(&[
            ("MATCHING_BIND_ADDR", "0.0.0.0:8080"),
            ("MATCHING_GEO_URL", "http://geo.internal:9000"),
            ("MATCHING_GEO_API_KEY", "secret"),
            ("MATCHING_PRICING_URL", "http://pricing.internal"),
            ("MATCHING_MOCK_FLEET", "data/mock_fleet.json"),
            ("MATCHING_MAX_ATTEMPTS", "5"),
            ("MATCHING_RETRY_DELAY_SECS", "2"),
            ("MATCHING_SEARCH_RADIUS_KM", "7.5"),
            ("MATCHING_CANDIDATE_LIMIT", "20"),
            ("MATCHING_SESSION_RETENTION_SECS", "30"),
            ("MATCHING_CACHE_TTL_MS", "500"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.geo.base_url, "http://geo.internal:9000");
        assert_eq!(config.geo.api_key.as_deref(), Some("secret"));
        assert_eq!(
            config.pricing.map(|p| p.base_url).as_deref(),
            Some("http://pricing.internal")
        );
        assert_eq!(config.mock_fleet, Some(PathBuf::from("data/mock_fleet.json")));
        assert_eq!(config.matching.max_attempts, 5);
        assert_eq!(config.matching.retry, RetryPolicy::Fixed(Duration::from_secs(2)));
        assert_eq!(config.matching.max_search_radius_km, 7.5);
        assert_eq!(config.matching.candidate_limit, 20);
        assert_eq!(config.matching.session_retention, Duration::from_secs(30));
        assert_eq!(config.cache.ttl, Duration::from_millis(500));
    }

    #[test]
    fn blank_values_ignored() {
        let config = config_from(&[("MATCHING_MAX_ATTEMPTS", "  ")]).unwrap();
        assert_eq!(config.matching.max_attempts, 3);
    }

    #[test]
    fn unparsable_value_reported() {
        let err = config_from(&[("MATCHING_MAX_ATTEMPTS", "three")]).unwrap_err();
        assert_eq!(err.var, "MATCHING_MAX_ATTEMPTS");
        assert_eq!(err.value, "three");
    }

    #[test]
    fn zero_janitor_interval_rejected() {
        let err = config_from(&[("MATCHING_JANITOR_INTERVAL_SECS", "0")]).unwrap_err();
        assert_eq!(err.var, "MATCHING_JANITOR_INTERVAL_SECS");
    }
}
