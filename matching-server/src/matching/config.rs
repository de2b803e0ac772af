//! Matching engine configuration.

use std::time::Duration;

/// Tolerance when checking that scoring weights sum to one.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid matching config: {field} {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: String,
}

impl ConfigError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Relative weights of the three score components. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub distance: f64,
    pub rating: f64,
    pub availability: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            distance: 0.4,
            rating: 0.3,
            availability: 0.3,
        }
    }
}

/// Delay between consecutive attempts for the same trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryPolicy {
    /// Same delay after every attempt.
    Fixed(Duration),
    /// `initial * multiplier^(attempt - 1)`, capped at `max`.
    Exponential {
        initial: Duration,
        multiplier: f64,
        max: Duration,
    },
}

impl RetryPolicy {
    /// Cooldown after `attempt` (1-based) attempts have completed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match *self {
            RetryPolicy::Fixed(delay) => delay,
            RetryPolicy::Exponential {
                initial,
                multiplier,
                max,
            } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let secs = initial.as_secs_f64() * multiplier.powi(exponent);
                let capped = secs.min(max.as_secs_f64());
                Duration::try_from_secs_f64(capped).unwrap_or(max)
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::Fixed(Duration::from_secs(5))
    }
}

/// Configuration parameters for matching.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// Score component weights.
    pub weights: ScoringWeights,

    /// Search radius for candidate lookup (km).
    /// Also the distance at which the distance score reaches zero.
    pub max_search_radius_km: f64,

    /// Candidates within this distance (km) of a boosted request get
    /// the premium multiplier.
    pub priority_boost_radius_km: f64,

    /// Score multiplier for boosted requests.
    pub premium_priority_boost: f64,

    /// Attempts before a session fails.
    pub max_attempts: u32,

    /// Cooldown between attempts.
    pub retry: RetryPolicy,

    /// Maximum drivers requested from the locator per attempt.
    pub candidate_limit: usize,

    /// Average speed for the haversine ETA fallback (km/h).
    pub fallback_speed_kmh: f64,

    /// How long terminal sessions are kept before eviction.
    pub session_retention: Duration,
}

impl MatchingConfig {
    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_search_radius_km(mut self, km: f64) -> Self {
        self.max_search_radius_km = km;
        self
    }

    pub fn with_candidate_limit(mut self, n: usize) -> Self {
        self.candidate_limit = n;
        self
    }

    pub fn with_session_retention(mut self, retention: Duration) -> Self {
        self.session_retention = retention;
        self
    }

    /// Check every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        for (field, value) in [
            ("weights.distance", w.distance),
            ("weights.rating", w.rating),
            ("weights.availability", w.availability),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::new(field, "must be a non-negative number"));
            }
        }
        let sum = w.distance + w.rating + w.availability;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::new(
                "weights",
                format!("must sum to 1.0, got {sum}"),
            ));
        }

        for (field, value) in [
            ("max_search_radius_km", self.max_search_radius_km),
            ("priority_boost_radius_km", self.priority_boost_radius_km),
            ("fallback_speed_kmh", self.fallback_speed_kmh),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::new(field, "must be a positive number"));
            }
        }

        if !self.premium_priority_boost.is_finite() || self.premium_priority_boost < 1.0 {
            return Err(ConfigError::new("premium_priority_boost", "must be at least 1.0"));
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::new("max_attempts", "must be at least 1"));
        }

        if self.candidate_limit == 0 {
            return Err(ConfigError::new("candidate_limit", "must be at least 1"));
        }

        if let RetryPolicy::Exponential {
            initial,
            multiplier,
            max,
        } = self.retry
        {
            if !multiplier.is_finite() || multiplier < 1.0 {
                return Err(ConfigError::new("retry.multiplier", "must be at least 1.0"));
            }
            if max < initial {
                return Err(ConfigError::new("retry.max", "must not be below retry.initial"));
            }
        }

        Ok(())
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            max_search_radius_km: 10.0,
            priority_boost_radius_km: 3.0,
            premium_priority_boost: 1.5,
            max_attempts: 3,
            retry: RetryPolicy::default(),
            candidate_limit: 50,
            fallback_speed_kmh: 30.0,
            session_retention: Duration::from_secs(10 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = MatchingConfig::default();

        assert_eq!(config.weights, ScoringWeights::default());
        assert_eq!(config.max_search_radius_km, 10.0);
        assert_eq!(config.priority_boost_radius_km, 3.0);
        assert_eq!(config.premium_priority_boost, 1.5);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry, RetryPolicy::Fixed(Duration::from_secs(5)));
        assert_eq!(config.candidate_limit, 50);
        assert_eq!(config.fallback_speed_kmh, 30.0);
        assert_eq!(config.session_retention, Duration::from_secs(600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn weights_must_sum_to_one() {
        let config = MatchingConfig::default().with_weights(ScoringWeights {
            distance: 0.5,
            rating: 0.5,
            availability: 0.5,
        });
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "weights");
    }

    #[test]
    fn negative_weight_rejected() {
        let config = MatchingConfig::default().with_weights(ScoringWeights {
            distance: 1.2,
            rating: -0.2,
            availability: 0.0,
        });
        assert_eq!(config.validate().unwrap_err().field, "weights.rating");
    }

    #[test]
    fn zero_attempts_rejected() {
        let config = MatchingConfig::default().with_max_attempts(0);
        assert_eq!(config.validate().unwrap_err().field, "max_attempts");
    }

    #[test]
    fn non_positive_radius_rejected() {
        let config = MatchingConfig::default().with_search_radius_km(0.0);
        assert_eq!(config.validate().unwrap_err().field, "max_search_radius_km");
    }

    #[test]
    fn boost_below_one_rejected() {
        let config = MatchingConfig {
            premium_priority_boost: 0.9,
            ..MatchingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn fixed_retry_delay() {
        let policy = RetryPolicy::Fixed(Duration::from_millis(250));
        assert_eq!(policy.delay_after(1), Duration::from_millis(250));
        assert_eq!(policy.delay_after(7), Duration::from_millis(250));
    }

    #[test]
    fn exponential_retry_delay() {
        let policy = RetryPolicy::Exponential {
            initial: Duration::from_secs(1),
            multiplier: 2.0,
            max: Duration::from_secs(5),
        };
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(4), Duration::from_secs(5));
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn exponential_policy_validated() {
        let config = MatchingConfig::default().with_retry(RetryPolicy::Exponential {
            initial: Duration::from_secs(2),
            multiplier: 0.5,
            max: Duration::from_secs(10),
        });
        assert_eq!(config.validate().unwrap_err().field, "retry.multiplier");

        let config = MatchingConfig::default().with_retry(RetryPolicy::Exponential {
            initial: Duration::from_secs(20),
            multiplier: 2.0,
            max: Duration::from_secs(10),
        });
        assert_eq!(config.validate().unwrap_err().field, "retry.max");
    }
}
