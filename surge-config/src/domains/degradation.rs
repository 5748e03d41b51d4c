//! Degradation tracking configuration (endurance runs)

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-minute drift tracking for multi-hour runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationConfig {
    /// Width of one bucket
    #[serde(with = "humantime_serde")]
    pub bucket_width: Duration,

    /// Each worker samples `/system/health` once every this many iterations
    pub health_sample_every: u64,

    /// Mean latency growth (ms per bucket) above which drift is reported
    pub max_latency_slope_ms: f64,

    /// Memory utilisation growth (percentage points per bucket)
    pub max_memory_slope_pct: f64,

    /// CPU utilisation growth (percentage points per bucket)
    pub max_cpu_slope_pct: f64,

    /// Error-rate growth (fraction per bucket)
    pub max_error_rate_slope: f64,

    /// Buckets needed before a trend is judged at all
    pub min_buckets_for_trend: usize,
}

impl Default for DegradationConfig {
    fn default() -> Self {
        Self {
            bucket_width: Duration::from_secs(60),
            health_sample_every: 100,
            max_latency_slope_ms: 0.5,
            max_memory_slope_pct: 0.05,
            max_cpu_slope_pct: 0.1,
            max_error_rate_slope: 0.0005,
            min_buckets_for_trend: 10,
        }
    }
}

impl Validatable for DegradationConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.bucket_width.as_millis(), "bucket_width", self.domain_name())?;
        validate_positive(self.health_sample_every, "health_sample_every", self.domain_name())?;
        validate_positive(self.min_buckets_for_trend, "min_buckets_for_trend", self.domain_name())?;
        for (name, v) in [
            ("max_latency_slope_ms", self.max_latency_slope_ms),
            ("max_memory_slope_pct", self.max_memory_slope_pct),
            ("max_cpu_slope_pct", self.max_cpu_slope_pct),
            ("max_error_rate_slope", self.max_error_rate_slope),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(self.validation_error(format!("{} must be a finite value >= 0", name)));
            }
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "profile.degradation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let config = DegradationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bucket_width, Duration::from_secs(60));
    }

    #[test]
    fn test_zero_sampling_interval_rejected() {
        let config = DegradationConfig {
            health_sample_every: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
