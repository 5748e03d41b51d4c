//! Domain-driven configuration for surge
//!
//! Target environments, HTTP client settings, logging, and the named run
//! profiles (load shape, SLA thresholds, scenario mix, degradation limits),
//! with validation, defaults and `SURGE_*` environment overrides.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    degradation::DegradationConfig,
    http::HttpConfig,
    load::{ExecutorKind, LoadProfile, RateShape, Stage},
    logging::{LogFormat, LogLevel, LogTarget, LoggingConfig, Rotation},
    operation::Operation,
    profiles::{builtin_profiles, ProfileConfig},
    run::{ReferenceDataConfig, ReportConfig, RunConfig},
    scenarios::{
        BatchConfig, MixedConfig, QuantityRange, ScenarioKind, ScenarioMix, ScenarioWeight,
        ThinkTime,
    },
    target::{AuthConfig, Credentials, EnvironmentProfile, ResolvedEnvironment, TargetConfig, REDACTED},
    thresholds::{ThresholdDivergence, ThresholdSpec, ThresholdTable, DOCUMENTED_PERCENTILE},
    SurgeConfig,
};
