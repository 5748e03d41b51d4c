//! Domain-specific configuration modules

pub mod degradation;
pub mod http;
pub mod load;
pub mod logging;
pub mod operation;
pub mod profiles;
pub mod run;
pub mod scenarios;
pub mod target;
pub mod thresholds;
pub mod utils;

use crate::error::{ConfigError, ConfigResult};
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main surge configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurgeConfig {
    /// Target environments and authentication
    pub target: target::TargetConfig,

    /// HTTP client configuration
    pub http: http::HttpConfig,

    /// Logging configuration
    pub logging: logging::LoggingConfig,

    /// Default profile selection
    pub run: run::RunConfig,

    /// Named run profiles. Built-in profiles are available even when not listed.
    pub profiles: BTreeMap<String, profiles::ProfileConfig>,

    /// Test entity corpus source
    pub reference_data: run::ReferenceDataConfig,

    /// Report output
    pub report: run::ReportConfig,
}

impl Default for SurgeConfig {
    fn default() -> Self {
        Self {
            target: target::TargetConfig::default(),
            http: http::HttpConfig::default(),
            logging: logging::LoggingConfig::default(),
            run: run::RunConfig::default(),
            profiles: profiles::builtin_profiles(),
            reference_data: run::ReferenceDataConfig::default(),
            report: run::ReportConfig::default(),
        }
    }
}

impl SurgeConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.target.validate()?;
        self.http.validate()?;
        self.logging.validate()?;
        self.run.validate()?;
        self.reference_data.validate()?;
        self.report.validate()?;

        for (name, profile) in &self.profiles {
            profile.validate().map_err(|e| ConfigError::DomainError {
                domain: format!("profiles.{}", name),
                message: e.to_string(),
            })?;
        }

        // Resolves the default profile name
        self.active_profile()?;

        Ok(())
    }

    /// Add every built-in profile the file did not define itself
    pub fn merge_builtin_profiles(&mut self) {
        for (name, profile) in profiles::builtin_profiles() {
            self.profiles.entry(name).or_insert(profile);
        }
    }

    /// Profile named by `run.profile`
    pub fn active_profile(&self) -> ConfigResult<&profiles::ProfileConfig> {
        self.profile(&self.run.profile)
    }

    pub fn profile(&self, name: &str) -> ConfigResult<&profiles::ProfileConfig> {
        self.profiles.get(name).ok_or_else(|| ConfigError::UnknownName {
            kind: "profile",
            name: name.to_string(),
            available: self.profiles.keys().cloned().collect::<Vec<_>>().join(", "),
        })
    }

    /// Copy safe to print, with credentials masked
    pub fn redacted(&self) -> Self {
        Self {
            target: self.target.redacted(),
            ..self.clone()
        }
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = SurgeConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
