//! Configuration loading and environment variable handling

use crate::domains::utils::parse_duration;
use crate::domains::SurgeConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "SURGE".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML (or `.json`) file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<SurgeConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let mut config: SurgeConfig = if is_json {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        config.merge_builtin_profiles();

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<SurgeConfig> {
        let mut config = SurgeConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<SurgeConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut SurgeConfig) -> ConfigResult<()> {
        self.apply_target_overrides(config)?;
        self.apply_run_overrides(config)?;
        self.apply_http_overrides(&mut config.http)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Environment selection, then base URL and credentials of the selected one
    fn apply_target_overrides(&self, config: &mut SurgeConfig) -> ConfigResult<()> {
        if let Ok(environment) = self.get_env_var("ENVIRONMENT") {
            config.target.environment = environment;
        }

        if let Ok(base_url) = self.get_env_var("BASE_URL") {
            config.target.selected_mut().base_url = base_url;
        }

        if let Ok(username) = self.get_env_var("USERNAME") {
            config.target.selected_mut().credentials.username = username;
        }

        if let Ok(password) = self.get_env_var("PASSWORD") {
            config.target.selected_mut().credentials.password = password;
        }

        Ok(())
    }

    /// Profile selection and load shape overrides for that profile
    fn apply_run_overrides(&self, config: &mut SurgeConfig) -> ConfigResult<()> {
        if let Ok(profile) = self.get_env_var("PROFILE") {
            config.run.profile = profile;
        }

        if let Ok(path) = self.get_env_var("REFERENCE_DATA") {
            config.reference_data.path = Some(PathBuf::from(path));
        }

        if let Ok(path) = self.get_env_var("REPORT_PATH") {
            config.report.path = Some(PathBuf::from(path));
        }

        let rate = self.parse_env::<f64>("TARGET_RATE")?;
        let duration = match self.get_env_var("DURATION") {
            Ok(value) => Some(
                parse_duration(&value)
                    .map_err(|e| ConfigError::EnvError(format!("Invalid DURATION: {}", e)))?,
            ),
            Err(_) => None,
        };
        let preallocated = self.parse_env::<usize>("PREALLOCATED_WORKERS")?;
        let max = self.parse_env::<usize>("MAX_WORKERS")?;

        if rate.is_none() && duration.is_none() && preallocated.is_none() && max.is_none() {
            return Ok(());
        }

        let name = config.run.profile.clone();
        let available = config.profiles.keys().cloned().collect::<Vec<_>>().join(", ");
        let profile = config
            .profiles
            .get_mut(&name)
            .ok_or(ConfigError::UnknownName {
                kind: "profile",
                name,
                available,
            })?;

        if let Some(rate) = rate {
            profile.load.override_rate(rate);
        }
        if let Some(duration) = duration {
            profile.load.override_duration(duration);
        }
        if let Some(preallocated) = preallocated {
            profile.load.preallocated_workers = preallocated;
        }
        if let Some(max) = max {
            profile.load.max_workers = max;
        }

        Ok(())
    }

    /// Apply HTTP config overrides
    fn apply_http_overrides(
        &self,
        config: &mut crate::domains::http::HttpConfig,
    ) -> ConfigResult<()> {
        if let Ok(timeout) = self.get_env_var("HTTP_TIMEOUT") {
            config.timeout = parse_duration(&timeout)
                .map_err(|e| ConfigError::EnvError(format!("Invalid HTTP_TIMEOUT: {}", e)))?;
        }

        if let Ok(verify_ssl) = self.get_env_var("HTTP_VERIFY_SSL") {
            config.verify_ssl = verify_ssl
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid HTTP_VERIFY_SSL: {}", e)))?;
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    fn parse_env<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_env_var(name) {
            Ok(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e))),
            Err(_) => Ok(None),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
