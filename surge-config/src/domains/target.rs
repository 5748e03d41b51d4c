//! Target environment configuration and resolution

use crate::error::{ConfigError, ConfigResult};
use crate::validation::{validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Which deployment of the business system a run is aimed at
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Name of the selected environment
    pub environment: String,

    /// Known environments keyed by name
    pub environments: BTreeMap<String, EnvironmentProfile>,

    /// Authentication endpoints and token lifetime
    pub auth: AuthConfig,
}

/// Base URL and credentials of one environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentProfile {
    pub base_url: String,

    #[serde(default)]
    pub credentials: Credentials,
}

/// Credential pair exchanged for a bearer token
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

/// Stands in for secrets in printed configuration
pub const REDACTED: &str = "<redacted>";

impl Credentials {
    /// Copy with the password masked, for display
    pub fn redacted(&self) -> Self {
        Self {
            username: self.username.clone(),
            password: if self.password.is_empty() {
                String::new()
            } else {
                REDACTED.to_string()
            },
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

/// Authentication endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub login_path: String,

    /// Tried when `login_path` answers 404; some deployments only expose the token endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_path: Option<String>,

    pub logout_path: String,

    /// Re-authenticate once the token is older than this
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,
}

/// Environment after name lookup, ready for the session authenticator
#[derive(Debug, Clone)]
pub struct ResolvedEnvironment {
    pub name: String,
    pub base_url: Url,
    pub credentials: Credentials,
    pub auth: AuthConfig,
}

impl Default for TargetConfig {
    fn default() -> Self {
        let mut environments = BTreeMap::new();
        environments.insert(
            "local".to_string(),
            EnvironmentProfile {
                base_url: "http://localhost:8080".to_string(),
                credentials: Credentials {
                    username: "loadtest".to_string(),
                    password: "loadtest".to_string(),
                },
            },
        );
        for (name, url) in [
            ("dev", "https://dev-api.backoffice.internal"),
            ("staging", "https://staging-api.backoffice.internal"),
            ("perf", "https://perf-api.backoffice.internal"),
            ("uat", "https://uat-api.backoffice.internal"),
        ] {
            environments.insert(
                name.to_string(),
                EnvironmentProfile {
                    base_url: url.to_string(),
                    credentials: Credentials::default(),
                },
            );
        }

        Self {
            environment: "local".to_string(),
            environments,
            auth: AuthConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: "/api/v1/auth/login".to_string(),
            token_path: Some("/api/v1/auth/token".to_string()),
            logout_path: "/api/v1/auth/logout".to_string(),
            token_ttl: Duration::from_secs(50 * 60),
        }
    }
}

impl TargetConfig {
    /// Copy safe to print: every environment's password masked
    pub fn redacted(&self) -> Self {
        let mut target = self.clone();
        for profile in target.environments.values_mut() {
            profile.credentials = profile.credentials.redacted();
        }
        target
    }

    /// Look up the selected environment and check it is usable for a run.
    pub fn resolve(&self) -> ConfigResult<ResolvedEnvironment> {
        let profile = self.environments.get(&self.environment).ok_or_else(|| {
            ConfigError::UnknownName {
                kind: "environment",
                name: self.environment.clone(),
                available: self
                    .environments
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            }
        })?;

        let domain = "target.environment";
        validate_required_string(&profile.credentials.username, "credentials.username", domain)?;
        validate_required_string(&profile.credentials.password, "credentials.password", domain)?;

        Ok(ResolvedEnvironment {
            name: self.environment.clone(),
            base_url: Url::parse(&profile.base_url)?,
            credentials: profile.credentials.clone(),
            auth: self.auth.clone(),
        })
    }

    /// Mutable access to the selected environment, created empty if missing.
    pub fn selected_mut(&mut self) -> &mut EnvironmentProfile {
        self.environments
            .entry(self.environment.clone())
            .or_insert_with(|| EnvironmentProfile {
                base_url: String::new(),
                credentials: Credentials::default(),
            })
    }
}

impl Validatable for TargetConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.environment, "environment", self.domain_name())?;

        if self.environments.is_empty() {
            return Err(self.validation_error("At least one environment must be configured"));
        }

        for (name, profile) in &self.environments {
            validate_url(&profile.base_url, &format!("environments.{}.base_url", name), self.domain_name())?;
        }

        self.auth.validate()
    }

    fn domain_name(&self) -> &'static str {
        "target"
    }
}

impl Validatable for AuthConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.login_path, "login_path", self.domain_name())?;
        validate_required_string(&self.logout_path, "logout_path", self.domain_name())?;
        if !self.login_path.starts_with('/') || !self.logout_path.starts_with('/') {
            return Err(self.validation_error("auth paths must start with '/'"));
        }
        if self.token_ttl.is_zero() {
            return Err(self.validation_error("token_ttl must be greater than 0"));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "target.auth"
    }
}
