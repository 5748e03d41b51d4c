//! Run selection, reference data source and report output

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which profile a `surge run` executes when none is given on the command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub profile: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            profile: "smoke".to_string(),
        }
    }
}

impl Validatable for RunConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.profile, "profile", self.domain_name())
    }

    fn domain_name(&self) -> &'static str {
        "run"
    }
}

/// Where the test entity corpus comes from. Without a path the built-in corpus is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceDataConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Validatable for ReferenceDataConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(ref path) = self.path {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !matches!(ext, "json" | "yaml" | "yml") {
                return Err(self.validation_error(format!(
                    "reference data file must be .json, .yaml or .yml, got {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "reference_data"
    }
}

/// Run report output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// JSON report destination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Print the colored summary to stdout
    pub console: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: None,
            console: true,
        }
    }
}

impl Validatable for ReportConfig {
    fn validate(&self) -> ConfigResult<()> {
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "report"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_data_extension() {
        let mut config = ReferenceDataConfig::default();
        assert!(config.validate().is_ok());

        config.path = Some(PathBuf::from("corpus.yaml"));
        assert!(config.validate().is_ok());

        config.path = Some(PathBuf::from("corpus.csv"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_run_profile_required() {
        let config = RunConfig {
            profile: "  ".to_string(),
        };
        assert!(config.validate().is_err());
    }
}
