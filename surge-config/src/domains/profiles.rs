//! Named run profiles: load shape, thresholds and scenario mix together

use crate::domains::degradation::DegradationConfig;
use crate::domains::load::{LoadProfile, Stage};
use crate::domains::scenarios::ScenarioMix;
use crate::domains::thresholds::ThresholdTable;
use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// A complete, self-contained run definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub description: String,

    pub load: LoadProfile,

    #[serde(default)]
    pub thresholds: ThresholdTable,

    #[serde(default)]
    pub scenarios: ScenarioMix,

    /// Present only for profiles that track drift (endurance)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degradation: Option<DegradationConfig>,
}

impl Validatable for ProfileConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.load.validate()?;
        self.thresholds.validate()?;
        self.scenarios.validate()?;
        if let Some(ref degradation) = self.degradation {
            degradation.validate()?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "profile"
    }
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn mins(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

/// Profiles shipped with the harness. Files may override any of them by name.
pub fn builtin_profiles() -> BTreeMap<String, ProfileConfig> {
    let mut profiles = BTreeMap::new();

    profiles.insert(
        "smoke".to_string(),
        ProfileConfig {
            description: "One iteration per second for a minute; wiring check".to_string(),
            load: LoadProfile::constant(1.0, mins(1), 2, 10),
            thresholds: ThresholdTable::standard(),
            scenarios: ScenarioMix::default(),
            degradation: None,
        },
    );

    profiles.insert(
        "steady".to_string(),
        ProfileConfig {
            description: "Constant business-day load".to_string(),
            load: LoadProfile::constant(100.0, mins(10), 50, 400),
            thresholds: ThresholdTable::standard(),
            scenarios: ScenarioMix::default(),
            degradation: None,
        },
    );

    profiles.insert(
        "ramping".to_string(),
        ProfileConfig {
            description: "Ramp to market-open volume, hold, ramp to peak, hold, drain".to_string(),
            load: LoadProfile::ramping(
                0.0,
                vec![
                    Stage::new(mins(2), 100.0),
                    Stage::new(mins(5), 100.0),
                    Stage::new(mins(2), 500.0),
                    Stage::new(mins(5), 500.0),
                    Stage::new(mins(2), 0.0),
                ],
                100,
                1500,
            ),
            thresholds: ThresholdTable::standard(),
            scenarios: ScenarioMix::default(),
            degradation: None,
        },
    );

    let mut endurance_load = LoadProfile::constant(50.0, Duration::from_secs(8 * 3600), 50, 400);
    endurance_load.graceful_stop = Some(secs(60));
    profiles.insert(
        "endurance".to_string(),
        ProfileConfig {
            description: "Eight hours of sustained load with per-minute drift tracking".to_string(),
            load: endurance_load,
            thresholds: ThresholdTable::standard(),
            scenarios: ScenarioMix::default(),
            degradation: Some(DegradationConfig::default()),
        },
    );

    profiles.insert(
        "spike".to_string(),
        ProfileConfig {
            description: "Sudden burst to twenty times baseline and back".to_string(),
            load: LoadProfile::ramping(
                100.0,
                vec![
                    Stage::new(mins(1), 100.0),
                    Stage::new(secs(10), 2000.0),
                    Stage::new(mins(2), 2000.0),
                    Stage::new(secs(10), 100.0),
                    Stage::new(mins(2), 100.0),
                ],
                200,
                4000,
            ),
            thresholds: ThresholdTable::stress(),
            scenarios: ScenarioMix::aggressive(),
            degradation: None,
        },
    );

    profiles.insert(
        "stress".to_string(),
        ProfileConfig {
            description: "Step beyond expected peak to find the breaking point".to_string(),
            load: LoadProfile::ramping(
                0.0,
                vec![
                    Stage::new(mins(2), 500.0),
                    Stage::new(mins(5), 1000.0),
                    Stage::new(mins(5), 2000.0),
                    Stage::new(mins(5), 3000.0),
                    Stage::new(mins(3), 0.0),
                ],
                500,
                6000,
            ),
            thresholds: ThresholdTable::stress(),
            scenarios: ScenarioMix::aggressive(),
            degradation: None,
        },
    );

    profiles
}
