//! Scenario mix, think times and workflow tuning

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_ratio, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The closed set of business workflows the harness can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    Locate,
    ShortSell,
    Position,
    Inventory,
    DataIngestion,
    Mixed,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 6] = [
        ScenarioKind::Locate,
        ScenarioKind::ShortSell,
        ScenarioKind::Position,
        ScenarioKind::Inventory,
        ScenarioKind::DataIngestion,
        ScenarioKind::Mixed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioKind::Locate => "locate",
            ScenarioKind::ShortSell => "short-sell",
            ScenarioKind::Position => "position",
            ScenarioKind::Inventory => "inventory",
            ScenarioKind::DataIngestion => "data-ingestion",
            ScenarioKind::Mixed => "mixed",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenarioKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s.to_lowercase().replace('_', "-"))
            .ok_or_else(|| format!("Invalid scenario: {}", s))
    }
}

/// Relative selection weight of one scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioWeight {
    pub name: ScenarioKind,
    pub weight: f64,
}

impl ScenarioWeight {
    pub fn new(name: ScenarioKind, weight: f64) -> Self {
        Self { name, weight }
    }
}

/// Uniformly distributed pause between dependent requests
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThinkTime {
    #[serde(with = "humantime_serde")]
    pub min: Duration,
    #[serde(with = "humantime_serde")]
    pub max: Duration,
}

impl ThinkTime {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Pick a pause given a uniform draw in `[0, 1)`.
    pub fn at(&self, draw: f64) -> Duration {
        let span = self.max.saturating_sub(self.min);
        self.min + span.mul_f64(draw.clamp(0.0, 1.0))
    }
}

/// Inclusive quantity range; sampled values are rounded down to `lot`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantityRange {
    pub min: u64,
    pub max: u64,
    pub lot: u64,
}

/// Market-data batching behaviour of the ingestion workflow
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Prices per batch
    pub market_data_batch_size: usize,
    /// Batch is judged successful at or above this success ratio
    pub min_success_rate: f64,
    /// Probability an ingestion iteration uses batched submission
    pub batched_probability: f64,
}

/// Per-component probabilities for the mixed workflow
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixedConfig {
    pub locate: f64,
    pub short_sell: f64,
    pub position: f64,
    pub inventory: f64,
    pub data_ingestion: f64,
}

/// Everything the workflows need beyond reference data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioMix {
    /// Dispatch table, evaluated in declaration order
    pub weights: Vec<ScenarioWeight>,

    pub think_time: ThinkTime,

    /// Wait before re-reading state that a write should have changed
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,

    /// Wait between submitting a locate and polling its status
    #[serde(with = "humantime_serde")]
    pub locate_poll_delay: Duration,

    /// Inventory calculation types queried by the inventory workflow
    pub inventory_types: Vec<String>,

    pub quantity: QuantityRange,

    pub batch: BatchConfig,

    pub mixed: MixedConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            market_data_batch_size: 10,
            min_success_rate: 0.95,
            batched_probability: 0.5,
        }
    }
}

impl Default for MixedConfig {
    fn default() -> Self {
        Self {
            locate: 0.5,
            short_sell: 0.7,
            position: 0.4,
            inventory: 0.3,
            data_ingestion: 0.2,
        }
    }
}

impl Default for ScenarioMix {
    fn default() -> Self {
        Self {
            weights: vec![
                ScenarioWeight::new(ScenarioKind::Locate, 0.25),
                ScenarioWeight::new(ScenarioKind::ShortSell, 0.30),
                ScenarioWeight::new(ScenarioKind::Position, 0.15),
                ScenarioWeight::new(ScenarioKind::Inventory, 0.15),
                ScenarioWeight::new(ScenarioKind::DataIngestion, 0.05),
                ScenarioWeight::new(ScenarioKind::Mixed, 0.10),
            ],
            think_time: ThinkTime::new(Duration::from_millis(500), Duration::from_millis(1500)),
            settle_delay: Duration::from_millis(100),
            locate_poll_delay: Duration::from_millis(200),
            inventory_types: vec![
                "for-loan".to_string(),
                "for-pledge".to_string(),
                "short-sell".to_string(),
                "locate-availability".to_string(),
            ],
            quantity: QuantityRange {
                min: 100,
                max: 10_000,
                lot: 100,
            },
            batch: BatchConfig::default(),
            mixed: MixedConfig::default(),
        }
    }
}

impl ScenarioMix {
    /// Same mix with shorter pauses, used by spike and stress profiles.
    pub fn aggressive() -> Self {
        Self {
            think_time: ThinkTime::new(Duration::from_millis(50), Duration::from_millis(250)),
            settle_delay: Duration::from_millis(50),
            locate_poll_delay: Duration::from_millis(100),
            ..Self::default()
        }
    }
}

impl Validatable for ScenarioMix {
    fn validate(&self) -> ConfigResult<()> {
        let domain = self.domain_name();

        if self.weights.is_empty() {
            return Err(self.validation_error("weights must list at least one scenario"));
        }
        for (i, w) in self.weights.iter().enumerate() {
            validate_ratio(w.weight, &format!("weights[{}].weight", i), domain)?;
            if self.weights[..i].iter().any(|prev| prev.name == w.name) {
                return Err(self.validation_error(format!("scenario '{}' listed twice", w.name)));
            }
        }

        if self.think_time.min > self.think_time.max {
            return Err(self.validation_error("think_time.min cannot exceed think_time.max"));
        }

        if self.inventory_types.is_empty() {
            return Err(self.validation_error("inventory_types cannot be empty"));
        }
        for ty in &self.inventory_types {
            validate_required_string(ty, "inventory_types[]", domain)?;
        }

        validate_positive(self.quantity.lot, "quantity.lot", domain)?;
        if self.quantity.min > self.quantity.max || self.quantity.max < self.quantity.lot {
            return Err(self.validation_error("quantity range must satisfy min <= max and max >= lot"));
        }

        validate_positive(self.batch.market_data_batch_size, "batch.market_data_batch_size", domain)?;
        validate_ratio(self.batch.min_success_rate, "batch.min_success_rate", domain)?;
        validate_ratio(self.batch.batched_probability, "batch.batched_probability", domain)?;

        let m = &self.mixed;
        for (name, p) in [
            ("mixed.locate", m.locate),
            ("mixed.short_sell", m.short_sell),
            ("mixed.position", m.position),
            ("mixed.inventory", m.inventory),
            ("mixed.data_ingestion", m.data_ingestion),
        ] {
            validate_ratio(p, name, domain)?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "profile.scenarios"
    }
}
