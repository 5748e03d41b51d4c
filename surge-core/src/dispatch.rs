//! Weighted scenario selection

use crate::error::{CoreError, Result};
use surge_config::{ScenarioKind, ScenarioWeight};

/// Cumulative-weight table, evaluated in declaration order.
///
/// Zero-weight entries are never chosen while any weight is positive. When
/// every weight is zero the last entry is returned.
#[derive(Debug, Clone)]
pub struct WeightedTable<T> {
    entries: Vec<(T, f64)>,
    total: f64,
}

impl<T> WeightedTable<T> {
    pub fn new(entries: Vec<(T, f64)>) -> Result<Self> {
        if entries.is_empty() {
            return Err(CoreError::Dispatch("weight table is empty".to_string()));
        }
        if let Some((_, w)) = entries.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(CoreError::Dispatch(format!("invalid weight {}", w)));
        }
        let total = entries.iter().map(|(_, w)| *w).sum();
        Ok(Self { entries, total })
    }

    /// Sum of all weights
    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Choose an entry for a uniform `draw` in [0, 1)
    pub fn select(&self, draw: f64) -> &T {
        let fallback = &self.entries[self.entries.len() - 1].0;
        if self.total <= 0.0 {
            return fallback;
        }

        let scaled = draw.clamp(0.0, 1.0) * self.total;
        let mut cumulative = 0.0;
        let mut last_positive = fallback;
        for (item, weight) in &self.entries {
            if *weight <= 0.0 {
                continue;
            }
            cumulative += weight;
            last_positive = item;
            if scaled < cumulative {
                return item;
            }
        }
        // draw == 1.0 or rounding at the top end
        last_positive
    }
}

/// Scenario dispatcher built from the profile's weights
pub type ScenarioTable = WeightedTable<ScenarioKind>;

impl WeightedTable<ScenarioKind> {
    pub fn from_weights(weights: &[ScenarioWeight]) -> Result<Self> {
        Self::new(weights.iter().map(|w| (w.name, w.weight)).collect())
    }
}
