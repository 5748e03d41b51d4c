//! Per-profile SLA threshold tables

use crate::domains::operation::Operation;
use crate::error::ConfigResult;
use crate::validation::{validate_percentile, validate_positive, validate_ratio, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Percentile at which the business API publishes its SLAs
pub const DOCUMENTED_PERCENTILE: f64 = 99.0;

/// `percentile` of `operation` latency must stay at or below `max_ms`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSpec {
    pub operation: Operation,
    pub percentile: f64,
    pub max_ms: u64,
}

impl ThresholdSpec {
    pub fn new(operation: Operation, percentile: f64, max_ms: u64) -> Self {
        Self {
            operation,
            percentile,
            max_ms,
        }
    }
}

/// Thresholds a profile is judged against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdTable {
    pub entries: Vec<ThresholdSpec>,

    /// Run-wide ceiling on failed business calls / all business calls
    pub max_error_rate: f64,
}

/// A profile entry that differs from the SLA published for the operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdDivergence {
    pub operation: Operation,
    pub documented_ms: u64,
    /// `None` when the profile has no p99 entry for a documented operation
    pub configured_ms: Option<u64>,
}

impl ThresholdDivergence {
    pub fn is_relaxation(&self) -> bool {
        self.configured_ms.map_or(true, |ms| ms > self.documented_ms)
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl ThresholdTable {
    /// The production SLAs plus the harness's own sanity ceilings.
    pub fn standard() -> Self {
        Self {
            entries: vec![
                ThresholdSpec::new(Operation::ValidateOrder, 99.0, 150),
                ThresholdSpec::new(Operation::PositionQuery, 99.0, 200),
                ThresholdSpec::new(Operation::PositionCalculate, 99.0, 200),
                ThresholdSpec::new(Operation::InventoryQuery, 99.0, 200),
                ThresholdSpec::new(Operation::InventoryCalculate, 99.0, 200),
                ThresholdSpec::new(Operation::LocateSubmit, 95.0, 500),
                ThresholdSpec::new(Operation::TradeSubmit, 95.0, 500),
            ],
            max_error_rate: 0.01,
        }
    }

    /// Stress and spike runs: short-sell relaxed to 200 ms and up to 5% errors,
    /// separating "degraded but correct" from "broken".
    pub fn stress() -> Self {
        let mut table = Self::standard();
        for entry in table.entries.iter_mut() {
            if entry.operation == Operation::ValidateOrder {
                entry.max_ms = 200;
            }
        }
        table.max_error_rate = 0.05;
        table
    }

    pub fn for_operation(&self, operation: Operation) -> impl Iterator<Item = &ThresholdSpec> {
        self.entries.iter().filter(move |e| e.operation == operation)
    }

    /// Per-call hard SLA ceiling: the limit of the highest-percentile entry.
    pub fn sla_ceiling(&self, operation: Operation) -> Option<Duration> {
        self.for_operation(operation)
            .max_by(|a, b| a.percentile.total_cmp(&b.percentile))
            .map(|e| Duration::from_millis(e.max_ms))
    }

    /// Entries that silently differ from the published SLA.
    pub fn divergences(&self) -> Vec<ThresholdDivergence> {
        Operation::ALL
            .iter()
            .filter_map(|&op| {
                let documented_ms = op.documented_sla_ms()?;
                let configured_ms = self
                    .for_operation(op)
                    .find(|e| e.percentile == DOCUMENTED_PERCENTILE)
                    .map(|e| e.max_ms);
                if configured_ms == Some(documented_ms) {
                    None
                } else {
                    Some(ThresholdDivergence {
                        operation: op,
                        documented_ms,
                        configured_ms,
                    })
                }
            })
            .collect()
    }
}

impl Validatable for ThresholdTable {
    fn validate(&self) -> ConfigResult<()> {
        validate_ratio(self.max_error_rate, "max_error_rate", self.domain_name())?;
        for (i, entry) in self.entries.iter().enumerate() {
            validate_percentile(entry.percentile, &format!("entries[{}].percentile", i), self.domain_name())?;
            validate_positive(entry.max_ms, &format!("entries[{}].max_ms", i), self.domain_name())?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "profile.thresholds"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_matches_documented_sla() {
        let table = ThresholdTable::standard();
        assert!(table.validate().is_ok());
        assert!(table.divergences().is_empty());
        assert_eq!(
            table.sla_ceiling(Operation::ValidateOrder),
            Some(Duration::from_millis(150))
        );
        assert_eq!(table.sla_ceiling(Operation::SettlementLadder), None);
    }

    #[test]
    fn test_stress_divergence_is_reported() {
        let table = ThresholdTable::stress();
        let divergences = table.divergences();
        assert_eq!(divergences.len(), 1);
        assert_eq!(divergences[0].operation, Operation::ValidateOrder);
        assert_eq!(divergences[0].configured_ms, Some(200));
        assert!(divergences[0].is_relaxation());
        assert_eq!(table.max_error_rate, 0.05);
    }

    #[test]
    fn test_missing_documented_entry_is_a_divergence() {
        let mut table = ThresholdTable::standard();
        table.entries.retain(|e| e.operation != Operation::PositionQuery);
        let divergences = table.divergences();
        assert_eq!(divergences.len(), 1);
        assert_eq!(divergences[0].configured_ms, None);
    }

    #[test]
    fn test_sla_ceiling_uses_highest_percentile() {
        let table = ThresholdTable {
            entries: vec![
                ThresholdSpec::new(Operation::ValidateOrder, 95.0, 100),
                ThresholdSpec::new(Operation::ValidateOrder, 99.0, 150),
            ],
            max_error_rate: 0.01,
        };
        assert_eq!(
            table.sla_ceiling(Operation::ValidateOrder),
            Some(Duration::from_millis(150))
        );
    }

    #[test]
    fn test_invalid_entries() {
        let mut table = ThresholdTable::standard();
        table.max_error_rate = 2.0;
        assert!(table.validate().is_err());

        let mut table = ThresholdTable::standard();
        table.entries.push(ThresholdSpec::new(Operation::TradeSubmit, 0.0, 10));
        assert!(table.validate().is_err());
    }
}
