//! Operation tags used to group latency samples

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every business call the harness issues carries exactly one operation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    AuthLogin,
    AuthLogout,
    LocateSubmit,
    LocateStatus,
    ValidateOrder,
    PositionQuery,
    PositionCalculate,
    SettlementLadder,
    TradeSubmit,
    InventoryQuery,
    InventoryCalculate,
    ClientLimit,
    AggregationUnitLimit,
    SecurityQuery,
    SecurityUpdate,
    CounterpartyUpdate,
    MarketDataUpdate,
    MarketDataBatch,
    SystemHealth,
}

impl Operation {
    pub const COUNT: usize = 19;

    pub const ALL: [Operation; Operation::COUNT] = [
        Operation::AuthLogin,
        Operation::AuthLogout,
        Operation::LocateSubmit,
        Operation::LocateStatus,
        Operation::ValidateOrder,
        Operation::PositionQuery,
        Operation::PositionCalculate,
        Operation::SettlementLadder,
        Operation::TradeSubmit,
        Operation::InventoryQuery,
        Operation::InventoryCalculate,
        Operation::ClientLimit,
        Operation::AggregationUnitLimit,
        Operation::SecurityQuery,
        Operation::SecurityUpdate,
        Operation::CounterpartyUpdate,
        Operation::MarketDataUpdate,
        Operation::MarketDataBatch,
        Operation::SystemHealth,
    ];

    /// Stable dense index, used for array-backed per-operation storage.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::AuthLogin => "authLogin",
            Operation::AuthLogout => "authLogout",
            Operation::LocateSubmit => "locateSubmit",
            Operation::LocateStatus => "locateStatus",
            Operation::ValidateOrder => "validateOrder",
            Operation::PositionQuery => "positionQuery",
            Operation::PositionCalculate => "positionCalculate",
            Operation::SettlementLadder => "settlementLadder",
            Operation::TradeSubmit => "tradeSubmit",
            Operation::InventoryQuery => "inventoryQuery",
            Operation::InventoryCalculate => "inventoryCalculate",
            Operation::ClientLimit => "clientLimit",
            Operation::AggregationUnitLimit => "aggregationUnitLimit",
            Operation::SecurityQuery => "securityQuery",
            Operation::SecurityUpdate => "securityUpdate",
            Operation::CounterpartyUpdate => "counterpartyUpdate",
            Operation::MarketDataUpdate => "marketDataUpdate",
            Operation::MarketDataBatch => "marketDataBatch",
            Operation::SystemHealth => "systemHealth",
        }
    }

    /// Production SLA (p99, milliseconds) published for the business API.
    pub fn documented_sla_ms(self) -> Option<u64> {
        match self {
            Operation::ValidateOrder => Some(150),
            Operation::PositionQuery
            | Operation::PositionCalculate
            | Operation::InventoryQuery
            | Operation::InventoryCalculate => Some(200),
            _ => None,
        }
    }

    /// Harness plumbing calls are excluded from business error rates.
    pub fn is_business(self) -> bool {
        !matches!(
            self,
            Operation::AuthLogin | Operation::AuthLogout | Operation::SystemHealth
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Invalid operation tag: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_dense() {
        for (i, op) in Operation::ALL.iter().enumerate() {
            assert_eq!(op.index(), i);
        }
    }

    #[test]
    fn test_operation_round_trip_names() {
        assert_eq!("validateOrder".parse::<Operation>().unwrap(), Operation::ValidateOrder);
        assert_eq!("INVENTORYQUERY".parse::<Operation>().unwrap(), Operation::InventoryQuery);
        assert!("bogus".parse::<Operation>().is_err());

        let yaml = serde_yaml::to_string(&Operation::AggregationUnitLimit).unwrap();
        assert_eq!(yaml.trim(), "aggregationUnitLimit");
    }

    #[test]
    fn test_documented_sla() {
        assert_eq!(Operation::ValidateOrder.documented_sla_ms(), Some(150));
        assert_eq!(Operation::InventoryCalculate.documented_sla_ms(), Some(200));
        assert_eq!(Operation::TradeSubmit.documented_sla_ms(), None);
    }
}
