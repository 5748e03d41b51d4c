//! Request bodies and paths of the business API

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Utc, Weekday};
use serde_json::{json, Value as JsonValue};
use surge_core::reference::{Book, Counterparty, Security};
use uuid::Uuid;

pub const LOCATES: &str = "/api/v1/locates";
pub const VALIDATE_ORDER: &str = "/api/v1/orders/validate";
pub const POSITIONS: &str = "/api/v1/positions";
pub const POSITION_CALCULATE: &str = "/api/v1/positions/calculate";
pub const SETTLEMENT_LADDER: &str = "/api/v1/positions/settlement-ladder";
pub const TRADES: &str = "/api/v1/trades";
pub const MARKET_DATA: &str = "/api/v1/market-data";
pub const MARKET_DATA_BATCH: &str = "/api/v1/market-data/prices";
pub const SYSTEM_HEALTH: &str = "/api/v1/system/health";

pub const FOR_LOAN: &str = "for-loan";

/// Locate types the locate service accepts
pub const LOCATE_TYPES: [&str; 2] = ["SHORT_SALE", "PRE_BORROW"];

pub fn locate_status(request_id: &str) -> String {
    format!("{}/{}", LOCATES, request_id)
}

pub fn inventory(calculation_type: &str) -> String {
    format!("/api/v1/inventory/{}", calculation_type)
}

pub fn client_limit(client_id: &str) -> String {
    format!("/api/v1/limits/client/{}", client_id)
}

pub fn aggregation_unit_limit(unit_id: &str) -> String {
    format!("/api/v1/limits/aggregation-unit/{}", unit_id)
}

pub fn security(security_id: &str) -> String {
    format!("/api/v1/securities/{}", security_id)
}

pub fn counterparty(counterparty_id: &str) -> String {
    format!("/api/v1/counterparties/{}", counterparty_id)
}

/// `days` business days after `from`, skipping weekends
pub fn add_business_days(from: NaiveDate, days: u32) -> NaiveDate {
    let mut date = from;
    let mut remaining = days;
    while remaining > 0 {
        date += ChronoDuration::days(1);
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }
    date
}

pub fn locate_request(security: &Security, client: &Counterparty, quantity: u64, locate_type: &str) -> JsonValue {
    json!({
        "securityId": security.id,
        "clientId": client.id,
        "quantity": quantity,
        "locateType": locate_type,
        "requestedBy": "surge",
        "requestTime": Utc::now().to_rfc3339(),
    })
}

pub fn short_sell_order(
    security: &Security,
    client: &Counterparty,
    book: &Book,
    quantity: u64,
    price: f64,
) -> JsonValue {
    json!({
        "orderId": Uuid::new_v4().to_string(),
        "securityId": security.id,
        "clientId": client.id,
        "bookId": book.id,
        "side": "SELL_SHORT",
        "orderType": "LIMIT",
        "quantity": quantity,
        "price": price,
        "tradeDate": Utc::now().date_naive().to_string(),
    })
}

pub fn trade(book: &Book, security: &Security, client: &Counterparty, signed_quantity: i64, price: f64) -> JsonValue {
    let trade_date = Utc::now().date_naive();
    json!({
        "tradeId": Uuid::new_v4().to_string(),
        "bookId": book.id,
        "securityId": security.id,
        "counterpartyId": client.id,
        "side": if signed_quantity >= 0 { "BUY" } else { "SELL" },
        "quantity": signed_quantity.unsigned_abs(),
        "price": price,
        "tradeDate": trade_date.to_string(),
        "settlementDate": add_business_days(trade_date, 2).to_string(),
    })
}

pub fn position_calculation(book: &Book, security: &Security) -> JsonValue {
    json!({
        "bookId": book.id,
        "securityId": security.id,
        "calculationType": "REALTIME",
    })
}

pub fn inventory_calculation(security: &Security, calculation_type: &str) -> JsonValue {
    json!({
        "securityId": security.id,
        "calculationType": calculation_type,
        "forceRecalculation": true,
    })
}

pub fn security_update(security: &Security, price: f64) -> JsonValue {
    json!({
        "securityId": security.id,
        "symbol": security.symbol,
        "isin": security.isin,
        "securityType": security.security_type,
        "currency": security.currency,
        "status": "ACTIVE",
        "lastPrice": price,
        "updatedAt": Utc::now().to_rfc3339(),
    })
}

pub fn counterparty_update(counterparty: &Counterparty) -> JsonValue {
    json!({
        "counterpartyId": counterparty.id,
        "name": counterparty.name,
        "counterpartyType": counterparty.counterparty_type,
        "status": "ACTIVE",
        "updatedAt": Utc::now().to_rfc3339(),
    })
}

pub fn market_price(security: &Security, price: f64, volume: u64) -> JsonValue {
    let half_spread = (price * 0.0005 * 100.0).round() / 100.0;
    json!({
        "securityId": security.id,
        "price": price,
        "bid": price - half_spread,
        "ask": price + half_spread,
        "volume": volume,
        "currency": security.currency,
        "timestamp": Utc::now().to_rfc3339(),
    })
}

pub fn market_price_batch(prices: Vec<JsonValue>) -> JsonValue {
    json!({
        "batchId": Uuid::new_v4().to_string(),
        "prices": prices,
    })
}

/// Available quantity from an inventory response
pub const AVAILABLE_FIELDS: [&str; 3] = ["availableQuantity", "available", "quantity"];

#[cfg(test)]
mod tests {
    use super::*;
    use surge_core::ReferenceData;

    #[test]
    fn test_settlement_skips_weekend() {
        let friday = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(add_business_days(friday, 2), NaiveDate::from_ymd_opt(2024, 3, 19).unwrap());
        let monday = NaiveDate::from_ymd_opt(2024, 3, 18).unwrap();
        assert_eq!(add_business_days(monday, 2), NaiveDate::from_ymd_opt(2024, 3, 20).unwrap());
    }

    #[test]
    fn test_paths() {
        assert_eq!(locate_status("LOC-1"), "/api/v1/locates/LOC-1");
        assert_eq!(inventory(FOR_LOAN), "/api/v1/inventory/for-loan");
        assert_eq!(aggregation_unit_limit("AU-PB"), "/api/v1/limits/aggregation-unit/AU-PB");
    }

    #[test]
    fn test_trade_side_follows_sign() {
        let data = ReferenceData::builtin();
        let sell = trade(&data.books[0], &data.securities[0], &data.counterparties[0], -300, 10.0);
        assert_eq!(sell["side"], "SELL");
        assert_eq!(sell["quantity"], 300);

        let buy = trade(&data.books[0], &data.securities[0], &data.counterparties[0], 500, 10.0);
        assert_eq!(buy["side"], "BUY");
    }

    #[test]
    fn test_locate_request_fields() {
        let data = ReferenceData::builtin();
        let body = locate_request(&data.securities[0], &data.counterparties[0], 5000, LOCATE_TYPES[0]);
        assert_eq!(body["securityId"], "SEC-EQ-001");
        assert_eq!(body["clientId"], "CP001");
        assert_eq!(body["quantity"], 5000);
    }
}
