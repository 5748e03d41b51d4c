//! Test entity corpus: securities, counterparties, books and seeded state

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Security {
    pub id: String,
    pub symbol: String,
    #[serde(default)]
    pub isin: Option<String>,
    #[serde(default = "default_security_type")]
    pub security_type: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Reference price used to seed market data updates
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counterparty {
    pub id: String,
    pub name: String,
    #[serde(default = "default_counterparty_type")]
    pub counterparty_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aggregation_unit_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationUnit {
    pub id: String,
    pub name: String,
}

/// Position known to exist before the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedPosition {
    pub book_id: String,
    pub security_id: String,
    pub quantity: i64,
}

/// Locate known to exist before the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedLocate {
    pub request_id: String,
    pub security_id: String,
    pub client_id: String,
    pub quantity: u64,
}

/// Fixed corpus the workflows draw from. Read-only for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceData {
    pub securities: Vec<Security>,
    pub counterparties: Vec<Counterparty>,
    pub books: Vec<Book>,
    #[serde(default)]
    pub aggregation_units: Vec<AggregationUnit>,
    #[serde(default)]
    pub positions: Vec<SeedPosition>,
    #[serde(default)]
    pub locates: Vec<SeedLocate>,
}

fn default_security_type() -> String {
    "EQUITY".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_counterparty_type() -> String {
    "CLIENT".to_string()
}

/// Element at `draw` ∈ [0, 1) of a non-empty slice
pub fn pick<T>(items: &[T], draw: f64) -> Option<&T> {
    if items.is_empty() {
        return None;
    }
    let index = ((draw.clamp(0.0, 1.0) * items.len() as f64) as usize).min(items.len() - 1);
    items.get(index)
}

impl ReferenceData {
    /// Built-in corpus matching the seeded test environments
    pub fn builtin() -> Self {
        let securities = [
            ("SEC-EQ-001", "AAPL", "US0378331005", 189.50),
            ("SEC-EQ-002", "MSFT", "US5949181045", 415.20),
            ("SEC-EQ-003", "GOOGL", "US02079K3059", 141.80),
            ("SEC-EQ-004", "AMZN", "US0231351067", 178.25),
            ("SEC-EQ-005", "TSLA", "US88160R1014", 242.10),
            ("SEC-EQ-006", "NVDA", "US67066G1040", 875.00),
            ("SEC-EQ-007", "META", "US30303M1027", 502.30),
            ("SEC-EQ-008", "JPM", "US46625H1005", 198.40),
        ]
        .into_iter()
        .map(|(id, symbol, isin, price)| Security {
            id: id.to_string(),
            symbol: symbol.to_string(),
            isin: Some(isin.to_string()),
            security_type: default_security_type(),
            currency: default_currency(),
            price,
        })
        .collect::<Vec<_>>();

        let counterparties = [
            ("CP001", "Northbridge Capital", "HEDGE_FUND"),
            ("CP002", "Meridian Asset Management", "ASSET_MANAGER"),
            ("CP003", "Harbor Point Partners", "HEDGE_FUND"),
            ("CP004", "Atlas Pension Trust", "PENSION_FUND"),
            ("CP005", "Greylock Prime Services", "BROKER_DEALER"),
        ]
        .into_iter()
        .map(|(id, name, kind)| Counterparty {
            id: id.to_string(),
            name: name.to_string(),
            counterparty_type: kind.to_string(),
        })
        .collect::<Vec<_>>();

        let aggregation_units = vec![
            AggregationUnit {
                id: "AU-US-EQ".to_string(),
                name: "US Equities".to_string(),
            },
            AggregationUnit {
                id: "AU-PB".to_string(),
                name: "Prime Brokerage".to_string(),
            },
        ];

        let books = vec![
            Book {
                id: "BOOK-EQ-01".to_string(),
                name: "US Equity Trading".to_string(),
                aggregation_unit_id: Some("AU-US-EQ".to_string()),
            },
            Book {
                id: "BOOK-EQ-02".to_string(),
                name: "US Equity Facilitation".to_string(),
                aggregation_unit_id: Some("AU-US-EQ".to_string()),
            },
            Book {
                id: "BOOK-PB-01".to_string(),
                name: "Prime Brokerage Financing".to_string(),
                aggregation_unit_id: Some("AU-PB".to_string()),
            },
        ];

        let mut positions = Vec::new();
        for (b, book) in books.iter().enumerate() {
            for (s, security) in securities.iter().enumerate().take(4) {
                positions.push(SeedPosition {
                    book_id: book.id.clone(),
                    security_id: security.id.clone(),
                    quantity: 10_000 * (b as i64 + 1) + 2_500 * s as i64,
                });
            }
        }

        let locates = (1..=3)
            .map(|i| SeedLocate {
                request_id: format!("LOC-SEED-{:03}", i),
                security_id: securities[i - 1].id.clone(),
                client_id: counterparties[i - 1].id.clone(),
                quantity: 5_000,
            })
            .collect();

        Self {
            securities,
            counterparties,
            books,
            aggregation_units,
            positions,
            locates,
        }
    }

    /// Load a corpus from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let data: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => {
                return Err(CoreError::ReferenceData(format!(
                    "unsupported reference data format: {}",
                    path.display()
                )))
            }
        };
        data.validate()?;

        info!(
            path = %path.display(),
            securities = data.securities.len(),
            counterparties = data.counterparties.len(),
            books = data.books.len(),
            "Loaded reference data"
        );
        Ok(data)
    }

    /// Load from `path`, or use the built-in corpus
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    /// Every workflow needs at least one security, counterparty, book and
    /// aggregation unit
    pub fn validate(&self) -> Result<()> {
        if self.securities.is_empty() {
            return Err(CoreError::ReferenceData("no securities".to_string()));
        }
        if self.counterparties.is_empty() {
            return Err(CoreError::ReferenceData("no counterparties".to_string()));
        }
        if self.books.is_empty() {
            return Err(CoreError::ReferenceData("no books".to_string()));
        }
        if self.aggregation_units.is_empty() {
            return Err(CoreError::ReferenceData("no aggregation units".to_string()));
        }
        if let Some(s) = self.securities.iter().find(|s| !(s.price.is_finite() && s.price > 0.0)) {
            return Err(CoreError::ReferenceData(format!(
                "security {} has invalid price {}",
                s.id, s.price
            )));
        }
        if let Some(p) = self
            .positions
            .iter()
            .find(|p| self.find_book(&p.book_id).is_none() || self.find_security(&p.security_id).is_none())
        {
            return Err(CoreError::ReferenceData(format!(
                "position {}/{} names an unknown book or security",
                p.book_id, p.security_id
            )));
        }
        if let Some(l) = self.locates.iter().find(|l| self.find_security(&l.security_id).is_none()) {
            return Err(CoreError::ReferenceData(format!(
                "locate {} names unknown security {}",
                l.request_id, l.security_id
            )));
        }
        Ok(())
    }

    pub fn security(&self, draw: f64) -> Option<&Security> {
        pick(&self.securities, draw)
    }

    pub fn counterparty(&self, draw: f64) -> Option<&Counterparty> {
        pick(&self.counterparties, draw)
    }

    pub fn book(&self, draw: f64) -> Option<&Book> {
        pick(&self.books, draw)
    }

    /// Aggregation unit of `book`, falling back to any unit
    pub fn aggregation_unit_for(&self, book: &Book, draw: f64) -> Option<&AggregationUnit> {
        book.aggregation_unit_id
            .as_ref()
            .and_then(|id| self.aggregation_units.iter().find(|au| &au.id == id))
            .or_else(|| pick(&self.aggregation_units, draw))
    }

    pub fn position(&self, draw: f64) -> Option<&SeedPosition> {
        pick(&self.positions, draw)
    }

    pub fn locate(&self, draw: f64) -> Option<&SeedLocate> {
        pick(&self.locates, draw)
    }

    pub fn find_security(&self, id: &str) -> Option<&Security> {
        self.securities.iter().find(|s| s.id == id)
    }

    pub fn find_book(&self, id: &str) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }
}
