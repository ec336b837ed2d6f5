//! Executed-order records for the append-only transaction log.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Action::Buy => "Buy",
            Action::Sell => "Sell",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TransactionRecord")]
pub struct Transaction {
    timestamp: DateTime<Utc>,
    symbol: String,
    action: Action,
    quantity: u64,
    price: Decimal,
}

#[derive(Deserialize)]
struct TransactionRecord {
    timestamp: DateTime<Utc>,
    symbol: String,
    action: Action,
    quantity: u64,
    price: Decimal,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = LedgerError;

    fn try_from(r: TransactionRecord) -> Result<Self, Self::Error> {
        Transaction::new(r.timestamp, &r.symbol, r.action, r.quantity, r.price)
    }
}

impl Transaction {
    pub fn new(
        timestamp: DateTime<Utc>,
        symbol: &str,
        action: Action,
        quantity: u64,
        price: Decimal,
    ) -> Result<Self, LedgerError> {
        if quantity == 0 {
            return Err(LedgerError::InvalidQuantity {
                symbol: symbol.to_string(),
            });
        }
        if price <= Decimal::ZERO {
            return Err(LedgerError::InvalidPrice {
                symbol: symbol.to_string(),
                reason: format!("execution price must be positive, got {price}"),
            });
        }
        Ok(Transaction {
            timestamp,
            symbol: symbol.to_string(),
            action,
            quantity,
            price,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    /// price * quantity
    pub fn total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}
