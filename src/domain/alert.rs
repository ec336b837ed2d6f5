//! Price-threshold alerts.
//!
//! An alert is active while it sits in the account's set. Evaluation removes
//! every alert whose symbol trades at or above its target and reports it
//! exactly once; re-arming means adding a new alert.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::{Account, normalize_symbol};
use super::error::LedgerError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "AlertRecord")]
pub struct Alert {
    symbol: String,
    target_price: Decimal,
}

#[derive(Deserialize)]
struct AlertRecord {
    symbol: String,
    target_price: Decimal,
}

impl TryFrom<AlertRecord> for Alert {
    type Error = LedgerError;

    fn try_from(r: AlertRecord) -> Result<Self, Self::Error> {
        Alert::new(&r.symbol, r.target_price)
    }
}

impl Alert {
    pub fn new(symbol: &str, target_price: Decimal) -> Result<Self, LedgerError> {
        let symbol = normalize_symbol(symbol);
        if target_price <= Decimal::ZERO {
            return Err(LedgerError::InvalidPrice {
                symbol,
                reason: format!("alert target must be positive, got {target_price}"),
            });
        }
        Ok(Alert {
            symbol,
            target_price,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn target_price(&self) -> Decimal {
        self.target_price
    }

    pub fn is_triggered_by(&self, price: Decimal) -> bool {
        price >= self.target_price
    }
}

/// Event handed to the notification channel when an alert fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertTriggered {
    pub account_id: String,
    pub symbol: String,
    pub current_price: Decimal,
    pub target_price: Decimal,
}

/// Arm a new alert. Returns false if an identical alert is already active.
pub fn add_alert(
    account: &mut Account,
    symbol: &str,
    target_price: Decimal,
) -> Result<bool, LedgerError> {
    let alert = Alert::new(symbol, target_price)?;
    Ok(account.alerts_mut().insert(alert))
}

pub fn remove_alert(account: &mut Account, symbol: &str, target_price: Decimal) -> bool {
    let key = Alert {
        symbol: normalize_symbol(symbol),
        target_price,
    };
    account.alerts_mut().remove(&key)
}

/// Trigger and remove every alert whose symbol is at or above target.
///
/// Symbols the lookup cannot price stay active.
pub fn evaluate<F>(account: &mut Account, mut price_lookup: F) -> Vec<AlertTriggered>
where
    F: FnMut(&str) -> Option<Decimal>,
{
    let triggered: Vec<(Alert, Decimal)> = account
        .alerts()
        .iter()
        .filter_map(|alert| {
            let price = price_lookup(alert.symbol())?;
            alert.is_triggered_by(price).then(|| (alert.clone(), price))
        })
        .collect();

    let account_id = account.id().to_string();
    triggered
        .into_iter()
        .map(|(alert, current_price)| {
            account.alerts_mut().remove(&alert);
            AlertTriggered {
                account_id: account_id.clone(),
                symbol: alert.symbol,
                current_price,
                target_price: alert.target_price,
            }
        })
        .collect()
}
