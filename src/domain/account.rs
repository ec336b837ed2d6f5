//! The account record: cash, positions, transaction log, alerts and watchlist.
//!
//! Fields are only mutated through the ledger and alert operations in this
//! module tree, so the record invariants hold for every value a caller sees.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::alert::Alert;
use super::position::Position;
use super::transaction::Transaction;

pub const DEFAULT_STARTING_CASH: Decimal = dec!(10000);

/// Canonical symbol form used as map key everywhere.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AccountRecord")]
pub struct Account {
    id: String,
    cash_balance: Decimal,
    positions: BTreeMap<String, Position>,
    transactions: Vec<Transaction>,
    alerts: BTreeSet<Alert>,
    watchlist: Vec<String>,
}

#[derive(Deserialize)]
struct AccountRecord {
    id: String,
    cash_balance: Decimal,
    #[serde(default)]
    positions: BTreeMap<String, Position>,
    #[serde(default)]
    transactions: Vec<Transaction>,
    #[serde(default)]
    alerts: BTreeSet<Alert>,
    #[serde(default)]
    watchlist: Vec<String>,
}

impl TryFrom<AccountRecord> for Account {
    type Error = String;

    fn try_from(r: AccountRecord) -> Result<Self, Self::Error> {
        if r.cash_balance < Decimal::ZERO {
            return Err(format!(
                "account {}: negative cash balance {}",
                r.id, r.cash_balance
            ));
        }
        if let Some((key, pos)) = r.positions.iter().find(|(k, p)| k.as_str() != p.symbol()) {
            return Err(format!(
                "account {}: position key {} holds symbol {}",
                r.id,
                key,
                pos.symbol()
            ));
        }
        Ok(Account {
            id: r.id,
            cash_balance: r.cash_balance,
            positions: r.positions,
            transactions: r.transactions,
            alerts: r.alerts,
            watchlist: r.watchlist,
        })
    }
}

impl Account {
    /// Fresh account with no holdings. Negative starting cash is clamped to zero.
    pub fn new(id: &str, starting_cash: Decimal) -> Self {
        Account {
            id: id.to_string(),
            cash_balance: starting_cash.max(Decimal::ZERO),
            positions: BTreeMap::new(),
            transactions: Vec::new(),
            alerts: BTreeSet::new(),
            watchlist: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cash_balance(&self) -> Decimal {
        self.cash_balance
    }

    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(&normalize_symbol(symbol))
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(&normalize_symbol(symbol))
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn alerts(&self) -> &BTreeSet<Alert> {
        &self.alerts
    }

    pub fn watchlist(&self) -> &[String] {
        &self.watchlist
    }

    /// Returns false when the symbol is empty or already listed.
    pub fn add_to_watchlist(&mut self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() || self.watchlist.contains(&symbol) {
            return false;
        }
        self.watchlist.push(symbol);
        true
    }

    pub fn remove_from_watchlist(&mut self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        let before = self.watchlist.len();
        self.watchlist.retain(|s| *s != symbol);
        self.watchlist.len() != before
    }

    pub(crate) fn cash_balance_mut(&mut self) -> &mut Decimal {
        &mut self.cash_balance
    }

    pub(crate) fn positions_mut(&mut self) -> &mut BTreeMap<String, Position> {
        &mut self.positions
    }

    pub(crate) fn transactions_mut(&mut self) -> &mut Vec<Transaction> {
        &mut self.transactions
    }

    pub(crate) fn alerts_mut(&mut self) -> &mut BTreeSet<Alert> {
        &mut self.alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account() {
        let account = Account::new("alice", DEFAULT_STARTING_CASH);
        assert_eq!(account.id(), "alice");
        assert_eq!(account.cash_balance(), dec!(10000));
        assert!(account.positions().is_empty());
        assert!(account.transactions().is_empty());
        assert!(account.alerts().is_empty());
        assert!(account.watchlist().is_empty());
    }

    #[test]
    fn negative_starting_cash_clamped() {
        let account = Account::new("bob", dec!(-5));
        assert_eq!(account.cash_balance(), Decimal::ZERO);
    }

    #[test]
    fn normalize_symbol_trims_and_uppercases() {
        assert_eq!(normalize_symbol("  aapl "), "AAPL");
    }

    #[test]
    fn watchlist_add_dedupes() {
        let mut account = Account::new("alice", DEFAULT_STARTING_CASH);
        assert!(account.add_to_watchlist("aapl"));
        assert!(!account.add_to_watchlist("AAPL"));
        assert!(!account.add_to_watchlist("   "));
        assert!(account.add_to_watchlist("tsla"));
        assert_eq!(account.watchlist(), ["AAPL", "TSLA"]);
    }

    #[test]
    fn watchlist_remove() {
        let mut account = Account::new("alice", DEFAULT_STARTING_CASH);
        account.add_to_watchlist("AAPL");
        assert!(account.remove_from_watchlist("aapl"));
        assert!(!account.remove_from_watchlist("AAPL"));
        assert!(account.watchlist().is_empty());
    }

    #[test]
    fn deserialize_rejects_negative_cash() {
        let json = r#"{"id":"x","cash_balance":"-1"}"#;
        assert!(serde_json::from_str::<Account>(json).is_err());
    }

    #[test]
    fn deserialize_rejects_mismatched_position_key() {
        let json = r#"{"id":"x","cash_balance":"10",
            "positions":{"MSFT":{"symbol":"AAPL","quantity":1,"avg_price":"5"}}}"#;
        assert!(serde_json::from_str::<Account>(json).is_err());
    }

    #[test]
    fn deserialize_defaults_collections() {
        let account: Account = serde_json::from_str(r#"{"id":"x","cash_balance":"10"}"#).unwrap();
        assert_eq!(account.cash_balance(), dec!(10));
        assert!(account.positions().is_empty());
    }
}
