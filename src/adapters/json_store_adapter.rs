//! JSON file account store.
//!
//! All accounts live in one file as an object keyed by account id. Saves
//! rewrite the whole file through a temporary sibling and a rename.

use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

use crate::domain::account::Account;
use crate::domain::error::SimtraderError;
use crate::ports::account_store_port::AccountStorePort;

pub struct JsonStoreAdapter {
    path: PathBuf,
}

fn store_err(reason: String) -> SimtraderError {
    SimtraderError::Store { reason }
}

impl JsonStoreAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_all(&self) -> Result<Map<String, Value>, SimtraderError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(store_err(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| store_err(format!("corrupt store {}: {}", self.path.display(), e)))
    }

    fn write_all(&self, accounts: &Map<String, Value>) -> Result<(), SimtraderError> {
        let body = serde_json::to_string_pretty(accounts)
            .map_err(|e| store_err(format!("failed to encode accounts: {}", e)))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)
            .map_err(|e| store_err(format!("failed to write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| store_err(format!("failed to replace {}: {}", self.path.display(), e)))
    }
}

impl AccountStorePort for JsonStoreAdapter {
    fn load(&self, account_id: &str) -> Result<Option<Account>, SimtraderError> {
        let accounts = self.read_all()?;
        accounts
            .get(account_id)
            .map(|value| {
                serde_json::from_value(value.clone())
                    .map_err(|e| store_err(format!("invalid account {}: {}", account_id, e)))
            })
            .transpose()
    }

    fn save(&self, account: &Account) -> Result<(), SimtraderError> {
        let mut accounts = self.read_all()?;
        let value = serde_json::to_value(account)
            .map_err(|e| store_err(format!("failed to encode {}: {}", account.id(), e)))?;
        accounts.insert(account.id().to_string(), value);
        tracing::debug!(account = account.id(), path = %self.path.display(), "account saved");
        self.write_all(&accounts)
    }

    fn list_accounts(&self) -> Result<Vec<String>, SimtraderError> {
        let mut ids: Vec<String> = self.read_all()?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::add_alert;
    use crate::domain::ledger::execute_buy;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn store() -> (TempDir, JsonStoreAdapter) {
        let dir = TempDir::new().unwrap();
        let adapter = JsonStoreAdapter::new(dir.path().join("accounts.json"));
        (dir, adapter)
    }

    #[test]
    fn load_missing_file_is_none() {
        let (_dir, adapter) = store();
        assert!(adapter.load("alice").unwrap().is_none());
        assert!(adapter.list_accounts().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_preserves_account() {
        let (_dir, adapter) = store();
        let mut account = Account::new("alice", dec!(10000));
        execute_buy(&mut account, "AAPL", 10, dec!(50)).unwrap();
        add_alert(&mut account, "AAPL", dec!(60)).unwrap();
        account.add_to_watchlist("TSLA");

        adapter.save(&account).unwrap();
        let loaded = adapter.load("alice").unwrap().unwrap();
        assert_eq!(loaded, account);
    }

    #[test]
    fn save_keeps_other_accounts() {
        let (_dir, adapter) = store();
        adapter.save(&Account::new("bob", dec!(5))).unwrap();
        adapter.save(&Account::new("alice", dec!(7))).unwrap();
        assert_eq!(adapter.list_accounts().unwrap(), vec!["alice", "bob"]);
        assert_eq!(
            adapter.load("bob").unwrap().unwrap().cash_balance(),
            dec!(5)
        );
    }

    #[test]
    fn corrupt_file_is_store_error() {
        let (dir, adapter) = store();
        fs::write(dir.path().join("accounts.json"), "{not json").unwrap();
        assert!(matches!(
            adapter.load("alice"),
            Err(SimtraderError::Store { .. })
        ));
    }

    #[test]
    fn invalid_record_is_store_error() {
        let (dir, adapter) = store();
        fs::write(
            dir.path().join("accounts.json"),
            r#"{"alice":{"id":"alice","cash_balance":"-10"}}"#,
        )
        .unwrap();
        assert!(matches!(
            adapter.load("alice"),
            Err(SimtraderError::Store { .. })
        ));
    }
}
