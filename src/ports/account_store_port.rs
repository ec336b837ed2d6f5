//! Account persistence port.

use crate::domain::account::Account;
use crate::domain::error::SimtraderError;

/// Durable storage for whole account records. The core never persists on
/// its own; callers load, operate, then save.
pub trait AccountStorePort {
    fn load(&self, account_id: &str) -> Result<Option<Account>, SimtraderError>;

    fn save(&self, account: &Account) -> Result<(), SimtraderError>;

    fn list_accounts(&self) -> Result<Vec<String>, SimtraderError>;
}
