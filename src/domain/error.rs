//! Domain error types.

use rust_decimal::Decimal;

/// Accounting failures. Every variant leaves the account untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("insufficient shares of {symbol}: requested {requested}, held {held}")]
    InsufficientShares {
        symbol: String,
        requested: u64,
        held: u64,
    },

    #[error("invalid price for {symbol}: {reason}")]
    InvalidPrice { symbol: String, reason: String },

    #[error("invalid quantity for {symbol}: quantity must be positive")]
    InvalidQuantity { symbol: String },

    #[error("order for {symbol} exceeds representable amounts")]
    AmountOverflow { symbol: String },
}

/// Market-data failures. These never escape the quote cache.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarketDataError {
    #[error("market data provider unavailable: {reason}")]
    ProviderUnavailable { reason: String },

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("provider call for {symbol} timed out after {millis} ms")]
    Timeout { symbol: String, millis: u64 },
}

/// Top-level error type for simtrader.
#[derive(Debug, thiserror::Error)]
pub enum SimtraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("account store error: {reason}")]
    Store { reason: String },

    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("account already exists: {0}")]
    AccountExists(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SimtraderError {
    /// Process exit status reported by the CLI for this error.
    pub fn exit_status(&self) -> u8 {
        match self {
            SimtraderError::Io(_) => 1,
            SimtraderError::ConfigParse { .. }
            | SimtraderError::ConfigMissing { .. }
            | SimtraderError::ConfigInvalid { .. } => 2,
            SimtraderError::Store { .. } => 3,
            SimtraderError::UnknownAccount(_) | SimtraderError::AccountExists(_) => 4,
            SimtraderError::Ledger(_) => 5,
        }
    }
}

impl From<&SimtraderError> for std::process::ExitCode {
    fn from(err: &SimtraderError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
