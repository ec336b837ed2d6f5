//! Core domain types and logic: accounts, the ledger, alerts and the price
//! simulator. Nothing here performs I/O.

pub mod account;
pub mod alert;
pub mod candle;
pub mod config_validation;
pub mod error;
pub mod history;
pub mod ledger;
pub mod position;
pub mod simulator;
pub mod transaction;
pub mod valuation;
