//! Port traits: the seams between the core and its collaborators.

pub mod account_store_port;
pub mod config_port;
pub mod market_data_port;
pub mod notification_port;
