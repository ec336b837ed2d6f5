//! simtrader: paper-trading accounts over simulated and historical prices.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], async orchestration in
//! [`service`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
pub mod service;
