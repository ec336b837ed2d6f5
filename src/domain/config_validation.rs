//! Configuration validation.
//!
//! Validates every config field before a command touches accounts or data.

use crate::domain::error::SimtraderError;
use crate::ports::config_port::ConfigPort;

pub const MAX_WINDOW_SIZE: i64 = 1000;
pub const MIN_TICK_INTERVAL_MS: i64 = 100;
pub const MAX_TICK_INTERVAL_MS: i64 = 60_000;

pub fn validate_account_config(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    validate_starting_cash(config)?;
    Ok(())
}

pub fn validate_simulator_config(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    validate_non_negative(config, "simulator", "volatility_scale", 0.1)?;
    validate_non_negative(config, "simulator", "volatility_floor", 0.01)?;
    validate_non_negative(config, "simulator", "close_scale", 0.5)?;
    validate_default_volatility(config)?;
    validate_window_size(config)?;
    validate_tick_interval(config)?;
    Ok(())
}

pub fn validate_market_data_config(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    validate_data_dir(config)?;
    validate_ttl(config)?;
    validate_fetch_timeout(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> SimtraderError {
    SimtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_starting_cash(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    let value = config.get_double("account", "starting_cash", 10_000.0);
    if value <= 0.0 || !value.is_finite() {
        return Err(invalid(
            "account",
            "starting_cash",
            "starting_cash must be positive",
        ));
    }
    Ok(())
}

fn validate_non_negative(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<(), SimtraderError> {
    let value = config.get_double(section, key, default);
    if value < 0.0 || !value.is_finite() {
        return Err(invalid(
            section,
            key,
            &format!("{key} must be non-negative"),
        ));
    }
    Ok(())
}

fn validate_default_volatility(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    let value = config.get_double("simulator", "default_volatility", 1.0);
    if value <= 0.0 || !value.is_finite() {
        return Err(invalid(
            "simulator",
            "default_volatility",
            "default_volatility must be positive",
        ));
    }
    Ok(())
}

fn validate_window_size(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    let value = config.get_int("simulator", "window_size", 60);
    if !(1..=MAX_WINDOW_SIZE).contains(&value) {
        return Err(invalid(
            "simulator",
            "window_size",
            &format!("window_size must be between 1 and {MAX_WINDOW_SIZE}"),
        ));
    }
    Ok(())
}

fn validate_tick_interval(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    let value = config.get_int("simulator", "tick_interval_ms", 1000);
    if !(MIN_TICK_INTERVAL_MS..=MAX_TICK_INTERVAL_MS).contains(&value) {
        return Err(invalid(
            "simulator",
            "tick_interval_ms",
            &format!(
                "tick_interval_ms must be between {MIN_TICK_INTERVAL_MS} and {MAX_TICK_INTERVAL_MS}"
            ),
        ));
    }
    Ok(())
}

fn validate_data_dir(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    match config.get_string("market_data", "data_dir") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(SimtraderError::ConfigMissing {
            section: "market_data".to_string(),
            key: "data_dir".to_string(),
        }),
    }
}

fn validate_ttl(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    let value = config.get_int("market_data", "ttl_secs", 60);
    if value <= 0 {
        return Err(invalid("market_data", "ttl_secs", "ttl_secs must be positive"));
    }
    Ok(())
}

fn validate_fetch_timeout(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    let value = config.get_int("market_data", "fetch_timeout_ms", 5000);
    if value <= 0 {
        return Err(invalid(
            "market_data",
            "fetch_timeout_ms",
            "fetch_timeout_ms must be positive",
        ));
    }
    Ok(())
}
