//! Order execution against an account under weighted-average cost.
//!
//! Every operation validates first and mutates second, so a failed order
//! leaves cash, positions and the transaction log exactly as they were.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use super::account::{Account, normalize_symbol};
use super::error::LedgerError;
use super::position::Position;
use super::transaction::{Action, Transaction};

/// Decimal places kept when converting a float market price.
pub const PRICE_DP: u32 = 4;

/// Outcome of a successful order.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub transaction: Transaction,
    /// (price - avg_price_before) * quantity for sells; None for buys.
    pub realized_pnl: Option<Decimal>,
}

/// Convert a float market price into an execution price.
///
/// Non-finite, zero or negative inputs are refused with `InvalidPrice`.
pub fn price_from_f64(symbol: &str, price: f64) -> Result<Decimal, LedgerError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(LedgerError::InvalidPrice {
            symbol: symbol.to_string(),
            reason: format!("unusable market price {price}"),
        });
    }
    Decimal::from_f64(price)
        .map(|p| p.round_dp(PRICE_DP))
        .filter(|p| *p > Decimal::ZERO)
        .ok_or_else(|| LedgerError::InvalidPrice {
            symbol: symbol.to_string(),
            reason: format!("price {price} is not representable"),
        })
}

fn validate_order(symbol: &str, quantity: u64, price: Decimal) -> Result<(), LedgerError> {
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
    Ok(())
}

fn overflow(symbol: &str) -> LedgerError {
    LedgerError::AmountOverflow {
        symbol: symbol.to_string(),
    }
}

/// Transactions stay chronological even if the caller's clock steps back.
fn log_time(account: &Account, requested: DateTime<Utc>) -> DateTime<Utc> {
    account
        .transactions()
        .last()
        .map_or(requested, |last| requested.max(last.timestamp()))
}

pub fn execute_buy(
    account: &mut Account,
    symbol: &str,
    quantity: u64,
    price: Decimal,
) -> Result<Execution, LedgerError> {
    execute_buy_at(account, symbol, quantity, price, Utc::now())
}

pub fn execute_buy_at(
    account: &mut Account,
    symbol: &str,
    quantity: u64,
    price: Decimal,
    timestamp: DateTime<Utc>,
) -> Result<Execution, LedgerError> {
    let symbol = normalize_symbol(symbol);
    validate_order(&symbol, quantity, price)?;

    let available = account.cash_balance();
    let cost = price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| overflow(&symbol))?;
    if cost > available {
        return Err(LedgerError::InsufficientFunds {
            required: cost,
            available,
        });
    }

    let position = match account.positions().get(&symbol) {
        Some(existing) => existing.blended(quantity, price)?,
        None => Position::new(&symbol, quantity, price)?,
    };
    let transaction = Transaction::new(
        log_time(account, timestamp),
        &symbol,
        Action::Buy,
        quantity,
        price,
    )?;

    *account.cash_balance_mut() -= cost;
    account.positions_mut().insert(symbol.clone(), position);
    account.transactions_mut().push(transaction.clone());

    Ok(Execution {
        transaction,
        realized_pnl: None,
    })
}

pub fn execute_sell(
    account: &mut Account,
    symbol: &str,
    quantity: u64,
    price: Decimal,
) -> Result<Execution, LedgerError> {
    execute_sell_at(account, symbol, quantity, price, Utc::now())
}

pub fn execute_sell_at(
    account: &mut Account,
    symbol: &str,
    quantity: u64,
    price: Decimal,
    timestamp: DateTime<Utc>,
) -> Result<Execution, LedgerError> {
    let symbol = normalize_symbol(symbol);
    validate_order(&symbol, quantity, price)?;

    let (held, avg_price) = match account.positions().get(&symbol) {
        Some(p) => (p.quantity(), p.avg_price()),
        None => (0, Decimal::ZERO),
    };
    if held == 0 || quantity > held {
        return Err(LedgerError::InsufficientShares {
            symbol,
            requested: quantity,
            held,
        });
    }

    let proceeds = price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| overflow(&symbol))?;
    let realized_pnl = price
        .checked_sub(avg_price)
        .and_then(|gain| gain.checked_mul(Decimal::from(quantity)))
        .ok_or_else(|| overflow(&symbol))?;
    let cash_after = account
        .cash_balance()
        .checked_add(proceeds)
        .ok_or_else(|| overflow(&symbol))?;
    let transaction = Transaction::new(
        log_time(account, timestamp),
        &symbol,
        Action::Sell,
        quantity,
        price,
    )?;

    *account.cash_balance_mut() = cash_after;
    if quantity == held {
        account.positions_mut().remove(&symbol);
    } else if let Some(position) = account.positions_mut().get_mut(&symbol) {
        position.reduce(quantity);
    }
    account.transactions_mut().push(transaction.clone());

    Ok(Execution {
        transaction,
        realized_pnl: Some(realized_pnl),
    })
}
