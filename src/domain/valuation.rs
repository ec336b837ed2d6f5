//! Mark-to-market portfolio summary.

use rust_decimal::Decimal;
use serde::Serialize;

use super::account::Account;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingRow {
    pub symbol: String,
    pub quantity: u64,
    pub avg_price: Decimal,
    pub current_price: Decimal,
    /// current_price * quantity, to cents
    pub value: Decimal,
    /// unrealized, to cents
    pub profit_loss: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioStats {
    pub portfolio_value: Decimal,
    pub cash_balance: Decimal,
    pub total_shares: u64,
    pub total_assets: usize,
    pub net_profit_loss: Decimal,
    pub breakdown: Vec<HoldingRow>,
}

impl PortfolioStats {
    /// Cash plus market value of holdings.
    pub fn total_equity(&self) -> Decimal {
        self.cash_balance + self.portfolio_value
    }
}

/// Value every open position at the price `current_price` reports for it.
pub fn portfolio_stats<F>(account: &Account, mut current_price: F) -> PortfolioStats
where
    F: FnMut(&str) -> Decimal,
{
    let breakdown: Vec<HoldingRow> = account
        .positions()
        .values()
        .map(|pos| {
            let price = current_price(pos.symbol());
            HoldingRow {
                symbol: pos.symbol().to_string(),
                quantity: pos.quantity(),
                avg_price: pos.avg_price(),
                current_price: price,
                value: pos.market_value(price).round_dp(2),
                profit_loss: pos.unrealized_pnl(price).round_dp(2),
            }
        })
        .collect();

    PortfolioStats {
        portfolio_value: breakdown.iter().map(|r| r.value).sum(),
        cash_balance: account.cash_balance(),
        total_shares: breakdown.iter().map(|r| r.quantity).sum(),
        total_assets: breakdown.len(),
        net_profit_loss: breakdown.iter().map(|r| r.profit_loss).sum::<Decimal>().round_dp(2),
        breakdown,
    }
}
