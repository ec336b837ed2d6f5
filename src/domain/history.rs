//! Per-sale profit/loss reconstructed from the transaction log.
//!
//! This view is independent of the live position average: each sell is
//! priced against the plain mean of every earlier buy of the same symbol,
//! so it can differ from the ledger's weighted average once buys and sells
//! interleave. Both numbers are kept; neither corrects the other.

use rust_decimal::Decimal;

use super::account::Account;
use super::transaction::{Action, Transaction};

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub transaction: Transaction,
    /// Zero for buys and for sells with no earlier buy.
    pub profit_loss: Decimal,
}

/// Profit/loss for every transaction, newest first.
pub fn realized_pnl_for(account: &Account) -> Vec<HistoryEntry> {
    let mut chronological: Vec<(usize, &Transaction)> =
        account.transactions().iter().enumerate().collect();
    chronological.sort_by_key(|(idx, tx)| (tx.timestamp(), *idx));

    let mut entries: Vec<(usize, HistoryEntry)> = chronological
        .iter()
        .map(|(idx, tx)| {
            let profit_loss = match tx.action() {
                Action::Buy => Decimal::ZERO,
                Action::Sell => sale_pnl(tx, &chronological),
            };
            (
                *idx,
                HistoryEntry {
                    transaction: (*tx).clone(),
                    profit_loss,
                },
            )
        })
        .collect();

    entries.sort_by(|(ia, a), (ib, b)| {
        b.transaction
            .timestamp()
            .cmp(&a.transaction.timestamp())
            .then(ib.cmp(ia))
    });
    entries.into_iter().map(|(_, e)| e).collect()
}

/// Sum of reconstructed profit/loss across all sells.
pub fn total_realized_pnl(account: &Account) -> Decimal {
    realized_pnl_for(account).iter().map(|e| e.profit_loss).sum()
}

fn sale_pnl(sell: &Transaction, chronological: &[(usize, &Transaction)]) -> Decimal {
    let buy_prices: Vec<Decimal> = chronological
        .iter()
        .map(|(_, tx)| *tx)
        .take_while(|tx| tx.timestamp() < sell.timestamp())
        .filter(|tx| tx.action() == Action::Buy && tx.symbol() == sell.symbol())
        .map(|tx| tx.price())
        .collect();

    if buy_prices.is_empty() {
        return Decimal::ZERO;
    }
    let mean = buy_prices.iter().sum::<Decimal>() / Decimal::from(buy_prices.len());
    (sell.price() - mean) * Decimal::from(sell.quantity())
}
