//! Open positions held under weighted-average cost accounting.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// One holding per symbol. Quantity is always positive; a fully sold
/// position is removed from the account rather than kept at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PositionRecord")]
pub struct Position {
    symbol: String,
    quantity: u64,
    avg_price: Decimal,
}

#[derive(Deserialize)]
struct PositionRecord {
    symbol: String,
    quantity: u64,
    avg_price: Decimal,
}

impl TryFrom<PositionRecord> for Position {
    type Error = LedgerError;

    fn try_from(record: PositionRecord) -> Result<Self, Self::Error> {
        Position::new(&record.symbol, record.quantity, record.avg_price)
    }
}

impl Position {
    pub fn new(symbol: &str, quantity: u64, avg_price: Decimal) -> Result<Self, LedgerError> {
        if quantity == 0 {
            return Err(LedgerError::InvalidQuantity {
                symbol: symbol.to_string(),
            });
        }
        if avg_price <= Decimal::ZERO {
            return Err(LedgerError::InvalidPrice {
                symbol: symbol.to_string(),
                reason: format!("average price must be positive, got {avg_price}"),
            });
        }
        Ok(Position {
            symbol: symbol.to_string(),
            quantity,
            avg_price,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn avg_price(&self) -> Decimal {
        self.avg_price
    }

    /// avg_price * quantity
    pub fn cost_basis(&self) -> Decimal {
        self.avg_price * Decimal::from(self.quantity)
    }

    pub fn market_value(&self, price: Decimal) -> Decimal {
        price * Decimal::from(self.quantity)
    }

    /// (price - avg_price) * quantity
    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        (price - self.avg_price) * Decimal::from(self.quantity)
    }

    /// Position after blending a new lot into the average cost.
    pub(crate) fn blended(&self, quantity: u64, price: Decimal) -> Result<Position, LedgerError> {
        let overflow = || LedgerError::AmountOverflow {
            symbol: self.symbol.clone(),
        };
        let total_qty = self.quantity.checked_add(quantity).ok_or_else(overflow)?;
        let total_cost = self
            .avg_price
            .checked_mul(Decimal::from(self.quantity))
            .and_then(|held| held.checked_add(price.checked_mul(Decimal::from(quantity))?))
            .ok_or_else(overflow)?;
        let avg_price = total_cost
            .checked_div(Decimal::from(total_qty))
            .ok_or_else(overflow)?;
        Ok(Position {
            symbol: self.symbol.clone(),
            quantity: total_qty,
            avg_price,
        })
    }

    /// Callers guarantee `quantity < self.quantity`.
    pub(crate) fn reduce(&mut self, quantity: u64) {
        self.quantity -= quantity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_position() -> Position {
        Position::new("AAPL", 100, dec!(50)).unwrap()
    }

    #[test]
    fn rejects_zero_quantity() {
        let err = Position::new("AAPL", 0, dec!(50)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidQuantity { .. }));
    }

    #[test]
    fn rejects_non_positive_price() {
        assert!(matches!(
            Position::new("AAPL", 10, dec!(0)),
            Err(LedgerError::InvalidPrice { .. })
        ));
        assert!(matches!(
            Position::new("AAPL", 10, dec!(-1)),
            Err(LedgerError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn market_value() {
        let pos = sample_position();
        assert_eq!(pos.market_value(dec!(55)), dec!(5500));
    }

    #[test]
    fn unrealized_pnl_profit() {
        let pos = sample_position();
        assert_eq!(pos.unrealized_pnl(dec!(55)), dec!(500));
    }

    #[test]
    fn unrealized_pnl_loss() {
        let pos = sample_position();
        assert_eq!(pos.unrealized_pnl(dec!(45)), dec!(-500));
    }

    #[test]
    fn blended_reaverages() {
        let pos = Position::new("AAPL", 10, dec!(50)).unwrap();
        let pos = pos.blended(10, dec!(60)).unwrap();
        assert_eq!(pos.quantity(), 20);
        assert_eq!(pos.avg_price(), dec!(55));
    }

    #[test]
    fn blended_overflow_is_an_error() {
        let pos = Position::new("AAPL", u64::MAX, dec!(1)).unwrap();
        assert!(matches!(
            pos.blended(1, dec!(1)),
            Err(LedgerError::AmountOverflow { .. })
        ));

        let pos = Position::new("AAPL", 2, Decimal::MAX / dec!(2)).unwrap();
        assert!(matches!(
            pos.blended(2, Decimal::MAX / dec!(2)),
            Err(LedgerError::AmountOverflow { .. })
        ));
        assert_eq!(pos.quantity(), 2);
    }

    #[test]
    fn reduce_keeps_average() {
        let mut pos = Position::new("AAPL", 20, dec!(55)).unwrap();
        pos.reduce(15);
        assert_eq!(pos.quantity(), 5);
        assert_eq!(pos.avg_price(), dec!(55));
    }

    #[test]
    fn deserialize_validates() {
        let ok: Position =
            serde_json::from_str(r#"{"symbol":"AAPL","quantity":3,"avg_price":"12.5"}"#).unwrap();
        assert_eq!(ok.avg_price(), dec!(12.5));

        let bad = serde_json::from_str::<Position>(
            r#"{"symbol":"AAPL","quantity":0,"avg_price":"12.5"}"#,
        );
        assert!(bad.is_err());
    }
}
