//! Market-data provider port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::candle::Candle;
use crate::domain::error::MarketDataError;

/// Descriptive data for one instrument. Numeric fields are optional because
/// providers frequently omit them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
}

impl CompanyProfile {
    pub fn unknown() -> Self {
        CompanyProfile {
            name: "Unknown Company".to_string(),
            fifty_two_week_high: None,
            fifty_two_week_low: None,
            market_cap: None,
            pe_ratio: None,
        }
    }
}

/// Source of raw OHLC history, quotes and profiles.
///
/// Implementations may be slow or fail; callers bound every call with a
/// timeout and never treat an error as fatal.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Bars for `period` (e.g. "1d") sampled at `interval` (e.g. "1m"),
    /// oldest first. An empty vector means the provider had nothing.
    async fn fetch_history(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> Result<Vec<Candle>, MarketDataError>;

    async fn fetch_quote(&self, symbol: &str) -> Result<f64, MarketDataError>;

    async fn fetch_profile(&self, symbol: &str) -> Result<CompanyProfile, MarketDataError>;
}
