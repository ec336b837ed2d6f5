//! CSV file market-data adapter.
//!
//! Reads `<SYMBOL>.csv` files (columns `time,open,high,low,close`, extra
//! columns ignored) and an optional `profiles.csv` from one directory.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::account::normalize_symbol;
use crate::domain::candle::Candle;
use crate::domain::error::MarketDataError;
use crate::ports::market_data_port::{CompanyProfile, MarketDataPort};

pub const PROFILES_FILE: &str = "profiles.csv";

pub struct CsvMarketData {
    base_path: PathBuf,
}

#[derive(Deserialize)]
struct BarRow {
    #[serde(alias = "date", alias = "Datetime", alias = "Date")]
    time: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
}

#[derive(Deserialize)]
struct ProfileRow {
    symbol: String,
    name: String,
    fifty_two_week_high: Option<f64>,
    fifty_two_week_low: Option<f64>,
    market_cap: Option<f64>,
    pe_ratio: Option<f64>,
}

fn unavailable(reason: String) -> MarketDataError {
    MarketDataError::ProviderUnavailable { reason }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or a bare date.
pub fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(t.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Look-back span for a period string such as `1d`, `5d`, `1mo`, `1y`.
/// `max` and unrecognised strings mean the whole file.
pub fn period_span(period: &str) -> Option<Duration> {
    let period = period.trim().to_lowercase();
    let split = period.find(|c: char| !c.is_ascii_digit())?;
    let (count, unit) = period.split_at(split);
    let count: i64 = count.parse().ok()?;
    match unit {
        "m" => Some(Duration::minutes(count)),
        "h" => Some(Duration::hours(count)),
        "d" => Some(Duration::days(count)),
        "wk" => Some(Duration::weeks(count)),
        "mo" => Some(Duration::days(30 * count)),
        "y" => Some(Duration::days(365 * count)),
        _ => None,
    }
}

impl CsvMarketData {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", normalize_symbol(symbol)))
    }

    async fn read_bars(&self, symbol: &str) -> Result<Vec<Candle>, MarketDataError> {
        let path = self.csv_path(symbol);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MarketDataError::UnknownSymbol(normalize_symbol(symbol)));
            }
            Err(e) => {
                return Err(unavailable(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();
        for row in rdr.deserialize::<BarRow>() {
            let row = row.map_err(|e| unavailable(format!("CSV parse error: {}", e)))?;
            let time = parse_time(&row.time)
                .ok_or_else(|| unavailable(format!("invalid time value: {}", row.time)))?;
            bars.push(Candle {
                time,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
            });
        }

        bars.sort_by_key(|b| b.time);
        Ok(bars)
    }
}

#[async_trait]
impl MarketDataPort for CsvMarketData {
    async fn fetch_history(
        &self,
        symbol: &str,
        period: &str,
        _interval: &str,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let bars = self.read_bars(symbol).await?;
        let (Some(span), Some(last)) = (period_span(period), bars.last()) else {
            return Ok(bars);
        };
        let cutoff = last.time - span;
        Ok(bars.into_iter().filter(|b| b.time > cutoff).collect())
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<f64, MarketDataError> {
        self.read_bars(symbol)
            .await?
            .last()
            .map(|b| b.close)
            .ok_or_else(|| unavailable(format!("no bars for {}", normalize_symbol(symbol))))
    }

    async fn fetch_profile(&self, symbol: &str) -> Result<CompanyProfile, MarketDataError> {
        let path = self.base_path.join(PROFILES_FILE);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| unavailable(format!("failed to read {}: {}", path.display(), e)))?;

        let wanted = normalize_symbol(symbol);
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        for row in rdr.deserialize::<ProfileRow>() {
            let row = row.map_err(|e| unavailable(format!("CSV parse error: {}", e)))?;
            if normalize_symbol(&row.symbol) == wanted {
                return Ok(CompanyProfile {
                    name: row.name,
                    fifty_two_week_high: row.fifty_two_week_high,
                    fifty_two_week_low: row.fifty_two_week_low,
                    market_cap: row.market_cap,
                    pe_ratio: row.pe_ratio,
                });
            }
        }
        Err(MarketDataError::UnknownSymbol(wanted))
    }
}
