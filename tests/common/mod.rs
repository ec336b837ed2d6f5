#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use simtrader::domain::account::Account;
use simtrader::domain::alert::AlertTriggered;
pub use simtrader::domain::candle::Candle;
use simtrader::domain::error::{MarketDataError, SimtraderError};
use simtrader::ports::account_store_port::AccountStorePort;
use simtrader::ports::market_data_port::{CompanyProfile, MarketDataPort};
use simtrader::ports::notification_port::{NotificationPort, NotifyError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct MockMarketData {
    pub series: HashMap<String, Vec<Candle>>,
    pub quotes: HashMap<String, f64>,
    pub profiles: HashMap<String, CompanyProfile>,
    pub errors: HashMap<String, String>,
    pub calls: AtomicUsize,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            quotes: HashMap::new(),
            profiles: HashMap::new(),
            errors: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_series(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.series.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_quote(mut self, symbol: &str, price: f64) -> Self {
        self.quotes.insert(symbol.to_string(), price);
        self
    }

    pub fn with_profile(mut self, symbol: &str, profile: CompanyProfile) -> Self {
        self.profiles.insert(symbol.to_string(), profile);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, symbol: &str) -> Result<(), MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.errors.get(symbol) {
            Some(reason) => Err(MarketDataError::ProviderUnavailable {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MarketDataPort for MockMarketData {
    async fn fetch_history(
        &self,
        symbol: &str,
        _period: &str,
        _interval: &str,
    ) -> Result<Vec<Candle>, MarketDataError> {
        self.check(symbol)?;
        Ok(self.series.get(symbol).cloned().unwrap_or_default())
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<f64, MarketDataError> {
        self.check(symbol)?;
        self.quotes
            .get(symbol)
            .copied()
            .ok_or_else(|| MarketDataError::UnknownSymbol(symbol.to_string()))
    }

    async fn fetch_profile(&self, symbol: &str) -> Result<CompanyProfile, MarketDataError> {
        self.check(symbol)?;
        self.profiles
            .get(symbol)
            .cloned()
            .ok_or_else(|| MarketDataError::UnknownSymbol(symbol.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<AlertTriggered>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<AlertTriggered> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn notify(&self, event: &AlertTriggered) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub accounts: Mutex<HashMap<String, Account>>,
}

impl AccountStorePort for MemoryStore {
    fn load(&self, account_id: &str) -> Result<Option<Account>, SimtraderError> {
        Ok(self.accounts.lock().unwrap().get(account_id).cloned())
    }

    fn save(&self, account: &Account) -> Result<(), SimtraderError> {
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id().to_string(), account.clone());
        Ok(())
    }

    fn list_accounts(&self) -> Result<Vec<String>, SimtraderError> {
        let mut ids: Vec<String> = self.accounts.lock().unwrap().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap()
}

pub fn make_candle(minute: i64, close: f64) -> Candle {
    Candle {
        time: base_time() + Duration::minutes(minute),
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
    }
}

pub fn make_series(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, c)| make_candle(i as i64, *c))
        .collect()
}
