//! Memoizing front for the market-data provider.
//!
//! Series and quotes are cached per key for a fixed time-to-live; profiles
//! are cached until [`QuoteCache::clear`]. Fetches for one key are
//! serialized, so concurrent callers wait for the in-flight fetch instead of
//! issuing their own. Every provider call is bounded by a timeout, and any
//! failure degrades to placeholder data instead of an error.

use chrono::Utc;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, timeout};

use crate::domain::candle::Candle;
use crate::domain::error::MarketDataError;
use crate::ports::market_data_port::{CompanyProfile, MarketDataPort};

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteCacheConfig {
    pub ttl: Duration,
    pub fetch_timeout: Duration,
    /// Series used when only a price is needed.
    pub period: String,
    pub interval: String,
}

impl Default for QuoteCacheConfig {
    fn default() -> Self {
        QuoteCacheConfig {
            ttl: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(5),
            period: "1d".to_string(),
            interval: "1m".to_string(),
        }
    }
}

struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

type Slot<V> = Arc<Mutex<Option<Entry<V>>>>;

/// Per-key slots; holding a slot's lock marks a fetch in progress.
struct Slots<K, V> {
    map: Mutex<HashMap<K, Slot<V>>>,
}

impl<K: Eq + Hash, V> Slots<K, V> {
    fn new() -> Self {
        Slots {
            map: Mutex::new(HashMap::new()),
        }
    }

    async fn slot(&self, key: K) -> Slot<V> {
        self.map.lock().await.entry(key).or_default().clone()
    }

    async fn clear(&self) {
        self.map.lock().await.clear();
    }
}

fn placeholder_series() -> Vec<Candle> {
    vec![Candle::placeholder(Utc::now())]
}

pub struct QuoteCache {
    provider: Arc<dyn MarketDataPort>,
    config: QuoteCacheConfig,
    series: Slots<(String, String, String), Vec<Candle>>,
    quotes: Slots<String, f64>,
    profiles: Slots<String, CompanyProfile>,
}

impl QuoteCache {
    pub fn new(provider: Arc<dyn MarketDataPort>, config: QuoteCacheConfig) -> Self {
        QuoteCache {
            provider,
            config,
            series: Slots::new(),
            quotes: Slots::new(),
            profiles: Slots::new(),
        }
    }

    fn is_fresh<V>(&self, entry: &Entry<V>) -> bool {
        entry.fetched_at.elapsed() < self.config.ttl
    }

    async fn bounded<T, F>(&self, symbol: &str, fut: F) -> Result<T, MarketDataError>
    where
        F: std::future::Future<Output = Result<T, MarketDataError>>,
    {
        timeout(self.config.fetch_timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(MarketDataError::Timeout {
                    symbol: symbol.to_string(),
                    millis: self.config.fetch_timeout.as_millis() as u64,
                })
            })
    }

    /// OHLC series for `(symbol, period, interval)`, never empty.
    pub async fn get_series(&self, symbol: &str, period: &str, interval: &str) -> Vec<Candle> {
        let key = (symbol.to_string(), period.to_string(), interval.to_string());
        let slot = self.series.slot(key).await;
        let mut cached = slot.lock().await;
        if let Some(entry) = cached.as_ref().filter(|e| self.is_fresh(e)) {
            return entry.value.clone();
        }

        let fetched = self
            .bounded(symbol, self.provider.fetch_history(symbol, period, interval))
            .await;
        let value = match fetched {
            Ok(bars) if !bars.is_empty() => {
                tracing::debug!(symbol, period, interval, bars = bars.len(), "series fetched");
                bars
            }
            Ok(_) => {
                tracing::warn!(symbol, period, interval, "no data from provider, using placeholder");
                placeholder_series()
            }
            Err(e) => {
                tracing::warn!(symbol, period, interval, error = %e, "series fetch failed, using placeholder");
                return placeholder_series();
            }
        };
        *cached = Some(Entry {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        value
    }

    /// Series for the configured default period and interval.
    pub async fn get_default_series(&self, symbol: &str) -> Vec<Candle> {
        let (period, interval) = (self.config.period.clone(), self.config.interval.clone());
        self.get_series(symbol, &period, &interval).await
    }

    /// Latest price: a live quote when the provider has one, else the last
    /// close of the default series (which may be the placeholder).
    pub async fn get_price(&self, symbol: &str) -> f64 {
        let slot = self.quotes.slot(symbol.to_string()).await;
        let mut cached = slot.lock().await;
        if let Some(entry) = cached.as_ref().filter(|e| self.is_fresh(e)) {
            return entry.value;
        }

        match self.bounded(symbol, self.provider.fetch_quote(symbol)).await {
            Ok(price) if price.is_finite() && price > 0.0 => {
                *cached = Some(Entry {
                    value: price,
                    fetched_at: Instant::now(),
                });
                price
            }
            outcome => {
                if let Err(e) = outcome {
                    tracing::debug!(symbol, error = %e, "quote unavailable, using series close");
                }
                drop(cached);
                self.get_default_series(symbol)
                    .await
                    .last()
                    .map_or(Candle::placeholder(Utc::now()).close, |c| c.close)
            }
        }
    }

    /// Descriptive profile; a failed lookup caches "Unknown Company".
    pub async fn get_profile(&self, symbol: &str) -> CompanyProfile {
        let slot = self.profiles.slot(symbol.to_string()).await;
        let mut cached = slot.lock().await;
        if let Some(entry) = cached.as_ref() {
            return entry.value.clone();
        }

        let profile = match self.bounded(symbol, self.provider.fetch_profile(symbol)).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(symbol, error = %e, "profile lookup failed");
                CompanyProfile::unknown()
            }
        };
        *cached = Some(Entry {
            value: profile.clone(),
            fetched_at: Instant::now(),
        });
        profile
    }

    /// Drop every cached value.
    pub async fn clear(&self) {
        self.series.clear().await;
        self.quotes.clear().await;
        self.profiles.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingProvider {
        history_calls: AtomicUsize,
        quote_calls: AtomicUsize,
        profile_calls: AtomicUsize,
        fail: bool,
        empty: bool,
        stall: bool,
    }

    #[async_trait]
    impl MarketDataPort for CountingProvider {
        async fn fetch_history(
            &self,
            _symbol: &str,
            _period: &str,
            _interval: &str,
        ) -> Result<Vec<Candle>, MarketDataError> {
            let n = self.history_calls.fetch_add(1, Ordering::SeqCst);
            if self.stall {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.fail {
                return Err(MarketDataError::ProviderUnavailable {
                    reason: "down".into(),
                });
            }
            if self.empty {
                return Ok(Vec::new());
            }
            let mut c = Candle::placeholder(Utc::now());
            c.close = 200.0 + n as f64;
            c.high = c.close + 1.0;
            Ok(vec![c])
        }

        async fn fetch_quote(&self, _symbol: &str) -> Result<f64, MarketDataError> {
            self.quote_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MarketDataError::UnknownSymbol("ZZZ".into()));
            }
            Ok(321.5)
        }

        async fn fetch_profile(&self, _symbol: &str) -> Result<CompanyProfile, MarketDataError> {
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MarketDataError::UnknownSymbol("ZZZ".into()));
            }
            Ok(CompanyProfile {
                name: "Apple Inc.".into(),
                ..CompanyProfile::unknown()
            })
        }
    }

    fn cache(provider: Arc<CountingProvider>) -> QuoteCache {
        QuoteCache::new(provider, QuoteCacheConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn within_ttl_hits_cache() {
        let provider = Arc::new(CountingProvider::default());
        let cache = cache(provider.clone());

        let first = cache.get_series("AAPL", "1d", "1m").await;
        tokio::time::advance(Duration::from_secs(59)).await;
        let second = cache.get_series("AAPL", "1d", "1m").await;

        assert_eq!(first, second);
        assert_eq!(provider.history_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_triggers_one_refetch() {
        let provider = Arc::new(CountingProvider::default());
        let cache = cache(provider.clone());

        cache.get_series("AAPL", "1d", "1m").await;
        tokio::time::advance(Duration::from_secs(61)).await;
        let refreshed = cache.get_series("AAPL", "1d", "1m").await;
        let again = cache.get_series("AAPL", "1d", "1m").await;

        assert_eq!(refreshed[0].close, 201.0);
        assert_eq!(again, refreshed);
        assert_eq!(provider.history_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let provider = Arc::new(CountingProvider::default());
        let cache = cache(provider.clone());

        cache.get_series("AAPL", "1d", "1m").await;
        cache.get_series("AAPL", "5d", "1m").await;
        cache.get_series("MSFT", "1d", "1m").await;
        assert_eq!(provider.history_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_yields_uncached_placeholder() {
        let provider = Arc::new(CountingProvider {
            fail: true,
            ..Default::default()
        });
        let cache = cache(provider.clone());

        let series = cache.get_series("AAPL", "1d", "1m").await;
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].close, 100.2);

        cache.get_series("AAPL", "1d", "1m").await;
        assert_eq!(provider.history_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_result_caches_placeholder() {
        let provider = Arc::new(CountingProvider {
            empty: true,
            ..Default::default()
        });
        let cache = cache(provider.clone());

        let series = cache.get_series("AAPL", "1d", "1m").await;
        assert_eq!(series[0].open, 100.0);
        cache.get_series("AAPL", "1d", "1m").await;
        assert_eq!(provider.history_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_provider_times_out_to_placeholder() {
        let provider = Arc::new(CountingProvider {
            stall: true,
            ..Default::default()
        });
        let cache = cache(provider.clone());

        let series = cache.get_series("AAPL", "1d", "1m").await;
        assert_eq!(series[0].close, 100.2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_fetch() {
        let provider = Arc::new(CountingProvider::default());
        let cache = Arc::new(cache(provider.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_series("AAPL", "1d", "1m").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(provider.history_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn price_prefers_quote() {
        let provider = Arc::new(CountingProvider::default());
        let cache = cache(provider.clone());

        assert_eq!(cache.get_price("AAPL").await, 321.5);
        assert_eq!(cache.get_price("AAPL").await, 321.5);
        assert_eq!(provider.quote_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.history_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn price_falls_back_to_placeholder_close() {
        let provider = Arc::new(CountingProvider {
            fail: true,
            ..Default::default()
        });
        let cache = cache(provider);
        assert_eq!(cache.get_price("ZZZ").await, 100.2);
    }

    #[tokio::test(start_paused = true)]
    async fn profile_cached_including_fallback() {
        let provider = Arc::new(CountingProvider {
            fail: true,
            ..Default::default()
        });
        let cache = cache(provider.clone());

        assert_eq!(cache.get_profile("ZZZ").await.name, "Unknown Company");
        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(cache.get_profile("ZZZ").await.name, "Unknown Company");
        assert_eq!(provider.profile_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_forces_refetch() {
        let provider = Arc::new(CountingProvider::default());
        let cache = cache(provider.clone());

        assert_eq!(cache.get_profile("AAPL").await.name, "Apple Inc.");
        cache.get_series("AAPL", "1d", "1m").await;
        cache.clear().await;
        cache.get_profile("AAPL").await;
        cache.get_series("AAPL", "1d", "1m").await;

        assert_eq!(provider.profile_calls.load(Ordering::SeqCst), 2);
        assert_eq!(provider.history_calls.load(Ordering::SeqCst), 2);
    }
}
