//! Background candle generation for one symbol.
//!
//! A session seeds its window from the quote cache, then a spawned task
//! appends one simulated candle per tick until [`TradingSession::stop`].
//! Only the session's own task writes its window.

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;

use crate::domain::account::normalize_symbol;
use crate::domain::candle::{Candle, CandleWindow, DEFAULT_WINDOW_SIZE};
use crate::domain::simulator::PriceSimulator;
use crate::service::quote_cache::QuoteCache;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub window_size: usize,
    pub tick_interval: Duration,
    /// Fixed RNG seed; entropy when None.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            window_size: DEFAULT_WINDOW_SIZE,
            tick_interval: Duration::from_secs(1),
            seed: None,
        }
    }
}

/// Most recent simulated price per symbol, shared by all sessions.
#[derive(Debug, Clone, Default)]
pub struct LivePrices {
    inner: Arc<RwLock<HashMap<String, f64>>>,
}

impl LivePrices {
    pub async fn get(&self, symbol: &str) -> Option<f64> {
        self.inner.read().await.get(&normalize_symbol(symbol)).copied()
    }

    pub async fn set(&self, symbol: &str, price: f64) {
        self.inner
            .write()
            .await
            .insert(normalize_symbol(symbol), price);
    }

    pub async fn remove(&self, symbol: &str) {
        self.inner.write().await.remove(&normalize_symbol(symbol));
    }
}

pub struct TradingSession {
    symbol: String,
    window: Arc<RwLock<CandleWindow>>,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl TradingSession {
    /// Seed from the quote cache and begin ticking.
    pub async fn start(
        symbol: &str,
        quotes: &QuoteCache,
        simulator: PriceSimulator,
        config: SessionConfig,
        live: LivePrices,
    ) -> Self {
        let symbol = normalize_symbol(symbol);
        let seed = quotes.get_default_series(&symbol).await;
        let window = CandleWindow::from_series(config.window_size, &seed);
        if let Some(close) = window.last_close() {
            live.set(&symbol, close).await;
        }
        tracing::info!(
            symbol = %symbol,
            seeded = window.len(),
            tick_ms = config.tick_interval.as_millis() as u64,
            "trading session started"
        );

        let window = Arc::new(RwLock::new(window));
        let (stop_tx, stop_rx) = watch::channel(false);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let task = tokio::spawn(run_ticks(
            symbol.clone(),
            window.clone(),
            simulator,
            config.tick_interval,
            rng,
            live,
            stop_rx,
        ));

        TradingSession {
            symbol,
            window,
            stop_tx,
            task: Some(task),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Snapshot of the window, oldest first.
    pub async fn candles(&self) -> Vec<Candle> {
        self.window.read().await.to_vec()
    }

    pub async fn last_price(&self) -> Option<f64> {
        self.window.read().await.last_close()
    }

    /// Signal the task and wait for it; no candle is appended afterwards.
    pub async fn stop(&mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(symbol = %self.symbol, error = %e, "session task ended abnormally");
            }
            tracing::info!(symbol = %self.symbol, "trading session stopped");
        }
    }
}

impl Drop for TradingSession {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}

async fn run_ticks(
    symbol: String,
    window: Arc<RwLock<CandleWindow>>,
    simulator: PriceSimulator,
    tick_interval: Duration,
    mut rng: StdRng,
    live: LivePrices,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // interval fires immediately; the first candle comes one period later
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let mut guard = window.write().await;
                if *stop_rx.borrow() {
                    break;
                }
                let candle = simulator.advance(&mut rng, &symbol, Utc::now(), &mut guard);
                drop(guard);
                live.set(&symbol, candle.close).await;
            }
        }
    }
}
