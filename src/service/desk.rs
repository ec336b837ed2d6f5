//! Order routing, alert sweeps and valuation against live prices.
//!
//! One desk owns the quote cache, the running sessions and the notifier.
//! Accounts are handed in as [`SharedAccount`] so each one has a single
//! writer while an operation runs.

use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::account::{Account, normalize_symbol};
use crate::domain::alert::{self, AlertTriggered};
use crate::domain::candle::Candle;
use crate::domain::error::LedgerError;
use crate::domain::ledger::{self, Execution, price_from_f64};
use crate::domain::simulator::PriceSimulator;
use crate::domain::valuation::{self, PortfolioStats};
use crate::ports::market_data_port::CompanyProfile;
use crate::ports::notification_port::NotificationPort;
use crate::service::quote_cache::QuoteCache;
use crate::service::session::{LivePrices, SessionConfig, TradingSession};

/// An account behind an async mutex; every mutation holds the lock.
#[derive(Debug, Clone)]
pub struct SharedAccount {
    inner: Arc<Mutex<Account>>,
}

impl SharedAccount {
    pub fn new(account: Account) -> Self {
        SharedAccount {
            inner: Arc::new(Mutex::new(account)),
        }
    }

    /// Clone of the current state, e.g. for persisting.
    pub async fn snapshot(&self) -> Account {
        self.inner.lock().await.clone()
    }

    pub async fn with<T>(&self, f: impl FnOnce(&mut Account) -> T) -> T {
        let mut guard = self.inner.lock().await;
        f(&mut guard)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatchRow {
    pub symbol: String,
    pub price: f64,
    pub profile: CompanyProfile,
}

pub struct TradingDesk {
    quotes: Arc<QuoteCache>,
    notifier: Arc<dyn NotificationPort>,
    simulator: PriceSimulator,
    session_config: SessionConfig,
    live: LivePrices,
    sessions: Mutex<HashMap<String, TradingSession>>,
}

impl TradingDesk {
    pub fn new(
        quotes: Arc<QuoteCache>,
        notifier: Arc<dyn NotificationPort>,
        simulator: PriceSimulator,
        session_config: SessionConfig,
    ) -> Self {
        TradingDesk {
            quotes,
            notifier,
            simulator,
            session_config,
            live: LivePrices::default(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Start a session for `symbol`. Returns false if one is already running.
    pub async fn start_trading(&self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&symbol) {
            return false;
        }
        let session = TradingSession::start(
            &symbol,
            &self.quotes,
            self.simulator.clone(),
            self.session_config.clone(),
            self.live.clone(),
        )
        .await;
        sessions.insert(symbol, session);
        true
    }

    /// Stop the session for `symbol` and return its final candles.
    ///
    /// The symbol's live price is dropped, so later orders price from the
    /// quote cache again.
    pub async fn stop_trading(&self, symbol: &str) -> Option<Vec<Candle>> {
        let symbol = normalize_symbol(symbol);
        let session = self.sessions.lock().await.remove(&symbol);
        match session {
            Some(mut session) => {
                session.stop().await;
                self.live.remove(&symbol).await;
                Some(session.candles().await)
            }
            None => None,
        }
    }

    pub async fn stop_all(&self) {
        let drained: Vec<TradingSession> = self
            .sessions
            .lock()
            .await
            .drain()
            .map(|(_, session)| session)
            .collect();
        for mut session in drained {
            session.stop().await;
            self.live.remove(session.symbol()).await;
        }
    }

    pub async fn session_candles(&self, symbol: &str) -> Option<Vec<Candle>> {
        let sessions = self.sessions.lock().await;
        match sessions.get(&normalize_symbol(symbol)) {
            Some(session) => Some(session.candles().await),
            None => None,
        }
    }

    /// Session last price if one is live, else the quote cache price.
    pub async fn market_price(&self, symbol: &str) -> Result<Decimal, LedgerError> {
        let symbol = normalize_symbol(symbol);
        let raw = match self.live.get(&symbol).await {
            Some(price) => price,
            None => self.quotes.get_price(&symbol).await,
        };
        price_from_f64(&symbol, raw)
    }

    pub async fn buy_at_market(
        &self,
        account: &SharedAccount,
        symbol: &str,
        quantity: u64,
    ) -> Result<Execution, LedgerError> {
        let price = self.market_price(symbol).await?;
        let result = account
            .with(|acct| ledger::execute_buy(acct, symbol, quantity, price))
            .await;
        log_execution("buy", symbol, quantity, price, &result);
        result
    }

    pub async fn sell_at_market(
        &self,
        account: &SharedAccount,
        symbol: &str,
        quantity: u64,
    ) -> Result<Execution, LedgerError> {
        let price = self.market_price(symbol).await?;
        let result = account
            .with(|acct| ledger::execute_sell(acct, symbol, quantity, price))
            .await;
        log_execution("sell", symbol, quantity, price, &result);
        result
    }

    /// Fire every alert at or above target and deliver the events.
    ///
    /// Triggered alerts are removed before delivery; a failed notification
    /// is logged and does not re-arm the alert.
    pub async fn check_alerts(&self, account: &SharedAccount) -> Vec<AlertTriggered> {
        let mut guard = account.inner.lock().await;
        let symbols: BTreeSet<String> = guard
            .alerts()
            .iter()
            .map(|a| a.symbol().to_string())
            .collect();

        let mut prices = HashMap::new();
        for symbol in symbols {
            match self.market_price(&symbol).await {
                Ok(price) => {
                    prices.insert(symbol, price);
                }
                Err(e) => tracing::warn!(symbol = %symbol, error = %e, "alert symbol left unpriced"),
            }
        }

        let triggered = alert::evaluate(&mut guard, |s| prices.get(s).copied());
        drop(guard);

        for event in &triggered {
            tracing::info!(
                account = %event.account_id,
                symbol = %event.symbol,
                price = %event.current_price,
                target = %event.target_price,
                "alert triggered"
            );
            if let Err(e) = self.notifier.notify(event).await {
                tracing::warn!(symbol = %event.symbol, error = %e, "alert notification failed");
            }
        }
        triggered
    }

    /// Value the account's holdings at current market prices.
    ///
    /// A symbol that cannot be priced is valued at its average cost.
    pub async fn portfolio_stats(&self, account: &SharedAccount) -> PortfolioStats {
        let snapshot = account.snapshot().await;
        let mut prices = HashMap::new();
        for position in snapshot.positions().values() {
            let price = match self.market_price(position.symbol()).await {
                Ok(price) => price,
                Err(e) => {
                    tracing::warn!(symbol = position.symbol(), error = %e, "valuing at cost");
                    position.avg_price()
                }
            };
            prices.insert(position.symbol().to_string(), price);
        }
        valuation::portfolio_stats(&snapshot, |s| prices.get(s).copied().unwrap_or_default())
    }

    pub async fn watchlist_quotes(&self, account: &SharedAccount) -> Vec<WatchRow> {
        let symbols = account.with(|acct| acct.watchlist().to_vec()).await;
        let mut rows = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let price = match self.live.get(&symbol).await {
                Some(price) => price,
                None => self.quotes.get_price(&symbol).await,
            };
            let profile = self.quotes.get_profile(&symbol).await;
            rows.push(WatchRow {
                symbol,
                price,
                profile,
            });
        }
        rows
    }
}

fn log_execution(
    side: &str,
    symbol: &str,
    quantity: u64,
    price: Decimal,
    result: &Result<Execution, LedgerError>,
) {
    match result {
        Ok(execution) => tracing::info!(
            side,
            symbol = execution.transaction.symbol(),
            quantity,
            price = %price,
            "order filled"
        ),
        Err(e) => tracing::warn!(side, symbol, quantity, price = %price, error = %e, "order rejected"),
    }
}
