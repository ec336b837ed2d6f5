//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::csv_adapter::CsvMarketData;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_store_adapter::JsonStoreAdapter;
use crate::adapters::log_notifier::LogNotifier;
use crate::domain::account::{Account, DEFAULT_STARTING_CASH, normalize_symbol};
use crate::domain::alert;
use crate::domain::config_validation::{
    validate_account_config, validate_market_data_config, validate_simulator_config,
};
use crate::domain::error::SimtraderError;
use crate::domain::history;
use crate::domain::simulator::{PriceSimulator, SimulatorConfig};
use crate::ports::account_store_port::AccountStorePort;
use crate::ports::config_port::ConfigPort;
use crate::service::desk::{SharedAccount, TradingDesk};
use crate::service::quote_cache::{QuoteCache, QuoteCacheConfig};
use crate::service::session::SessionConfig;

#[derive(Parser, Debug)]
#[command(name = "simtrader", about = "Paper-trading accounts over simulated market data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a new account with the configured starting cash
    Register {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        account: String,
    },
    /// Buy shares at the current market price
    Buy {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        account: String,
        #[arg(short, long)]
        symbol: String,
        #[arg(short, long)]
        quantity: u64,
    },
    /// Sell shares at the current market price
    Sell {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        account: String,
        #[arg(short, long)]
        symbol: String,
        #[arg(short, long)]
        quantity: u64,
    },
    /// Show holdings valued at market
    Portfolio {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        account: String,
    },
    /// Show the transaction log with realized P&L
    History {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        account: String,
    },
    /// Arm a price alert
    AlertAdd {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        account: String,
        #[arg(short, long)]
        symbol: String,
        #[arg(short, long)]
        target: Decimal,
    },
    /// Evaluate active alerts against current prices
    AlertsCheck {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        account: String,
    },
    /// Add a symbol to the watchlist
    WatchAdd {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        account: String,
        #[arg(short, long)]
        symbol: String,
    },
    /// Remove a symbol from the watchlist
    WatchRemove {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        account: String,
        #[arg(short, long)]
        symbol: String,
    },
    /// Show watchlist prices and company details
    Watchlist {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        account: String,
    },
    /// Run a trading session and print the simulated candles
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        symbol: String,
        #[arg(short, long, default_value_t = 10)]
        ticks: u32,
    },
}

impl Command {
    fn config_path(&self) -> &Path {
        match self {
            Command::Register { config, .. }
            | Command::Buy { config, .. }
            | Command::Sell { config, .. }
            | Command::Portfolio { config, .. }
            | Command::History { config, .. }
            | Command::AlertAdd { config, .. }
            | Command::AlertsCheck { config, .. }
            | Command::WatchAdd { config, .. }
            | Command::WatchRemove { config, .. }
            | Command::Watchlist { config, .. }
            | Command::Simulate { config, .. } => config,
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(dispatch(cli.command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "simtrader=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Everything a command needs, built once from the config file.
pub struct App {
    pub config: FileConfigAdapter,
    pub store: JsonStoreAdapter,
    pub desk: TradingDesk,
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SimtraderError> {
    eprintln!("Loading config from {}", path.display());
    let config = FileConfigAdapter::from_file(path)?;
    validate_account_config(&config)?;
    validate_simulator_config(&config)?;
    validate_market_data_config(&config)?;
    Ok(config)
}

pub fn build_app(config: FileConfigAdapter) -> Result<App, SimtraderError> {
    let data_dir = config
        .get_string("market_data", "data_dir")
        .ok_or_else(|| SimtraderError::ConfigMissing {
            section: "market_data".into(),
            key: "data_dir".into(),
        })?;
    let store_path = config.get_string_or("store", "path", "accounts.json");

    let provider = Arc::new(CsvMarketData::new(PathBuf::from(data_dir)));
    let quotes = Arc::new(QuoteCache::new(provider, build_quote_cache_config(&config)));
    let desk = TradingDesk::new(
        quotes,
        Arc::new(LogNotifier),
        PriceSimulator::new(build_simulator_config(&config)),
        build_session_config(&config),
    );

    Ok(App {
        store: JsonStoreAdapter::new(PathBuf::from(store_path)),
        desk,
        config,
    })
}

/// `[account] starting_cash`, parsed as an exact decimal.
pub fn starting_cash(config: &dyn ConfigPort) -> Result<Decimal, SimtraderError> {
    match config.get_string("account", "starting_cash") {
        None => Ok(DEFAULT_STARTING_CASH),
        Some(raw) => match raw.trim().parse::<Decimal>() {
            Ok(value) if value > Decimal::ZERO => Ok(value),
            _ => Err(SimtraderError::ConfigInvalid {
                section: "account".into(),
                key: "starting_cash".into(),
                reason: format!("expected a positive amount, got {raw:?}"),
            }),
        },
    }
}

pub fn build_simulator_config(config: &dyn ConfigPort) -> SimulatorConfig {
    let defaults = SimulatorConfig::default();
    SimulatorConfig {
        volatility_scale: config.get_double("simulator", "volatility_scale", defaults.volatility_scale),
        volatility_floor: config.get_double("simulator", "volatility_floor", defaults.volatility_floor),
        default_volatility: config.get_double(
            "simulator",
            "default_volatility",
            defaults.default_volatility,
        ),
        close_scale: config.get_double("simulator", "close_scale", defaults.close_scale),
    }
}

pub fn build_quote_cache_config(config: &dyn ConfigPort) -> QuoteCacheConfig {
    let defaults = QuoteCacheConfig::default();
    QuoteCacheConfig {
        ttl: Duration::from_secs(config.get_int("market_data", "ttl_secs", 60).max(0) as u64),
        fetch_timeout: Duration::from_millis(
            config.get_int("market_data", "fetch_timeout_ms", 5000).max(1) as u64,
        ),
        period: config.get_string_or("market_data", "period", &defaults.period),
        interval: config.get_string_or("market_data", "interval", &defaults.interval),
    }
}

pub fn build_session_config(config: &dyn ConfigPort) -> SessionConfig {
    SessionConfig {
        window_size: config.get_int("simulator", "window_size", 60).max(1) as usize,
        tick_interval: Duration::from_millis(
            config.get_int("simulator", "tick_interval_ms", 1000).max(1) as u64,
        ),
        seed: config
            .get_string("simulator", "seed")
            .and_then(|s| s.trim().parse::<u64>().ok()),
    }
}

pub fn load_account(store: &dyn AccountStorePort, account_id: &str) -> Result<Account, SimtraderError> {
    store
        .load(account_id)?
        .ok_or_else(|| SimtraderError::UnknownAccount(account_id.to_string()))
}

async fn dispatch(command: Command) -> Result<(), SimtraderError> {
    let config = load_config(command.config_path())?;
    let app = build_app(config)?;

    match command {
        Command::Register { account, .. } => run_register(&app, &account),
        Command::Buy {
            account,
            symbol,
            quantity,
            ..
        } => run_order(&app, &account, &symbol, quantity, true).await,
        Command::Sell {
            account,
            symbol,
            quantity,
            ..
        } => run_order(&app, &account, &symbol, quantity, false).await,
        Command::Portfolio { account, .. } => run_portfolio(&app, &account).await,
        Command::History { account, .. } => run_history(&app, &account),
        Command::AlertAdd {
            account,
            symbol,
            target,
            ..
        } => run_alert_add(&app, &account, &symbol, target),
        Command::AlertsCheck { account, .. } => run_alerts_check(&app, &account).await,
        Command::WatchAdd {
            account, symbol, ..
        } => run_watch_edit(&app, &account, &symbol, true),
        Command::WatchRemove {
            account, symbol, ..
        } => run_watch_edit(&app, &account, &symbol, false),
        Command::Watchlist { account, .. } => run_watchlist(&app, &account).await,
        Command::Simulate { symbol, ticks, .. } => run_simulate(&app, &symbol, ticks).await,
    }
}

fn run_register(app: &App, account_id: &str) -> Result<(), SimtraderError> {
    if app.store.load(account_id)?.is_some() {
        return Err(SimtraderError::AccountExists(account_id.to_string()));
    }
    let cash = starting_cash(&app.config)?;
    let account = Account::new(account_id, cash);
    app.store.save(&account)?;
    println!("Registered {} with {:.2} cash", account.id(), account.cash_balance());
    Ok(())
}

async fn run_order(
    app: &App,
    account_id: &str,
    symbol: &str,
    quantity: u64,
    buy: bool,
) -> Result<(), SimtraderError> {
    let shared = SharedAccount::new(load_account(&app.store, account_id)?);
    let execution = if buy {
        app.desk.buy_at_market(&shared, symbol, quantity).await?
    } else {
        app.desk.sell_at_market(&shared, symbol, quantity).await?
    };
    let account = shared.snapshot().await;
    app.store.save(&account)?;

    let tx = &execution.transaction;
    println!(
        "{} {} {} @ {} (total {:.2})",
        tx.action(),
        tx.quantity(),
        tx.symbol(),
        tx.price(),
        tx.total()
    );
    if let Some(pnl) = execution.realized_pnl {
        println!("Realized P&L: {pnl:.2}");
    }
    println!("Cash balance: {:.2}", account.cash_balance());
    Ok(())
}

async fn run_portfolio(app: &App, account_id: &str) -> Result<(), SimtraderError> {
    let shared = SharedAccount::new(load_account(&app.store, account_id)?);
    let stats = app.desk.portfolio_stats(&shared).await;

    println!("=== Portfolio: {account_id} ===");
    for row in &stats.breakdown {
        println!(
            "  {:<8} {:>8} avg {:>10.4} now {:>10.4} value {:>12.2} P&L {:>10.2}",
            row.symbol, row.quantity, row.avg_price, row.current_price, row.value, row.profit_loss
        );
    }
    println!("Holdings:     {} symbols, {} shares", stats.total_assets, stats.total_shares);
    println!("Market value: {:.2}", stats.portfolio_value);
    println!("Cash:         {:.2}", stats.cash_balance);
    println!("Equity:       {:.2}", stats.total_equity());
    println!("Unrealized:   {:.2}", stats.net_profit_loss);
    Ok(())
}

fn run_history(app: &App, account_id: &str) -> Result<(), SimtraderError> {
    let account = load_account(&app.store, account_id)?;
    let entries = history::realized_pnl_for(&account);
    if entries.is_empty() {
        println!("No transactions");
        return Ok(());
    }
    for entry in &entries {
        let tx = &entry.transaction;
        println!(
            "{}  {:<4} {:<8} {:>8} @ {:>10.4}  P&L {:.2}",
            tx.timestamp().format("%Y-%m-%d %H:%M:%S"),
            tx.action(),
            tx.symbol(),
            tx.quantity(),
            tx.price(),
            entry.profit_loss
        );
    }
    println!("Total realized: {:.2}", history::total_realized_pnl(&account));
    Ok(())
}

fn run_alert_add(
    app: &App,
    account_id: &str,
    symbol: &str,
    target: Decimal,
) -> Result<(), SimtraderError> {
    let mut account = load_account(&app.store, account_id)?;
    let added = alert::add_alert(&mut account, symbol, target)?;
    app.store.save(&account)?;
    if added {
        println!("Alert armed: {} at {}", normalize_symbol(symbol), target);
    } else {
        println!("Alert already active: {} at {}", normalize_symbol(symbol), target);
    }
    Ok(())
}

async fn run_alerts_check(app: &App, account_id: &str) -> Result<(), SimtraderError> {
    let shared = SharedAccount::new(load_account(&app.store, account_id)?);
    let triggered = app.desk.check_alerts(&shared).await;
    app.store.save(&shared.snapshot().await)?;

    if triggered.is_empty() {
        println!("No alerts triggered");
    }
    for event in &triggered {
        println!(
            "{} reached {} (target {})",
            event.symbol, event.current_price, event.target_price
        );
    }
    Ok(())
}

fn run_watch_edit(app: &App, account_id: &str, symbol: &str, add: bool) -> Result<(), SimtraderError> {
    let mut account = load_account(&app.store, account_id)?;
    let changed = if add {
        account.add_to_watchlist(symbol)
    } else {
        account.remove_from_watchlist(symbol)
    };
    if changed {
        app.store.save(&account)?;
    }
    println!("Watchlist: {}", account.watchlist().join(", "));
    Ok(())
}

async fn run_watchlist(app: &App, account_id: &str) -> Result<(), SimtraderError> {
    let shared = SharedAccount::new(load_account(&app.store, account_id)?);
    let rows = app.desk.watchlist_quotes(&shared).await;
    if rows.is_empty() {
        println!("Watchlist is empty");
    }
    for row in &rows {
        let range = match (row.profile.fifty_two_week_low, row.profile.fifty_two_week_high) {
            (Some(lo), Some(hi)) => format!("52w {lo:.2}-{hi:.2}"),
            _ => "52w n/a".to_string(),
        };
        println!("{:<8} {:>10.2}  {}  {}", row.symbol, row.price, row.profile.name, range);
    }
    Ok(())
}

async fn run_simulate(app: &App, symbol: &str, ticks: u32) -> Result<(), SimtraderError> {
    let tick = build_session_config(&app.config).tick_interval;
    eprintln!("Simulating {} for {} ticks", normalize_symbol(symbol), ticks);

    app.desk.start_trading(symbol).await;
    tokio::time::sleep(tick * ticks + tick / 2).await;
    let candles = app.desk.stop_trading(symbol).await.unwrap_or_default();

    let shown = candles.len().saturating_sub(ticks as usize);
    for candle in &candles[shown..] {
        println!(
            "{}  O {:>10.4}  H {:>10.4}  L {:>10.4}  C {:>10.4}",
            candle.time.format("%H:%M:%S"),
            candle.open,
            candle.high,
            candle.low,
            candle.close
        );
    }
    Ok(())
}
