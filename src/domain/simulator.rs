//! Synthetic price simulation.
//!
//! Each call derives one candle from the previous close and a volatility
//! estimate taken from recent history. The simulator carries no state between
//! calls apart from its configuration; randomness comes from the caller's RNG
//! or the thread-local one.

use chrono::{DateTime, Utc};
use rand::Rng;

use super::candle::{Candle, CandleWindow};

/// Prices never fall below one cent.
pub const MIN_PRICE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Fraction of the recent high-low range used as volatility.
    pub volatility_scale: f64,
    /// Lower bound applied to the scaled range.
    pub volatility_floor: f64,
    /// Used when history is flat or absent.
    pub default_volatility: f64,
    /// Close moves within +/- volatility * close_scale of the open.
    pub close_scale: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            volatility_scale: 0.1,
            volatility_floor: 0.01,
            default_volatility: 1.0,
            close_scale: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PriceSimulator {
    config: SimulatorConfig,
}

impl PriceSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        PriceSimulator { config }
    }

    /// max((high - low) * scale, floor), or the default for flat/absent history.
    pub fn volatility(&self, recent_high: Option<f64>, recent_low: Option<f64>) -> f64 {
        match (recent_high, recent_low) {
            (Some(high), Some(low)) if high.is_finite() && low.is_finite() && high > low => {
                ((high - low) * self.config.volatility_scale).max(self.config.volatility_floor)
            }
            _ => self.config.default_volatility,
        }
    }

    /// Next candle using the thread-local random source.
    pub fn next_candle(
        &self,
        symbol: &str,
        previous_close: f64,
        recent_high: Option<f64>,
        recent_low: Option<f64>,
    ) -> Candle {
        self.next_candle_with(
            &mut rand::thread_rng(),
            symbol,
            Utc::now(),
            previous_close,
            recent_high,
            recent_low,
        )
    }

    pub fn next_candle_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        symbol: &str,
        time: DateTime<Utc>,
        previous_close: f64,
        recent_high: Option<f64>,
        recent_low: Option<f64>,
    ) -> Candle {
        let v = self.volatility(recent_high, recent_low);
        let half = v * self.config.close_scale;

        let open = previous_close.max(MIN_PRICE);
        let close = (open + rng.gen_range(-half..=half)).max(MIN_PRICE);
        let high = (open + rng.gen_range(0.0..=v)).max(open).max(close);
        let low = (open - rng.gen_range(0.0..=v))
            .min(open)
            .min(close)
            .max(MIN_PRICE);

        tracing::trace!(symbol, open, high, low, close, volatility = v, "simulated candle");

        Candle {
            time,
            open,
            high,
            low,
            close,
        }
    }

    /// Advance a window by one candle seeded from its own history.
    ///
    /// An empty window starts from the placeholder close.
    pub fn advance<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        symbol: &str,
        time: DateTime<Utc>,
        window: &mut CandleWindow,
    ) -> Candle {
        let previous_close = window
            .last_close()
            .unwrap_or_else(|| Candle::placeholder(time).close);
        let candle = self.next_candle_with(
            rng,
            symbol,
            time,
            previous_close,
            window.recent_high(),
            window.recent_low(),
        );
        window.push(candle.clone());
        candle
    }
}
