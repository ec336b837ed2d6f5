//! OHLC candle representation and the bounded per-session candle window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_WINDOW_SIZE: usize = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    /// Stand-in candle used whenever market data is missing.
    pub fn placeholder(time: DateTime<Utc>) -> Self {
        Candle {
            time,
            open: 100.0,
            high: 100.5,
            low: 99.5,
            close: 100.2,
        }
    }

    /// low <= min(open, close) and high >= max(open, close)
    pub fn is_well_formed(&self) -> bool {
        self.low <= self.open.min(self.close) && self.high >= self.open.max(self.close)
    }
}

/// Rolling window keeping only the most recent `capacity` candles.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleWindow {
    capacity: usize,
    candles: VecDeque<Candle>,
}

impl CandleWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        CandleWindow {
            capacity,
            candles: VecDeque::with_capacity(capacity),
        }
    }

    /// Build a window from a series, keeping only its tail.
    pub fn from_series(capacity: usize, series: &[Candle]) -> Self {
        let mut window = CandleWindow::new(capacity);
        for candle in series {
            window.push(candle.clone());
        }
        window
    }

    pub fn push(&mut self, candle: Candle) {
        if self.candles.len() == self.capacity {
            self.candles.pop_front();
        }
        self.candles.push_back(candle);
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.candles.back().map(|c| c.close)
    }

    /// Highest high across the window.
    pub fn recent_high(&self) -> Option<f64> {
        self.candles.iter().map(|c| c.high).reduce(f64::max)
    }

    /// Lowest low across the window.
    pub fn recent_low(&self) -> Option<f64> {
        self.candles.iter().map(|c| c.low).reduce(f64::min)
    }

    pub fn to_vec(&self) -> Vec<Candle> {
        self.candles.iter().cloned().collect()
    }
}
