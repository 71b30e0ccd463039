//! PriceBar: one OHLCV observation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar with a UTC timestamp.
///
/// Fields may be NaN. A bar with any non-finite OHLC field is a void bar:
/// it still advances the bar index but is never used for signals, fills or exits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any OHLC field is NaN or infinite.
    ///
    /// Volume is excluded: a bar with missing volume still has usable prices and
    /// is handled by the fill simulator's zero-volume policy.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// Volume is finite and strictly positive.
    pub fn has_volume(&self) -> bool {
        self.volume.is_finite() && self.volume > 0.0
    }

    /// Intrabar range as a fraction of close: `(high - low) / close`.
    ///
    /// `None` when the range is undefined (void bar, non-positive close, inverted range).
    pub fn range_pct(&self) -> Option<f64> {
        if self.is_void() || self.close <= 0.0 || self.high < self.low {
            return None;
        }
        Some((self.high - self.low) / self.close)
    }
}
