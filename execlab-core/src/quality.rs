//! Data-quality counters.
//!
//! Degraded inputs are skipped or defaulted, never raised as errors. These
//! counters make the degradation observable so callers can reject a run.

use serde::{Deserialize, Serialize};

use crate::domain::PriceBar;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub bars_seen: usize,
    /// Bars with a NaN or infinite OHLC field.
    pub void_bars: usize,
    /// Bars whose volume is zero, negative or NaN.
    pub non_positive_volume_bars: usize,
    /// Bars whose timestamp is not strictly after the previous bar's.
    pub non_monotonic_timestamps: usize,
    /// Non-void bars failing the OHLC sanity check.
    pub invalid_ohlc_bars: usize,
}

impl DataQualityReport {
    /// Account for one bar, given its predecessor in the series.
    pub fn observe(&mut self, bar: &PriceBar, previous: Option<&PriceBar>) {
        self.bars_seen += 1;
        if bar.is_void() {
            self.void_bars += 1;
        } else if !bar.is_sane() {
            self.invalid_ohlc_bars += 1;
        }
        if !bar.has_volume() {
            self.non_positive_volume_bars += 1;
        }
        if let Some(prev) = previous {
            if bar.timestamp <= prev.timestamp {
                self.non_monotonic_timestamps += 1;
            }
        }
    }

    /// Build a report for a whole series.
    pub fn from_series(series: &[PriceBar]) -> Self {
        let mut report = Self::default();
        let mut previous = None;
        for bar in series {
            report.observe(bar, previous);
            previous = Some(bar);
        }
        report
    }

    pub fn is_clean(&self) -> bool {
        self.void_bars == 0
            && self.non_positive_volume_bars == 0
            && self.non_monotonic_timestamps == 0
            && self.invalid_ohlc_bars == 0
    }

    /// Total count of flagged conditions (a bar can contribute more than one).
    pub fn issue_count(&self) -> usize {
        self.void_bars
            + self.non_positive_volume_bars
            + self.non_monotonic_timestamps
            + self.invalid_ohlc_bars
    }
}
