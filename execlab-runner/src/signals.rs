//! Reference signal sources.
//!
//! Deterministic, history-only sources used by the runner and the CLI. Each
//! implements `execlab_core::SignalSource`; custom sources can be any
//! `Fn(&str, &[PriceBar], Market) -> Signal`.

use serde::{Deserialize, Serialize};

use execlab_core::domain::{Market, PriceBar, Signal};
use execlab_core::{ConfigError, SignalSource};

/// Serializable signal source selection (`[signal]` in the run config).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalConfig {
    /// Fast SMA crossing the slow SMA.
    MaCrossover {
        #[serde(default = "default_fast")]
        fast: usize,
        #[serde(default = "default_slow")]
        slow: usize,
    },
    /// Close-to-close change over `lookback` bars beyond `threshold`.
    Momentum {
        #[serde(default = "default_lookback")]
        lookback: usize,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    AlwaysHold,
}

fn default_fast() -> usize {
    10
}

fn default_slow() -> usize {
    30
}

fn default_lookback() -> usize {
    20
}

fn default_threshold() -> f64 {
    0.02
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig::MaCrossover {
            fast: default_fast(),
            slow: default_slow(),
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build().map(|_| ())
    }

    pub fn build(&self) -> Result<Box<dyn SignalSource>, ConfigError> {
        Ok(match *self {
            SignalConfig::MaCrossover { fast, slow } => Box::new(MaCrossoverSignal::new(fast, slow)?),
            SignalConfig::Momentum {
                lookback,
                threshold,
            } => Box::new(MomentumSignal::new(lookback, threshold)?),
            SignalConfig::AlwaysHold => Box::new(AlwaysHold),
        })
    }
}

// ── Moving-average crossover ─────────────────────────────────────────

/// Golden cross / death cross on simple moving averages of the close.
///
/// BUY on the bar where the fast SMA moves above the slow SMA, SELL where it
/// moves below; HOLD otherwise. Signals carry the slow-window ATR so the
/// engine can place volatility stops.
#[derive(Debug, Clone, PartialEq)]
pub struct MaCrossoverSignal {
    pub fast_period: usize,
    pub slow_period: usize,
}

impl MaCrossoverSignal {
    pub fn new(fast_period: usize, slow_period: usize) -> Result<Self, ConfigError> {
        if fast_period == 0 {
            return Err(ConfigError::OutOfRange {
                field: "signal.fast",
                expected: ">= 1",
                value: 0.0,
            });
        }
        if slow_period <= fast_period {
            return Err(ConfigError::Contradictory(format!(
                "signal.slow ({slow_period}) must exceed signal.fast ({fast_period})"
            )));
        }
        Ok(Self {
            fast_period,
            slow_period,
        })
    }
}

impl SignalSource for MaCrossoverSignal {
    fn signal(&self, _symbol: &str, history: &[PriceBar], _market: Market) -> Signal {
        let n = history.len();
        // Two consecutive slow averages are needed.
        if n < self.slow_period + 1 {
            return Signal::hold();
        }
        let (Some(fast_cur), Some(slow_cur), Some(fast_prev), Some(slow_prev)) = (
            sma(&history[..n], self.fast_period),
            sma(&history[..n], self.slow_period),
            sma(&history[..n - 1], self.fast_period),
            sma(&history[..n - 1], self.slow_period),
        ) else {
            return Signal::hold();
        };

        let spread = fast_cur / slow_cur - 1.0;
        let confidence = (50.0 + spread.abs() * 5_000.0).min(100.0);
        let signal = if fast_cur > slow_cur && fast_prev <= slow_prev {
            Signal::buy(confidence)
        } else if fast_cur < slow_cur && fast_prev >= slow_prev {
            Signal::sell(confidence)
        } else {
            return Signal::hold();
        };

        let signal = signal.with_predicted_change(spread * 100.0);
        match average_true_range(history, self.slow_period) {
            Some(atr) => signal.with_atr(atr),
            None => signal,
        }
    }

    fn name(&self) -> &str {
        "ma_crossover"
    }
}

// ── Momentum ─────────────────────────────────────────────────────────

/// Rate of change over `lookback` bars.
///
/// BUY when `close[t] / close[t - lookback] - 1 > threshold`, SELL when below
/// `-threshold`. Confidence scales with how far the move clears the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentumSignal {
    pub lookback: usize,
    pub threshold: f64,
}

impl MomentumSignal {
    pub fn new(lookback: usize, threshold: f64) -> Result<Self, ConfigError> {
        if lookback == 0 {
            return Err(ConfigError::OutOfRange {
                field: "signal.lookback",
                expected: ">= 1",
                value: 0.0,
            });
        }
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "signal.threshold",
                expected: "finite and >= 0",
                value: threshold,
            });
        }
        Ok(Self {
            lookback,
            threshold,
        })
    }
}

impl SignalSource for MomentumSignal {
    fn signal(&self, _symbol: &str, history: &[PriceBar], _market: Market) -> Signal {
        let n = history.len();
        if n < self.lookback + 1 {
            return Signal::hold();
        }
        let now = history[n - 1].close;
        let then = history[n - 1 - self.lookback].close;
        if !(now.is_finite() && then.is_finite() && then > 0.0) {
            return Signal::hold();
        }

        let roc = now / then - 1.0;
        let strength = if self.threshold > 0.0 {
            roc.abs() / self.threshold
        } else {
            1.0
        };
        let confidence = (strength * 50.0).clamp(0.0, 100.0);
        let signal = if roc > self.threshold {
            Signal::buy(confidence)
        } else if roc < -self.threshold {
            Signal::sell(confidence)
        } else {
            return Signal::hold();
        };
        signal.with_predicted_change(roc * 100.0)
    }

    fn name(&self) -> &str {
        "momentum"
    }
}

// ── Hold ─────────────────────────────────────────────────────────────

/// Never trades. Baseline for cost-only comparisons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlwaysHold;

impl SignalSource for AlwaysHold {
    fn signal(&self, _symbol: &str, _history: &[PriceBar], _market: Market) -> Signal {
        Signal::hold()
    }

    fn name(&self) -> &str {
        "always_hold"
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Mean close of the last `period` bars; `None` if any close is not finite.
fn sma(history: &[PriceBar], period: usize) -> Option<f64> {
    if period == 0 || history.len() < period {
        return None;
    }
    let window = &history[history.len() - period..];
    let mut sum = 0.0;
    for bar in window {
        if !bar.close.is_finite() {
            return None;
        }
        sum += bar.close;
    }
    Some(sum / period as f64)
}

/// Simple average of true ranges over the last `period` bars.
fn average_true_range(history: &[PriceBar], period: usize) -> Option<f64> {
    if period == 0 || history.len() < period + 1 {
        return None;
    }
    let start = history.len() - period;
    let mut sum = 0.0;
    for i in start..history.len() {
        let bar = &history[i];
        let prev_close = history[i - 1].close;
        let tr = (bar.high - bar.low)
            .max((bar.high - prev_close).abs())
            .max((bar.low - prev_close).abs());
        if !tr.is_finite() {
            return None;
        }
        sum += tr;
    }
    let atr = sum / period as f64;
    (atr > 0.0).then_some(atr)
}
