//! Error taxonomy for the core.
//!
//! Only two kinds of failure are visible to callers:
//! - `ConfigError`: invalid or contradictory settings, raised at construction/update.
//! - `EngineError`: contract violations during a run (and cooperative cancellation).
//!
//! Data-quality problems never surface here; see `quality::DataQualityReport`.

use thiserror::Error;

use crate::domain::OrderId;

/// Invalid or contradictory configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },

    #[error("unknown fill-rate model '{0}' (expected 'linear' or 'exponential')")]
    UnknownFillModel(String),

    #[error("custom fill-rate function '{name}' returned {output} at liquidity ratio {ratio}")]
    InvalidCustomFillRate {
        name: String,
        ratio: f64,
        output: f64,
    },

    #[error(
        "custom fill-rate function '{name}' rises from {previous} to {output} at excess ratio {ratio}"
    )]
    NonMonotoneCustomFillRate {
        name: String,
        ratio: f64,
        previous: f64,
        output: f64,
    },

    #[error("unknown market '{0}' (expected US, KR or CRYPTO)")]
    UnknownMarket(String),

    #[error("contradictory settings: {0}")]
    Contradictory(String),

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("failed to read config '{path}': {reason}")]
    Io { path: String, reason: String },
}

/// Failures raised while a simulation is running.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(
        "bar index {bar_index} precedes creation bar {created_bar} of queued order {order_id}"
    )]
    BarIndexRegression {
        order_id: OrderId,
        bar_index: usize,
        created_bar: usize,
    },

    #[error("backtest for '{symbol}' cancelled at bar {bar_index}")]
    Cancelled { symbol: String, bar_index: usize },
}

/// Range check used by every `validate()` in the crate.
pub(crate) fn ensure(
    ok: bool,
    field: &'static str,
    expected: &'static str,
    value: f64,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected,
            value,
        })
    }
}

/// `value` is finite and non-negative.
pub(crate) fn ensure_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    ensure(value.is_finite() && value >= 0.0, field, "finite and >= 0", value)
}
