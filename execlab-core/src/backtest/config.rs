//! Backtest configuration.

use serde::{Deserialize, Serialize};

use super::stats::StatsMode;
use crate::error::{ensure, ConfigError};

/// What happens to a position still open when the series ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenPositionPolicy {
    /// Leave it out of every statistic and flag the report.
    #[default]
    Exclude,
    /// Close it at the last valid bar's close and count it as a trade.
    CloseAtLastBar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Bars of history required before the first signal evaluation.
    pub min_lookback: usize,
    /// Quantity requested per entry.
    pub order_quantity: f64,
    /// Signals with lower confidence (0-100) are ignored.
    pub min_confidence: f64,
    /// Maximum bars a position is held.
    pub holding_horizon: usize,
    /// Fallback stop distance as a fraction of entry when the signal has no ATR.
    pub stop_loss_pct: f64,
    /// Fallback take-profit distance when the signal has no usable target.
    pub take_profit_pct: f64,
    pub atr_stop_multiple: f64,
    pub allow_short: bool,
    pub exit_on_opposing_signal: bool,
    pub open_position_policy: OpenPositionPolicy,
    pub stats_mode: StatsMode,
    pub cache_results: bool,
    /// Keep the completed trades in the report.
    pub record_trades: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            min_lookback: 50,
            order_quantity: 100.0,
            min_confidence: 0.0,
            holding_horizon: 10,
            stop_loss_pct: 0.05,
            take_profit_pct: 0.10,
            atr_stop_multiple: 2.0,
            allow_short: true,
            exit_on_opposing_signal: true,
            open_position_policy: OpenPositionPolicy::Exclude,
            stats_mode: StatsMode::Incremental,
            cache_results: true,
            record_trades: true,
        }
    }
}

impl BacktestConfig {
    pub fn with_min_lookback(mut self, bars: usize) -> Self {
        self.min_lookback = bars;
        self
    }

    pub fn with_stats_mode(mut self, mode: StatsMode) -> Self {
        self.stats_mode = mode;
        self
    }

    pub fn with_open_position_policy(mut self, policy: OpenPositionPolicy) -> Self {
        self.open_position_policy = policy;
        self
    }

    pub fn with_order_quantity(mut self, quantity: f64) -> Self {
        self.order_quantity = quantity;
        self
    }

    pub fn with_holding_horizon(mut self, bars: usize) -> Self {
        self.holding_horizon = bars;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.order_quantity.is_finite() && self.order_quantity > 0.0,
            "backtest.order_quantity",
            "finite and > 0",
            self.order_quantity,
        )?;
        ensure(
            (0.0..=100.0).contains(&self.min_confidence),
            "backtest.min_confidence",
            "in [0, 100]",
            self.min_confidence,
        )?;
        ensure(
            self.holding_horizon >= 1,
            "backtest.holding_horizon",
            ">= 1",
            self.holding_horizon as f64,
        )?;
        ensure(
            self.stop_loss_pct > 0.0 && self.stop_loss_pct < 1.0,
            "backtest.stop_loss_pct",
            "in (0, 1)",
            self.stop_loss_pct,
        )?;
        ensure(
            self.take_profit_pct.is_finite() && self.take_profit_pct > 0.0,
            "backtest.take_profit_pct",
            "finite and > 0",
            self.take_profit_pct,
        )?;
        ensure(
            self.atr_stop_multiple.is_finite() && self.atr_stop_multiple > 0.0,
            "backtest.atr_stop_multiple",
            "finite and > 0",
            self.atr_stop_multiple,
        )?;
        if self.stats_mode == StatsMode::FullRescan && !self.record_trades {
            return Err(ConfigError::Contradictory(
                "full-rescan statistics need record_trades = true".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = BacktestConfig::default();
        config.validate().unwrap();
        assert_eq!(config.min_lookback, 50);
        assert_eq!(config.open_position_policy, OpenPositionPolicy::Exclude);
    }

    #[test]
    fn zero_horizon_rejected() {
        assert!(BacktestConfig::default()
            .with_holding_horizon(0)
            .validate()
            .is_err());
    }

    #[test]
    fn rescan_without_trades_is_contradictory() {
        let config = BacktestConfig {
            stats_mode: StatsMode::FullRescan,
            record_trades: false,
            ..BacktestConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Contradictory(_))));
    }

    #[test]
    fn policy_from_toml() {
        let config: BacktestConfig = toml::from_str(
            r#"
            open_position_policy = "close_at_last_bar"
            stats_mode = "full_rescan"
            "#,
        )
        .unwrap();
        assert_eq!(config.open_position_policy, OpenPositionPolicy::CloseAtLastBar);
        assert_eq!(config.stats_mode, StatsMode::FullRescan);
        assert_eq!(config.holding_horizon, 10);
    }
}
