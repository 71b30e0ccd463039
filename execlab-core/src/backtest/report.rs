//! Per-symbol performance report.

use serde::{Deserialize, Serialize};

use super::stats::{StatsMode, TradeStats};
use crate::domain::{CompletedTrade, Market};
use crate::quality::DataQualityReport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub symbol: String,
    pub market: Market,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percent of trades with a positive net return.
    pub win_rate: f64,
    /// Sum of per-trade net returns, in percent.
    pub total_return: f64,
    /// Percent of trades whose raw move matched the predicted direction.
    pub directional_accuracy: f64,
    pub average_return: f64,
    pub best_trade: Option<f64>,
    pub worst_trade: Option<f64>,
    pub average_bars_held: f64,
    /// A position was still open at series end and left out of the statistics.
    pub open_position_excluded: bool,
    pub bars_processed: usize,
    pub signals_evaluated: usize,
    /// Entry remainders dropped, by expiry or on exit.
    pub cancelled_carryovers: usize,
    pub stats_mode: StatsMode,
    pub data_quality: DataQualityReport,
    pub trades: Vec<CompletedTrade>,
}

impl PerformanceReport {
    /// Report carrying only the statistics; run counters start at zero.
    pub fn from_stats(
        symbol: &str,
        market: Market,
        stats_mode: StatsMode,
        stats: &TradeStats,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            market,
            total_trades: stats.total_trades,
            winning_trades: stats.winning_trades,
            losing_trades: stats.losing_trades,
            win_rate: stats.win_rate(),
            total_return: stats.return_sum,
            directional_accuracy: stats.directional_accuracy(),
            average_return: stats.average_return(),
            best_trade: stats.best_return,
            worst_trade: stats.worst_return,
            average_bars_held: stats.average_bars_held(),
            open_position_excluded: false,
            bars_processed: 0,
            signals_evaluated: 0,
            cancelled_carryovers: 0,
            stats_mode,
            data_quality: DataQualityReport::default(),
            trades: Vec::new(),
        }
    }

    /// Zero-trade report.
    pub fn empty(symbol: &str, market: Market, stats_mode: StatsMode) -> Self {
        Self::from_stats(symbol, market, stats_mode, &TradeStats::default())
    }

    /// Statistics re-derived from the recorded trades.
    pub fn recompute_stats(&self) -> TradeStats {
        TradeStats::from_trades(&self.trades)
    }
}
