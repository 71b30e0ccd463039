//! Running trade statistics.
//!
//! Two interchangeable strategies sit behind `StatsStrategy`:
//! - `IncrementalStats` folds each completed trade into the running totals once (O(1)).
//! - `FullRescanStats` re-derives the totals from the whole trade list on every
//!   bar (O(trades) per bar). It exists as the reference the incremental
//!   path is checked against.
//!
//! Both fold trades through `TradeStats::record` in the same order, so their
//! snapshots are identical, not merely close.

use serde::{Deserialize, Serialize};

use crate::domain::CompletedTrade;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsMode {
    #[default]
    Incremental,
    FullRescan,
}

impl StatsMode {
    pub fn strategy(self, keep_trades: bool) -> Box<dyn StatsStrategy> {
        match self {
            StatsMode::Incremental => Box::new(IncrementalStats::new(keep_trades)),
            StatsMode::FullRescan => Box::new(FullRescanStats::default()),
        }
    }
}

/// Aggregates derivable from the completed-trade stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub correct_directions: usize,
    /// Sum of per-trade percent returns.
    pub return_sum: f64,
    pub bars_held_sum: usize,
    pub best_return: Option<f64>,
    pub worst_return: Option<f64>,
}

impl TradeStats {
    pub fn record(&mut self, trade: &CompletedTrade) {
        self.total_trades += 1;
        if trade.is_winner() {
            self.winning_trades += 1;
        } else {
            self.losing_trades += 1;
        }
        if trade.direction_correct {
            self.correct_directions += 1;
        }
        self.return_sum += trade.return_pct;
        self.bars_held_sum += trade.bars_held();
        self.best_return = Some(self.best_return.map_or(trade.return_pct, |b| b.max(trade.return_pct)));
        self.worst_return = Some(self.worst_return.map_or(trade.return_pct, |w| w.min(trade.return_pct)));
    }

    pub fn from_trades(trades: &[CompletedTrade]) -> Self {
        let mut stats = Self::default();
        for trade in trades {
            stats.record(trade);
        }
        stats
    }

    fn pct_of_trades(&self, count: usize) -> f64 {
        if self.total_trades == 0 {
            0.0
        } else {
            count as f64 / self.total_trades as f64 * 100.0
        }
    }

    /// Winning trades as a percentage of all trades.
    pub fn win_rate(&self) -> f64 {
        self.pct_of_trades(self.winning_trades)
    }

    pub fn directional_accuracy(&self) -> f64 {
        self.pct_of_trades(self.correct_directions)
    }

    pub fn average_return(&self) -> f64 {
        if self.total_trades == 0 {
            0.0
        } else {
            self.return_sum / self.total_trades as f64
        }
    }

    pub fn average_bars_held(&self) -> f64 {
        if self.total_trades == 0 {
            0.0
        } else {
            self.bars_held_sum as f64 / self.total_trades as f64
        }
    }
}

/// Statistics accumulation strategy used by the engine.
pub trait StatsStrategy: Send {
    fn mode(&self) -> StatsMode;

    /// A position closed.
    fn record(&mut self, trade: CompletedTrade);

    /// Called once at the end of every bar.
    fn on_bar(&mut self);

    fn snapshot(&self) -> TradeStats;

    /// Recorded trades, oldest first. Empty when trades are not kept.
    fn trades(&self) -> &[CompletedTrade];

    fn into_trades(self: Box<Self>) -> Vec<CompletedTrade>;
}

/// O(1) per trade and per bar.
#[derive(Debug, Default)]
pub struct IncrementalStats {
    stats: TradeStats,
    keep_trades: bool,
    trades: Vec<CompletedTrade>,
}

impl IncrementalStats {
    pub fn new(keep_trades: bool) -> Self {
        Self {
            stats: TradeStats::default(),
            keep_trades,
            trades: Vec::new(),
        }
    }
}

impl StatsStrategy for IncrementalStats {
    fn mode(&self) -> StatsMode {
        StatsMode::Incremental
    }

    fn record(&mut self, trade: CompletedTrade) {
        self.stats.record(&trade);
        if self.keep_trades {
            self.trades.push(trade);
        }
    }

    fn on_bar(&mut self) {}

    fn snapshot(&self) -> TradeStats {
        self.stats
    }

    fn trades(&self) -> &[CompletedTrade] {
        &self.trades
    }

    fn into_trades(self: Box<Self>) -> Vec<CompletedTrade> {
        self.trades
    }
}

/// Reference strategy: rescans every trade on every bar.
#[derive(Debug, Default)]
pub struct FullRescanStats {
    trades: Vec<CompletedTrade>,
    current: TradeStats,
}

impl StatsStrategy for FullRescanStats {
    fn mode(&self) -> StatsMode {
        StatsMode::FullRescan
    }

    fn record(&mut self, trade: CompletedTrade) {
        self.trades.push(trade);
    }

    fn on_bar(&mut self) {
        self.current = TradeStats::from_trades(&self.trades);
    }

    fn snapshot(&self) -> TradeStats {
        // Trades recorded after the last on_bar are still included.
        if self.current.total_trades == self.trades.len() {
            self.current
        } else {
            TradeStats::from_trades(&self.trades)
        }
    }

    fn trades(&self) -> &[CompletedTrade] {
        &self.trades
    }

    fn into_trades(self: Box<Self>) -> Vec<CompletedTrade> {
        self.trades
    }
}
