//! Backtest and accuracy engine.
//!
//! Replays a price series against a `SignalSource`, turns signals into orders
//! through a per-run `PartialFillSimulator`, and accumulates statistics through
//! an interchangeable `StatsStrategy`.

pub mod cache;
pub mod config;
pub mod engine;
pub mod report;
pub mod signal;
pub mod state;
pub mod stats;

pub use cache::{CacheKey, CacheStats, ResultCache};
pub use config::{BacktestConfig, OpenPositionPolicy};
pub use engine::BacktestEngine;
pub use report::PerformanceReport;
pub use signal::{CancelToken, SignalSource};
pub use state::{OpenPosition, PositionState};
pub use stats::{FullRescanStats, IncrementalStats, StatsMode, StatsStrategy, TradeStats};
