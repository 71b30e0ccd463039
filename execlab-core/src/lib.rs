//! ExecLab Core: slippage model, partial fill simulator, incremental backtest engine.
//!
//! This crate contains the execution and statistics core:
//! - Domain types (price bars, orders, signals, markets, completed trades)
//! - `SlippageModel`: base/spread/time-of-day/volatility/market-impact decomposition
//! - `PartialFillSimulator`: liquidity-driven fill rates with a carryover queue
//! - `BacktestEngine`: bar-by-bar signal replay with O(1) running statistics
//! - Result cache keyed by (symbol, series, market) and engine configuration
//! - Config records with serde defaults and fail-fast validation

pub mod backtest;
pub mod config;
pub mod domain;
pub mod error;
pub mod fill;
pub mod quality;
pub mod slippage;

pub use backtest::{
    BacktestConfig, BacktestEngine, CancelToken, OpenPositionPolicy, PerformanceReport,
    ResultCache, SignalSource, StatsMode,
};
pub use config::ExecConfig;
pub use domain::{Market, Order, OrderId, OrderSide, PriceBar, Signal, SignalType};
pub use error::{ConfigError, EngineError};
pub use fill::{CarryoverOrder, FillConfig, FillRateModel, FillResult, PartialFillSimulator, QueueStatus};
pub use quality::DataQualityReport;
pub use slippage::{BarContext, SlippageBreakdown, SlippageConfig, SlippageModel, SlippageResult};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed across runner threads are Send + Sync.
    ///
    /// Each run owns its simulator, but engines, configs and reports are shared
    /// with rayon workers in the runner.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<PriceBar>();
        require_sync::<PriceBar>();
        require_send::<Signal>();
        require_sync::<Signal>();
        require_send::<SlippageConfig>();
        require_sync::<SlippageConfig>();
        require_send::<FillConfig>();
        require_sync::<FillConfig>();
        require_send::<BacktestConfig>();
        require_sync::<BacktestConfig>();
        require_send::<BacktestEngine>();
        require_sync::<BacktestEngine>();
        require_send::<ResultCache>();
        require_sync::<ResultCache>();
        require_send::<PerformanceReport>();
        require_sync::<PerformanceReport>();
        require_send::<PartialFillSimulator>();
        require_send::<EngineError>();
    }

    /// Architecture contract: signal sources see history only up to the current bar.
    ///
    /// `SignalSource::signal` takes a history slice, not the full series plus an
    /// index, so lookahead is impossible by construction.
    #[test]
    fn signal_source_receives_history_slice() {
        let source = |_: &str, history: &[PriceBar], _: Market| {
            if history.len() >= 2 {
                Signal::buy(1.0)
            } else {
                Signal::hold()
            }
        };
        let source: &dyn SignalSource = &source;
        assert_eq!(source.signal("SPY", &[], Market::Us).kind, SignalType::Hold);
    }
}
