//! Bar-by-bar backtest loop.
//!
//! Per bar, in order:
//! 1. Void bars (NaN prices) are counted and skipped entirely.
//! 2. Queued entry remainders are retried and top up the open position.
//! 3. An open position is checked for stop, target, horizon, then opposing signal.
//! 4. With no position, an actionable signal opens one through the simulator.
//! 5. The statistics strategy observes the end of the bar.

use std::sync::Arc;

use crate::domain::{ExitReason, Market, OrderSide, PositionSide, PriceBar, Signal};
use crate::error::{ConfigError, EngineError};
use crate::fill::{FillConfig, PartialFillSimulator};
use crate::quality::DataQualityReport;
use crate::slippage::{BarContext, SlippageConfig, SlippageModel};

use super::cache::{CacheKey, ResultCache};
use super::config::{BacktestConfig, OpenPositionPolicy};
use super::report::PerformanceReport;
use super::signal::{CancelToken, SignalSource};
use super::state::{OpenPosition, PositionState};

/// Backtest engine. Holds validated configuration and a result cache;
/// every run builds its own fill simulator.
#[derive(Debug)]
pub struct BacktestEngine {
    config: BacktestConfig,
    slippage: SlippageConfig,
    fill: FillConfig,
    cache: Arc<ResultCache>,
    fingerprint: String,
}

impl BacktestEngine {
    pub fn new(
        config: BacktestConfig,
        slippage: SlippageConfig,
        fill: FillConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        slippage.validate()?;
        fill.validate()?;
        let fingerprint = config_fingerprint(&config, &slippage, &fill);
        Ok(Self {
            config,
            slippage,
            fill,
            cache: Arc::new(ResultCache::new()),
            fingerprint,
        })
    }

    /// Share a cache with other engines (e.g. across runner threads).
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn slippage_config(&self) -> &SlippageConfig {
        &self.slippage
    }

    pub fn fill_config(&self) -> &FillConfig {
        &self.fill
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Hash of all three configs; part of every cache key.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn update_config(&mut self, config: BacktestConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        self.refresh_fingerprint();
        Ok(())
    }

    pub fn update_slippage_config(&mut self, slippage: SlippageConfig) -> Result<(), ConfigError> {
        slippage.validate()?;
        self.slippage = slippage;
        self.refresh_fingerprint();
        Ok(())
    }

    pub fn update_fill_config(&mut self, fill: FillConfig) -> Result<(), ConfigError> {
        fill.validate()?;
        self.fill = fill;
        self.refresh_fingerprint();
        Ok(())
    }

    fn refresh_fingerprint(&mut self) {
        self.fingerprint = config_fingerprint(&self.config, &self.slippage, &self.fill);
    }

    pub fn cache_key(&self, symbol: &str, series: &[PriceBar], market: Market) -> CacheKey {
        CacheKey::compute(symbol, series, market, &self.fingerprint)
    }

    /// Drop the cached report for one input. Returns whether one existed.
    ///
    /// The key does not cover the signal source: callers switching sources
    /// for the same series must invalidate.
    pub fn invalidate(&self, symbol: &str, series: &[PriceBar], market: Market) -> bool {
        self.cache.invalidate(&self.cache_key(symbol, series, market))
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn run_backtest(
        &self,
        symbol: &str,
        series: &[PriceBar],
        market: Market,
        signals: &dyn SignalSource,
    ) -> Result<PerformanceReport, EngineError> {
        self.run_backtest_with_cancel(symbol, series, market, signals, &CancelToken::new())
    }

    /// Run with a cooperative cancellation check between bars.
    /// Cancelled runs leave the cache untouched.
    pub fn run_backtest_with_cancel(
        &self,
        symbol: &str,
        series: &[PriceBar],
        market: Market,
        signals: &dyn SignalSource,
        cancel: &CancelToken,
    ) -> Result<PerformanceReport, EngineError> {
        let key = self
            .config
            .cache_results
            .then(|| self.cache_key(symbol, series, market));
        if let Some(key) = &key {
            if let Some(report) = self.cache.get(key) {
                tracing::debug!(symbol, key = %key, "backtest cache hit");
                return Ok(report);
            }
        }

        let report = self.simulate(symbol, series, market, signals, cancel)?;

        if let Some(key) = key {
            self.cache.put(key, report.clone());
        }
        Ok(report)
    }

    /// Uncached run.
    pub fn simulate(
        &self,
        symbol: &str,
        series: &[PriceBar],
        market: Market,
        signals: &dyn SignalSource,
        cancel: &CancelToken,
    ) -> Result<PerformanceReport, EngineError> {
        let cfg = &self.config;
        let mut sim = PartialFillSimulator::new(
            self.fill.clone(),
            SlippageModel::new(self.slippage.clone())?,
            market,
        )?;
        let mut stats = cfg.stats_mode.strategy(cfg.record_trades);
        let mut quality = DataQualityReport::default();
        let mut state = PositionState::WaitingForSignal;
        let mut signals_evaluated = 0usize;
        let mut dropped_on_exit = 0usize;
        let mut last_valid: Option<(usize, &PriceBar)> = None;
        let mut previous: Option<&PriceBar> = None;

        for (t, bar) in series.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled {
                    symbol: symbol.to_string(),
                    bar_index: t,
                });
            }
            quality.observe(bar, previous);
            previous = Some(bar);

            if state == PositionState::PositionClosed {
                state = PositionState::WaitingForSignal;
            }
            if bar.is_void() {
                stats.on_bar();
                continue;
            }
            last_valid = Some((t, bar));

            if sim.has_queued_orders() {
                let fills = sim.process_queued_orders(bar, t)?;
                if let PositionState::PositionOpen(position) = &mut state {
                    for fill in &fills {
                        position.add_fill(fill);
                    }
                }
            }

            let gate_open = t + 1 >= cfg.min_lookback;
            let evaluate = |signals_evaluated: &mut usize| -> Signal {
                *signals_evaluated += 1;
                signals.signal(symbol, &series[..=t], market)
            };

            match &state {
                PositionState::PositionOpen(position) if t > position.entry_bar => {
                    let mut exit = position.exit_check(bar, t, cfg.holding_horizon);
                    if exit.is_none() && cfg.exit_on_opposing_signal && gate_open {
                        let signal = evaluate(&mut signals_evaluated);
                        if self.is_actionable(&signal) && position.is_opposed_by(&signal) {
                            exit = Some((ExitReason::OpposingSignal, bar.close));
                        }
                    }
                    if let Some((reason, exit_reference)) = exit {
                        let slip = sim.slippage().calculate(
                            exit_reference,
                            position.side.exit_side(),
                            position.quantity,
                            Some(BarContext::new(bar, market)),
                        );
                        let trade = position.close(t, exit_reference, slip.adjusted_price, reason);
                        tracing::debug!(
                            symbol,
                            bar = t,
                            reason = ?reason,
                            return_pct = trade.return_pct,
                            "position closed"
                        );
                        stats.record(trade);
                        dropped_on_exit += sim.clear_queue();
                        state = PositionState::PositionClosed;
                    }
                }
                PositionState::WaitingForSignal if gate_open => {
                    let signal = evaluate(&mut signals_evaluated);
                    if let Some(side) = self.entry_side(&signal) {
                        let fill = sim.simulate_fill(bar.close, cfg.order_quantity, side, bar, t);
                        if fill.filled_quantity > 0.0 {
                            tracing::debug!(
                                symbol,
                                bar = t,
                                side = %side,
                                filled = fill.filled_quantity,
                                price = fill.fill_price,
                                "position opened"
                            );
                            state = PositionState::PositionOpen(OpenPosition::open(
                                PositionSide::from_entry(side),
                                &signal,
                                &fill,
                                t,
                                cfg,
                            ));
                        } else {
                            dropped_on_exit += sim.clear_queue();
                        }
                    }
                }
                _ => {}
            }

            stats.on_bar();
        }

        let mut open_position_excluded = false;
        if let PositionState::PositionOpen(position) = &state {
            match (cfg.open_position_policy, last_valid) {
                (OpenPositionPolicy::CloseAtLastBar, Some((t, bar))) if t > position.entry_bar => {
                    let slip = sim.slippage().calculate(
                        bar.close,
                        position.side.exit_side(),
                        position.quantity,
                        Some(BarContext::new(bar, market)),
                    );
                    stats.record(position.close(
                        t,
                        bar.close,
                        slip.adjusted_price,
                        ExitReason::EndOfSeries,
                    ));
                    stats.on_bar();
                }
                _ => open_position_excluded = true,
            }
        }

        if !quality.is_clean() {
            tracing::warn!(
                symbol,
                void_bars = quality.void_bars,
                non_positive_volume = quality.non_positive_volume_bars,
                non_monotonic = quality.non_monotonic_timestamps,
                invalid_ohlc = quality.invalid_ohlc_bars,
                "degraded input data"
            );
        }

        let snapshot = stats.snapshot();
        let mut report = PerformanceReport::from_stats(symbol, market, cfg.stats_mode, &snapshot);
        report.open_position_excluded = open_position_excluded;
        report.bars_processed = series.len();
        report.signals_evaluated = signals_evaluated;
        report.cancelled_carryovers = sim.cancelled_orders() + dropped_on_exit;
        report.data_quality = quality;
        report.trades = stats.into_trades();

        tracing::info!(
            symbol,
            market = %market,
            bars = report.bars_processed,
            trades = report.total_trades,
            win_rate = report.win_rate,
            total_return = report.total_return,
            "backtest complete"
        );
        Ok(report)
    }

    fn is_actionable(&self, signal: &Signal) -> bool {
        signal.entry_side().is_some() && signal.confidence >= self.config.min_confidence
    }

    /// Side to open for a signal, honoring `allow_short` and `min_confidence`.
    fn entry_side(&self, signal: &Signal) -> Option<OrderSide> {
        if !self.is_actionable(signal) {
            return None;
        }
        let side = signal.entry_side()?;
        if side == OrderSide::Sell && !self.config.allow_short {
            return None;
        }
        Some(side)
    }
}

fn config_fingerprint(config: &BacktestConfig, slippage: &SlippageConfig, fill: &FillConfig) -> String {
    // Debug output is used instead of serde so custom fill curves hash by name.
    let canonical = format!("{config:?}|{slippage:?}|{fill:?}");
    blake3::hash(canonical.as_bytes()).to_hex().to_string()
}
