//! Multi-symbol runner: loads every series, fans the backtests out with
//! rayon and ranks the results.
//!
//! Each symbol runs on its own engine run (and therefore its own fill
//! simulator); the only state shared between threads is the result cache.
//! A symbol that fails to load or run is reported in `failures` and does not
//! abort the others.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use execlab_core::backtest::{
    BacktestEngine, CacheStats, CancelToken, PerformanceReport, ResultCache,
};
use execlab_core::domain::{Market, PriceBar};
use execlab_core::{ConfigError, EngineError, SignalSource};

use crate::config::{RunConfig, RunConfigError};
use crate::data_loader::{load_symbol, DataSource, LoadError, LoadedSeries};
use crate::ranking::{rank, RankedEntry};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("run config error: {0}")]
    Config(#[from] RunConfigError),

    #[error("engine config error: {0}")]
    EngineConfig(#[from] ConfigError),

    #[error("data error for '{symbol}': {source}")]
    Data {
        symbol: String,
        #[source]
        source: LoadError,
    },

    #[error("backtest failed: {0}")]
    Engine(#[from] EngineError),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

/// One symbol's input.
#[derive(Debug, Clone)]
pub struct SymbolJob {
    pub symbol: String,
    pub market: Market,
    pub bars: Vec<PriceBar>,
}

impl SymbolJob {
    pub fn new(symbol: impl Into<String>, market: Market, bars: Vec<PriceBar>) -> Self {
        Self {
            symbol: symbol.into(),
            market,
            bars,
        }
    }
}

impl From<LoadedSeries> for SymbolJob {
    fn from(series: LoadedSeries) -> Self {
        Self {
            symbol: series.symbol,
            market: series.market,
            bars: series.bars,
        }
    }
}

/// A symbol that produced no report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: String,
}

/// Everything a multi-symbol run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub signal: String,
    /// Reports in input order.
    pub reports: Vec<PerformanceReport>,
    pub ranking: Vec<RankedEntry>,
    pub failures: Vec<SymbolFailure>,
    /// Symbols whose series was synthetic.
    pub synthetic_symbols: Vec<String>,
    pub cache: CacheStats,
    pub elapsed_ms: u128,
}

/// Runs one signal source over many symbols with a shared engine.
pub struct Runner {
    engine: BacktestEngine,
    signals: Box<dyn SignalSource>,
    cancel: CancelToken,
    parallel: bool,
}

impl Runner {
    pub fn new(engine: BacktestEngine, signals: Box<dyn SignalSource>) -> Self {
        Self {
            engine,
            signals,
            cancel: CancelToken::new(),
            parallel: true,
        }
    }

    /// Use an existing cache (e.g. one kept across CLI invocations in-process).
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.engine = self.engine.with_cache(cache);
        self
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn engine(&self) -> &BacktestEngine {
        &self.engine
    }

    /// Token that stops every in-flight and future run between bars.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn run_symbol(&self, job: &SymbolJob) -> Result<PerformanceReport, RunError> {
        let report = self.engine.run_backtest_with_cancel(
            &job.symbol,
            &job.bars,
            job.market,
            self.signals.as_ref(),
            &self.cancel,
        )?;
        Ok(report)
    }

    /// Run every job. Results come back in input order.
    pub fn run_all(&self, jobs: &[SymbolJob]) -> Vec<Result<PerformanceReport, RunError>> {
        if self.parallel {
            jobs.par_iter().map(|job| self.run_symbol(job)).collect()
        } else {
            jobs.iter().map(|job| self.run_symbol(job)).collect()
        }
    }
}

/// Load, run and rank everything described by a run config.
pub fn run_from_config(config: &RunConfig) -> Result<RunSummary, RunError> {
    config.validate()?;
    match config.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| RunError::ThreadPool(e.to_string()))?;
            pool.install(|| execute(config))
        }
        None => execute(config),
    }
}

fn execute(config: &RunConfig) -> Result<RunSummary, RunError> {
    let started = Instant::now();
    let engine = config.exec_config().build_engine()?;
    let signals = config.signal.build()?;
    let signal_name = signals.name().to_string();
    let runner = Runner::new(engine, signals);

    tracing::info!(
        symbols = config.symbols.len(),
        signal = %signal_name,
        "starting run"
    );

    let loaded: Vec<Result<LoadedSeries, RunError>> = config
        .symbols
        .par_iter()
        .map(|symbol| {
            load_symbol(symbol).map_err(|source| RunError::Data {
                symbol: symbol.name.clone(),
                source,
            })
        })
        .collect();

    let mut failures = Vec::new();
    let mut synthetic_symbols = Vec::new();
    let mut jobs = Vec::new();
    for (symbol, result) in config.symbols.iter().zip(loaded) {
        match result {
            Ok(series) => {
                if let DataSource::Synthetic { .. } = series.source {
                    synthetic_symbols.push(series.symbol.clone());
                }
                jobs.push(SymbolJob::from(series));
            }
            Err(e) => {
                tracing::warn!(symbol = %symbol.name, error = %e, "skipping symbol");
                failures.push(SymbolFailure {
                    symbol: symbol.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let mut reports = Vec::with_capacity(jobs.len());
    for (job, result) in jobs.iter().zip(runner.run_all(&jobs)) {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                tracing::warn!(symbol = %job.symbol, error = %e, "backtest failed");
                failures.push(SymbolFailure {
                    symbol: job.symbol.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let ranking = rank(&reports, &config.ranking);
    let summary = RunSummary {
        signal: signal_name,
        reports,
        ranking,
        failures,
        synthetic_symbols,
        cache: runner.engine().cache().stats(),
        elapsed_ms: started.elapsed().as_millis(),
    };
    tracing::info!(
        reports = summary.reports.len(),
        failures = summary.failures.len(),
        elapsed_ms = summary.elapsed_ms as u64,
        "run complete"
    );
    Ok(summary)
}
