//! ExecLab Runner: backtest orchestration on top of `execlab-core`.
//!
//! This crate provides:
//! - CSV price-series loading and a deterministic synthetic generator
//! - TOML run configuration (symbols, engine configs, signal source, ranking)
//! - Reference signal sources (moving-average crossover, momentum, hold)
//! - A parallel multi-symbol runner sharing one result cache
//! - Ranking and screening of the resulting reports

pub mod config;
pub mod data_loader;
pub mod ranking;
pub mod runner;
pub mod signals;

pub use config::{DataSourceConfig, RunConfig, RunConfigError, SymbolConfig, SyntheticConfig};
pub use data_loader::{
    generate_synthetic_series, load_csv, load_symbol, read_csv, DataSource, LoadError,
    LoadedSeries,
};
pub use ranking::{rank, RankedEntry, RankingConfig, RankingMetric};
pub use runner::{run_from_config, RunError, RunSummary, Runner, SymbolFailure, SymbolJob};
pub use signals::{AlwaysHold, MaCrossoverSignal, MomentumSignal, SignalConfig};
