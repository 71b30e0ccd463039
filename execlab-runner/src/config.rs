//! TOML run configuration.
//!
//! ```toml
//! [[symbols]]
//! name = "SPY"
//! market = "US"
//! path = "data/spy.csv"
//!
//! [[symbols]]
//! name = "BTC"
//! market = "CRYPTO"
//! synthetic = { bars = 750, seed = 7 }
//!
//! [backtest]
//! min_lookback = 30
//!
//! [signal]
//! type = "momentum"
//! lookback = 10
//!
//! [ranking]
//! metric = "total_return"
//! ```
//!
//! The `[slippage]`, `[fill]` and `[backtest]` sections are the core engine
//! configs; every field is optional.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use execlab_core::backtest::BacktestConfig;
use execlab_core::domain::Market;
use execlab_core::fill::FillConfig;
use execlab_core::slippage::SlippageConfig;
use execlab_core::{ConfigError, ExecConfig};

use crate::ranking::RankingConfig;
use crate::signals::SignalConfig;

/// Errors from loading or validating a run configuration.
#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse run config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigError),

    #[error("run config lists no symbols")]
    NoSymbols,

    #[error("symbol '{0}' is listed more than once")]
    DuplicateSymbol(String),

    #[error("symbol '{0}' needs either `path` or `synthetic`")]
    MissingSource(String),

    #[error("symbol '{0}' sets both `path` and `synthetic`")]
    AmbiguousSource(String),
}

/// Complete configuration for one multi-symbol run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub symbols: Vec<SymbolConfig>,
    pub slippage: SlippageConfig,
    pub fill: FillConfig,
    pub backtest: BacktestConfig,
    pub signal: SignalConfig,
    pub ranking: RankingConfig,
    /// Worker threads; `None` uses the global rayon pool.
    pub threads: Option<usize>,
}

/// One symbol in the universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolConfig {
    pub name: String,
    #[serde(default)]
    pub market: Market,
    /// CSV file; relative paths resolve against the config file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthetic: Option<SyntheticConfig>,
}

/// Parameters of the deterministic random-walk generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub bars: usize,
    /// Defaults to a hash of the symbol name.
    pub seed: Option<u64>,
    pub start_price: f64,
    /// Bound of the uniform daily return, as a fraction.
    pub daily_move: f64,
    pub start_date: NaiveDate,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            bars: 500,
            seed: None,
            start_price: 100.0,
            daily_move: 0.03,
            start_date: NaiveDate::from_ymd_opt(2020, 1, 2).unwrap_or_default(),
        }
    }
}

/// Resolved data source for a symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSourceConfig {
    Csv(PathBuf),
    Synthetic(SyntheticConfig),
}

impl SymbolConfig {
    pub fn csv(name: impl Into<String>, market: Market, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            market,
            path: Some(path.into()),
            synthetic: None,
        }
    }

    pub fn synthetic(name: impl Into<String>, market: Market, synthetic: SyntheticConfig) -> Self {
        Self {
            name: name.into(),
            market,
            path: None,
            synthetic: Some(synthetic),
        }
    }

    /// Exactly one of `path` and `synthetic` must be set.
    pub fn source(&self) -> Result<DataSourceConfig, RunConfigError> {
        match (&self.path, &self.synthetic) {
            (Some(path), None) => Ok(DataSourceConfig::Csv(path.clone())),
            (None, Some(synthetic)) => Ok(DataSourceConfig::Synthetic(synthetic.clone())),
            (None, None) => Err(RunConfigError::MissingSource(self.name.clone())),
            (Some(_), Some(_)) => Err(RunConfigError::AmbiguousSource(self.name.clone())),
        }
    }
}

impl SyntheticConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.start_price.is_finite() && self.start_price > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "synthetic.start_price",
                expected: "finite and > 0",
                value: self.start_price,
            });
        }
        if !(self.daily_move.is_finite() && self.daily_move > 0.0 && self.daily_move < 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "synthetic.daily_move",
                expected: "in (0, 1)",
                value: self.daily_move,
            });
        }
        Ok(())
    }
}

impl RunConfig {
    /// Parse and validate. Relative CSV paths are kept as written.
    pub fn from_toml_str(s: &str) -> Result<Self, RunConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, resolving relative CSV paths against its directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RunConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RunConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Self = toml::from_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for symbol in &mut self.symbols {
            if let Some(p) = &symbol.path {
                if p.is_relative() {
                    symbol.path = Some(base.join(p));
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), RunConfigError> {
        if self.symbols.is_empty() {
            return Err(RunConfigError::NoSymbols);
        }
        let mut seen = HashSet::new();
        for symbol in &self.symbols {
            if !seen.insert(symbol.name.as_str()) {
                return Err(RunConfigError::DuplicateSymbol(symbol.name.clone()));
            }
            if let DataSourceConfig::Synthetic(synthetic) = symbol.source()? {
                synthetic.validate()?;
            }
        }
        if self.threads == Some(0) {
            return Err(ConfigError::OutOfRange {
                field: "threads",
                expected: ">= 1",
                value: 0.0,
            }
            .into());
        }
        self.exec_config().validate()?;
        self.signal.validate()?;
        Ok(())
    }

    /// The core engine configuration.
    pub fn exec_config(&self) -> ExecConfig {
        ExecConfig {
            slippage: self.slippage.clone(),
            fill: self.fill.clone(),
            backtest: self.backtest.clone(),
        }
    }
}
