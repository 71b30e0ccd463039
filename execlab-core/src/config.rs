//! Combined engine configuration, loadable from TOML.
//!
//! ```toml
//! [slippage]
//! spread_bps = 12.0
//!
//! [fill]
//! max_queue_duration = 3
//!
//! [backtest]
//! min_lookback = 20
//! ```
//!
//! Every section and field is optional; omitted values take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backtest::{BacktestConfig, BacktestEngine};
use crate::error::ConfigError;
use crate::fill::FillConfig;
use crate::slippage::SlippageConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    pub slippage: SlippageConfig,
    pub fill: FillConfig,
    pub backtest: BacktestConfig,
}

impl ExecConfig {
    /// Parse and validate.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.slippage.validate()?;
        self.fill.validate()?;
        self.backtest.validate()
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn build_engine(&self) -> Result<BacktestEngine, ConfigError> {
        BacktestEngine::new(
            self.backtest.clone(),
            self.slippage.clone(),
            self.fill.clone(),
        )
    }
}
