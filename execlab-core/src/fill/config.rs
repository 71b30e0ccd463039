//! Partial-fill configuration.

use serde::{Deserialize, Serialize};

use super::fill_rate::FillRateModel;
use crate::error::{ensure, ensure_non_negative, ConfigError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillConfig {
    pub model: FillRateModel,
    /// Liquidity ratio at or below which an order fills completely.
    pub liquidity_threshold: f64,
    /// Floor for the fill rate once the threshold is exceeded, in [0, 1].
    pub min_immediate_fill_rate: f64,
    /// Bars a carryover may wait before it is cancelled.
    pub max_queue_duration: usize,
    /// Liquidity ratio assumed when bar volume is zero, negative or missing.
    pub zero_volume_ratio: f64,
    /// Bar-volume impact coefficient, used when no ADV impact is configured.
    pub impact_coefficient: f64,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            model: FillRateModel::default(),
            liquidity_threshold: 0.1,
            min_immediate_fill_rate: 0.3,
            max_queue_duration: 5,
            zero_volume_ratio: 1.0,
            impact_coefficient: 0.1,
        }
    }
}

impl FillConfig {
    pub fn with_model(mut self, model: FillRateModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_max_queue_duration(mut self, bars: usize) -> Self {
        self.max_queue_duration = bars;
        self
    }

    pub fn with_liquidity_threshold(mut self, threshold: f64) -> Self {
        self.liquidity_threshold = threshold;
        self
    }

    pub fn with_min_immediate_fill_rate(mut self, rate: f64) -> Self {
        self.min_immediate_fill_rate = rate;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_non_negative("fill.liquidity_threshold", self.liquidity_threshold)?;
        ensure(
            (0.0..=1.0).contains(&self.min_immediate_fill_rate),
            "fill.min_immediate_fill_rate",
            "in [0, 1]",
            self.min_immediate_fill_rate,
        )?;
        ensure(
            self.zero_volume_ratio.is_finite() && self.zero_volume_ratio > 0.0,
            "fill.zero_volume_ratio",
            "finite and > 0",
            self.zero_volume_ratio,
        )?;
        ensure_non_negative("fill.impact_coefficient", self.impact_coefficient)?;
        self.model.validate()
    }
}
