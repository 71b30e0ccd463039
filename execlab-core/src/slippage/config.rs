//! Slippage configuration records.
//!
//! Fixed costs (base, spread, time-of-day premiums) are expressed in basis
//! points; multipliers and the rate cap are plain fractions.

use serde::{Deserialize, Serialize};

use super::impact::ImpactModel;
use crate::error::{ensure, ensure_non_negative, ConfigError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlippageConfig {
    /// Fixed cost applied to every fill.
    pub base_bps: f64,
    /// Quoted spread proxy; half of it is charged per fill.
    pub spread_bps: f64,
    pub time_of_day: TimeOfDayConfig,
    pub volatility: VolatilityConfig,
    pub panic: PanicConfig,
    pub impact: ImpactConfig,
    /// Cap on the total slippage rate, as a fraction in (0, 1).
    pub max_rate: f64,
}

impl Default for SlippageConfig {
    fn default() -> Self {
        Self {
            base_bps: 5.0,
            spread_bps: 10.0,
            time_of_day: TimeOfDayConfig::default(),
            volatility: VolatilityConfig::default(),
            panic: PanicConfig::default(),
            impact: ImpactConfig::default(),
            max_rate: 0.10,
        }
    }
}

impl SlippageConfig {
    /// No slippage at all. Useful for isolating fill-rate behavior.
    pub fn frictionless() -> Self {
        Self {
            base_bps: 0.0,
            spread_bps: 0.0,
            time_of_day: TimeOfDayConfig {
                enabled: false,
                ..TimeOfDayConfig::default()
            },
            volatility: VolatilityConfig {
                enabled: false,
                ..VolatilityConfig::default()
            },
            panic: PanicConfig {
                enabled: false,
                ..PanicConfig::default()
            },
            impact: ImpactConfig::default(),
            max_rate: 0.10,
        }
    }

    pub fn with_adv(mut self, adv: f64) -> Self {
        self.impact.enabled = true;
        self.impact.adv = Some(adv);
        self
    }

    pub fn with_impact_model(mut self, model: ImpactModel) -> Self {
        self.impact.model = model;
        self
    }

    pub fn base_rate(&self) -> f64 {
        self.base_bps / 10_000.0
    }

    /// Half-spread as a rate.
    pub fn half_spread_rate(&self) -> f64 {
        self.spread_bps / 2.0 / 10_000.0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_non_negative("slippage.base_bps", self.base_bps)?;
        ensure_non_negative("slippage.spread_bps", self.spread_bps)?;
        ensure(
            self.max_rate.is_finite() && self.max_rate > 0.0 && self.max_rate < 1.0,
            "slippage.max_rate",
            "in (0, 1)",
            self.max_rate,
        )?;
        self.time_of_day.validate()?;
        self.volatility.validate()?;
        self.panic.validate()?;
        self.impact.validate()?;

        let floor = self.base_rate() + self.half_spread_rate();
        if floor > self.max_rate {
            return Err(ConfigError::Contradictory(format!(
                "base + half spread ({floor}) exceeds slippage.max_rate ({})",
                self.max_rate
            )));
        }
        Ok(())
    }
}

/// Premiums charged near the session open and close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeOfDayConfig {
    pub enabled: bool,
    pub window_minutes: u32,
    pub open_premium_bps: f64,
    pub close_premium_bps: f64,
}

impl Default for TimeOfDayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_minutes: 30,
            open_premium_bps: 5.0,
            close_premium_bps: 3.0,
        }
    }
}

impl TimeOfDayConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled {
            ensure(
                self.window_minutes > 0,
                "slippage.time_of_day.window_minutes",
                "> 0 when enabled",
                f64::from(self.window_minutes),
            )?;
        }
        ensure_non_negative("slippage.time_of_day.open_premium_bps", self.open_premium_bps)?;
        ensure_non_negative("slippage.time_of_day.close_premium_bps", self.close_premium_bps)
    }
}

/// Intrabar-range volatility component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    pub enabled: bool,
    /// Fraction of `(high - low) / close` charged as slippage.
    pub multiplier: f64,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            multiplier: 0.1,
        }
    }
}

impl VolatilityConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_non_negative("slippage.volatility.multiplier", self.multiplier)
    }
}

/// Panic-bar detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanicConfig {
    pub enabled: bool,
    /// Range fraction above which a bar counts as a panic bar.
    pub threshold: f64,
    /// Multiplier on the volatility component for panic bars (> 1).
    pub multiplier: f64,
    /// Flat premium charged on panic bars, on top of the scaled volatility term.
    /// Keeps a detected panic costly even with a zero volatility multiplier.
    pub premium_bps: f64,
}

impl Default for PanicConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.05,
            multiplier: 2.0,
            premium_bps: 10.0,
        }
    }
}

impl PanicConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.threshold.is_finite() && self.threshold > 0.0,
            "slippage.panic.threshold",
            "finite and > 0",
            self.threshold,
        )?;
        ensure(
            self.multiplier.is_finite() && self.multiplier > 1.0,
            "slippage.panic.multiplier",
            "finite and > 1",
            self.multiplier,
        )?;
        ensure(
            self.premium_bps.is_finite() && self.premium_bps > 0.0,
            "slippage.panic.premium_bps",
            "finite and > 0",
            self.premium_bps,
        )
    }

    /// Premium as a fraction.
    pub fn premium_rate(&self) -> f64 {
        self.premium_bps / 10_000.0
    }
}

/// Order-size market impact. Inactive unless enabled with a positive ADV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    pub enabled: bool,
    /// Average daily volume, in the same units as order quantity.
    pub adv: Option<f64>,
    pub model: ImpactModel,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            adv: None,
            model: ImpactModel::default(),
        }
    }
}

impl ImpactConfig {
    /// ADV usable as a divisor, if impact is enabled.
    pub fn active_adv(&self) -> Option<f64> {
        if !self.enabled {
            return None;
        }
        self.adv.filter(|adv| adv.is_finite() && *adv > 0.0)
    }

    /// Impact is enabled but has no usable ADV (missing, zero or non-finite).
    pub fn adv_unusable(&self) -> bool {
        self.enabled && self.active_adv().is_none()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(adv) = self.adv {
            // Zero ADV is tolerated; the model degrades to base + spread.
            ensure_non_negative("slippage.impact.adv", adv)?;
        }
        self.model.validate()
    }
}
