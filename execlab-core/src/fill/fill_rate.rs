//! Fill-rate curves: fraction of an order filled in one bar as a function of
//! its liquidity ratio (`quantity / bar volume`).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ensure, ConfigError};

/// Signature of a caller-supplied fill-rate curve.
///
/// Receives the excess ratio `ratio - liquidity_threshold` (always > 0) and
/// returns a fill rate; the simulator clamps the output.
pub type FillRateFn = dyn Fn(f64) -> f64 + Send + Sync;

/// Named caller-supplied curve.
#[derive(Clone)]
pub struct CustomFillRate {
    name: String,
    func: Arc<FillRateFn>,
}

impl CustomFillRate {
    pub fn new(name: impl Into<String>, func: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn eval(&self, excess: f64) -> f64 {
        (self.func)(excess)
    }
}

impl fmt::Debug for CustomFillRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomFillRate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for CustomFillRate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.func, &other.func)
    }
}

/// Fill-rate model. Each curve is non-increasing in the excess ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FillRateModel {
    /// `1 - steepness × excess`
    Linear { steepness: f64 },
    /// `min + (1 - min) × exp(-decay × excess)`
    Exponential { decay: f64 },
    /// Caller-supplied curve. Not representable in config files. Probed at
    /// validation for NaN outputs and for rising anywhere along the probes.
    #[serde(skip)]
    Custom(CustomFillRate),
}

impl Default for FillRateModel {
    fn default() -> Self {
        FillRateModel::Linear { steepness: 2.0 }
    }
}

/// Excess ratios used to probe custom curves at configuration time.
const CUSTOM_PROBES: [f64; 7] = [1e-9, 0.01, 0.1, 0.5, 1.0, 10.0, 1e6];

const MONOTONE_TOLERANCE: f64 = 1e-12;

impl FillRateModel {
    /// Build a named model with its coefficient.
    pub fn from_name(name: &str, coefficient: f64) -> Result<Self, ConfigError> {
        let model = match name.trim().to_ascii_lowercase().as_str() {
            "linear" => FillRateModel::Linear {
                steepness: coefficient,
            },
            "exponential" => FillRateModel::Exponential { decay: coefficient },
            "custom" => {
                return Err(ConfigError::Contradictory(
                    "a custom fill-rate model needs a function; use FillRateModel::custom".into(),
                ))
            }
            _ => return Err(ConfigError::UnknownFillModel(name.to_string())),
        };
        model.validate()?;
        Ok(model)
    }

    pub fn custom(
        name: impl Into<String>,
        func: impl Fn(f64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        FillRateModel::Custom(CustomFillRate::new(name, func))
    }

    pub fn name(&self) -> &str {
        match self {
            FillRateModel::Linear { .. } => "linear",
            FillRateModel::Exponential { .. } => "exponential",
            FillRateModel::Custom(custom) => custom.name(),
        }
    }

    /// Fill rate for a liquidity ratio, clamped to `[min_fill, 1]`.
    pub fn fill_rate(&self, ratio: f64, threshold: f64, min_fill: f64) -> f64 {
        if ratio <= threshold {
            return 1.0;
        }
        let excess = ratio - threshold;
        let raw = match self {
            FillRateModel::Linear { steepness } => 1.0 - steepness * excess,
            FillRateModel::Exponential { decay } => {
                min_fill + (1.0 - min_fill) * (-decay * excess).exp()
            }
            FillRateModel::Custom(custom) => custom.eval(excess),
        };
        if raw.is_nan() {
            return min_fill;
        }
        raw.clamp(min_fill, 1.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            FillRateModel::Linear { steepness } => ensure(
                steepness.is_finite() && *steepness > 0.0,
                "fill.model.steepness",
                "finite and > 0",
                *steepness,
            ),
            FillRateModel::Exponential { decay } => ensure(
                decay.is_finite() && *decay > 0.0,
                "fill.model.decay",
                "finite and > 0",
                *decay,
            ),
            FillRateModel::Custom(custom) => {
                let mut previous = 1.0;
                for probe in CUSTOM_PROBES {
                    let output = custom.eval(probe);
                    if output.is_nan() {
                        return Err(ConfigError::InvalidCustomFillRate {
                            name: custom.name().to_string(),
                            ratio: probe,
                            output,
                        });
                    }
                    // Compared after clamping: a curve may saturate, never rise.
                    let clamped = output.clamp(0.0, 1.0);
                    if clamped > previous + MONOTONE_TOLERANCE {
                        return Err(ConfigError::NonMonotoneCustomFillRate {
                            name: custom.name().to_string(),
                            ratio: probe,
                            previous,
                            output: clamped,
                        });
                    }
                    previous = clamped;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for FillRateModel {
    type Err = ConfigError;

    /// Parse a model name with its default coefficient.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Self::from_name(s, 2.0),
            "exponential" => Self::from_name(s, 5.0),
            _ => Self::from_name(s, f64::NAN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: f64 = 0.1;
    const MIN: f64 = 0.3;

    #[test]
    fn at_or_below_threshold_fills_fully() {
        let model = FillRateModel::default();
        assert_eq!(model.fill_rate(0.0, THRESHOLD, MIN), 1.0);
        assert_eq!(model.fill_rate(0.1, THRESHOLD, MIN), 1.0);
    }

    #[test]
    fn linear_curve() {
        let model = FillRateModel::Linear { steepness: 2.0 };
        // 1 - 2 * (0.2 - 0.1) = 0.8
        assert!((model.fill_rate(0.2, THRESHOLD, MIN) - 0.8).abs() < 1e-12);
        // clamps at the floor
        assert_eq!(model.fill_rate(5.0, THRESHOLD, MIN), MIN);
    }

    #[test]
    fn exponential_curve() {
        let model = FillRateModel::Exponential { decay: 5.0 };
        let rate = model.fill_rate(0.3, THRESHOLD, MIN);
        let expected = MIN + (1.0 - MIN) * (-5.0f64 * 0.2).exp();
        assert!((rate - expected).abs() < 1e-12);
        assert!(model.fill_rate(1e6, THRESHOLD, MIN) >= MIN);
    }

    #[test]
    fn custom_curve_is_clamped() {
        let model = FillRateModel::custom("wild", |excess| 2.0 - 10.0 * excess);
        assert_eq!(model.fill_rate(0.10001, THRESHOLD, MIN), 1.0);
        assert_eq!(model.fill_rate(5.0, THRESHOLD, MIN), MIN);
        assert_eq!(model.name(), "wild");
    }

    #[test]
    fn custom_nan_probe_rejected() {
        let model = FillRateModel::custom("broken", |excess| if excess > 1.0 { f64::NAN } else { 1.0 });
        assert!(matches!(
            model.validate(),
            Err(ConfigError::InvalidCustomFillRate { .. })
        ));
    }

    #[test]
    fn rising_custom_curve_rejected() {
        let model = FillRateModel::custom("rising", |excess| 0.3 + excess);
        assert!(matches!(
            model.validate(),
            Err(ConfigError::NonMonotoneCustomFillRate { ref name, .. }) if name == "rising"
        ));
    }

    #[test]
    fn saturating_custom_curve_accepted() {
        // Above 1 everywhere it is probed, so it clamps flat.
        let flat = FillRateModel::custom("flat_top", |excess| 5.0 - excess.min(1.0));
        flat.validate().unwrap();
        let decaying = FillRateModel::custom("decay", |excess| 1.0 / (1.0 + excess));
        decaying.validate().unwrap();
    }

    #[test]
    fn from_name_rejects_unknown() {
        assert!(matches!(
            FillRateModel::from_name("cubic", 1.0),
            Err(ConfigError::UnknownFillModel(name)) if name == "cubic"
        ));
        assert!(FillRateModel::from_name("custom", 1.0).is_err());
        assert!(FillRateModel::from_name("linear", 0.0).is_err());
    }

    #[test]
    fn from_str_uses_default_coefficients() {
        assert_eq!(
            "Exponential".parse::<FillRateModel>().unwrap(),
            FillRateModel::Exponential { decay: 5.0 }
        );
        assert!("quadratic".parse::<FillRateModel>().is_err());
    }

    #[test]
    fn custom_equality_is_by_identity() {
        let a = FillRateModel::custom("same", |_| 1.0);
        let b = FillRateModel::custom("same", |_| 1.0);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn toml_round_trip_for_named_models() {
        let model: FillRateModel = toml::from_str("kind = \"exponential\"\ndecay = 3.0").unwrap();
        assert_eq!(model, FillRateModel::Exponential { decay: 3.0 });
    }
}
