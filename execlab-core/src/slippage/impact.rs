//! Market-impact functions of participation `p = quantity / ADV`.
//!
//! Every model is non-negative and non-decreasing in `p`.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImpactModel {
    /// `coefficient × p`
    Linear { coefficient: f64 },
    /// `coefficient × √p`: diminishing marginal impact.
    SquareRoot { coefficient: f64 },
    /// `temporary × p + permanent × √p`
    AlmgrenChriss { temporary: f64, permanent: f64 },
}

impl Default for ImpactModel {
    fn default() -> Self {
        ImpactModel::SquareRoot { coefficient: 0.1 }
    }
}

impl ImpactModel {
    pub fn name(&self) -> &'static str {
        match self {
            ImpactModel::Linear { .. } => "linear",
            ImpactModel::SquareRoot { .. } => "square_root",
            ImpactModel::AlmgrenChriss { .. } => "almgren_chriss",
        }
    }

    /// Impact rate for a participation. Non-positive or non-finite `p` yields 0.
    pub fn rate(&self, participation: f64) -> f64 {
        if !(participation.is_finite() && participation > 0.0) {
            return 0.0;
        }
        match *self {
            ImpactModel::Linear { coefficient } => coefficient * participation,
            ImpactModel::SquareRoot { coefficient } => coefficient * participation.sqrt(),
            ImpactModel::AlmgrenChriss {
                temporary,
                permanent,
            } => temporary * participation + permanent * participation.sqrt(),
        }
    }

    /// Same model with every coefficient multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        match *self {
            ImpactModel::Linear { coefficient } => ImpactModel::Linear {
                coefficient: coefficient * factor,
            },
            ImpactModel::SquareRoot { coefficient } => ImpactModel::SquareRoot {
                coefficient: coefficient * factor,
            },
            ImpactModel::AlmgrenChriss {
                temporary,
                permanent,
            } => ImpactModel::AlmgrenChriss {
                temporary: temporary * factor,
                permanent: permanent * factor,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            ImpactModel::Linear { coefficient } | ImpactModel::SquareRoot { coefficient } => {
                ensure_non_negative("slippage.impact.coefficient", coefficient)
            }
            ImpactModel::AlmgrenChriss {
                temporary,
                permanent,
            } => {
                ensure_non_negative("slippage.impact.temporary", temporary)?;
                ensure_non_negative("slippage.impact.permanent", permanent)
            }
        }
    }
}
