//! Trading signals produced by a `SignalSource`.

use serde::{Deserialize, Serialize};

use super::order::OrderSide;

/// What the signal asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    Buy,
    Sell,
    Hold,
}

/// Predicted price direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    #[default]
    Neutral,
}

/// One signal evaluation.
///
/// Only `kind` is required. The optional fields refine position management:
/// `atr` drives stop distance, `target_price` the take-profit level, and
/// `direction` the directional-accuracy statistic (derived from `kind` when neutral).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalType,
    #[serde(default)]
    pub direction: Direction,
    /// Confidence in [0, 100].
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub target_price: Option<f64>,
    /// Predicted change in percent.
    #[serde(default)]
    pub predicted_change: Option<f64>,
    #[serde(default)]
    pub atr: Option<f64>,
    #[serde(default)]
    pub prediction_error: Option<f64>,
}

impl Signal {
    pub fn new(kind: SignalType, confidence: f64) -> Self {
        Self {
            kind,
            direction: Direction::Neutral,
            confidence,
            target_price: None,
            predicted_change: None,
            atr: None,
            prediction_error: None,
        }
    }

    pub fn hold() -> Self {
        Self::new(SignalType::Hold, 0.0)
    }

    pub fn buy(confidence: f64) -> Self {
        Self::new(SignalType::Buy, confidence).with_direction(Direction::Up)
    }

    pub fn sell(confidence: f64) -> Self {
        Self::new(SignalType::Sell, confidence).with_direction(Direction::Down)
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_target(mut self, target_price: f64) -> Self {
        self.target_price = Some(target_price);
        self
    }

    pub fn with_atr(mut self, atr: f64) -> Self {
        self.atr = Some(atr);
        self
    }

    pub fn with_predicted_change(mut self, pct: f64) -> Self {
        self.predicted_change = Some(pct);
        self
    }

    /// Order side this signal would open, if any.
    pub fn entry_side(&self) -> Option<OrderSide> {
        match self.kind {
            SignalType::Buy => Some(OrderSide::Buy),
            SignalType::Sell => Some(OrderSide::Sell),
            SignalType::Hold => None,
        }
    }

    /// Direction used for accuracy scoring.
    pub fn predicted_direction(&self) -> Direction {
        match (self.direction, self.kind) {
            (Direction::Neutral, SignalType::Buy) => Direction::Up,
            (Direction::Neutral, SignalType::Sell) => Direction::Down,
            (direction, _) => direction,
        }
    }

    /// ATR usable for stop placement (finite and positive).
    pub fn usable_atr(&self) -> Option<f64> {
        self.atr.filter(|a| a.is_finite() && *a > 0.0)
    }
}
