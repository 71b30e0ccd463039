//! Completed round-trip trades, the only input to performance statistics.

use serde::{Deserialize, Serialize};

use super::order::OrderSide;
use super::signal::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn from_entry(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => PositionSide::Long,
            OrderSide::Sell => PositionSide::Short,
        }
    }

    pub fn entry_side(&self) -> OrderSide {
        match self {
            PositionSide::Long => OrderSide::Buy,
            PositionSide::Short => OrderSide::Sell,
        }
    }

    pub fn exit_side(&self) -> OrderSide {
        self.entry_side().opposite()
    }

    /// +1 long, -1 short.
    pub fn sign(&self) -> f64 {
        self.entry_side().sign()
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    HoldingHorizon,
    OpposingSignal,
    EndOfSeries,
}

/// A closed position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTrade {
    pub side: PositionSide,
    pub entry_bar: usize,
    pub exit_bar: usize,
    /// Volume-weighted reference (pre-slippage) entry price.
    pub entry_reference: f64,
    /// Volume-weighted achieved entry price.
    pub entry_price: f64,
    pub exit_reference: f64,
    pub exit_price: f64,
    pub quantity: f64,
    /// Net return in percent, after slippage on both legs.
    pub return_pct: f64,
    pub predicted_direction: Direction,
    /// Raw reference move agreed with the predicted direction.
    pub direction_correct: bool,
    pub exit_reason: ExitReason,
    pub confidence: f64,
}

impl CompletedTrade {
    pub fn is_winner(&self) -> bool {
        self.return_pct > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }
}

/// Net percent return for a position, from achieved prices.
pub fn net_return_pct(side: PositionSide, entry_price: f64, exit_price: f64) -> f64 {
    if !(entry_price > 0.0) {
        return 0.0;
    }
    side.sign() * (exit_price - entry_price) / entry_price * 100.0
}

/// Whether the raw reference move matched a predicted direction.
pub fn direction_matched(predicted: Direction, entry_reference: f64, exit_reference: f64) -> bool {
    match predicted {
        Direction::Up => exit_reference > entry_reference,
        Direction::Down => exit_reference < entry_reference,
        Direction::Neutral => false,
    }
}
