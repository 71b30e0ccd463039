//! Per-symbol position state machine.
//!
//! `WaitingForSignal → PositionOpen → PositionClosed → WaitingForSignal`.
//! A position closed on bar t can only be replaced from bar t+1.

use crate::domain::{
    trade::{direction_matched, net_return_pct},
    CompletedTrade, Direction, ExitReason, PositionSide, PriceBar, Signal,
};
use crate::fill::FillResult;

use super::config::BacktestConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum PositionState {
    WaitingForSignal,
    PositionOpen(OpenPosition),
    PositionClosed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub side: PositionSide,
    pub entry_bar: usize,
    pub quantity: f64,
    /// Volume-weighted reference price over all entry fills.
    pub entry_reference: f64,
    /// Volume-weighted achieved price over all entry fills.
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: f64,
    pub predicted_direction: Direction,
    pub confidence: f64,
}

impl OpenPosition {
    /// Open from the first entry fill. Stop and target are fixed from its reference.
    pub fn open(
        side: PositionSide,
        signal: &Signal,
        fill: &FillResult,
        entry_bar: usize,
        config: &BacktestConfig,
    ) -> Self {
        let reference = fill.reference_price;
        let sign = side.sign();

        let pct_stop = reference * (1.0 - sign * config.stop_loss_pct);
        let stop_price = match signal.usable_atr() {
            Some(atr) => {
                let stop = reference - sign * atr * config.atr_stop_multiple;
                if stop > 0.0 {
                    stop
                } else {
                    pct_stop
                }
            }
            None => pct_stop,
        };

        let pct_target = reference * (1.0 + sign * config.take_profit_pct);
        let target_price = match signal.target_price {
            Some(t) if t.is_finite() && t > 0.0 && sign * (t - reference) > 0.0 => t,
            _ => pct_target,
        };

        Self {
            side,
            entry_bar,
            quantity: fill.filled_quantity,
            entry_reference: reference,
            entry_price: fill.fill_price,
            stop_price,
            target_price,
            predicted_direction: signal.predicted_direction(),
            confidence: signal.confidence,
        }
    }

    /// Top up from a carryover fill.
    pub fn add_fill(&mut self, fill: &FillResult) {
        let added = fill.filled_quantity;
        if !(added > 0.0) {
            return;
        }
        let total = self.quantity + added;
        self.entry_reference =
            (self.entry_reference * self.quantity + fill.reference_price * added) / total;
        self.entry_price = (self.entry_price * self.quantity + fill.fill_price * added) / total;
        self.quantity = total;
    }

    /// Stop, target and horizon checks, worst case first.
    ///
    /// Returns the exit reason and reference exit price. A bar that opens
    /// through a level exits at the open (gap).
    pub fn exit_check(
        &self,
        bar: &PriceBar,
        bar_index: usize,
        holding_horizon: usize,
    ) -> Option<(ExitReason, f64)> {
        match self.side {
            PositionSide::Long => {
                if bar.low <= self.stop_price {
                    return Some((ExitReason::StopLoss, bar.open.min(self.stop_price)));
                }
                if bar.high >= self.target_price {
                    return Some((ExitReason::TakeProfit, bar.open.max(self.target_price)));
                }
            }
            PositionSide::Short => {
                if bar.high >= self.stop_price {
                    return Some((ExitReason::StopLoss, bar.open.max(self.stop_price)));
                }
                if bar.low <= self.target_price {
                    return Some((ExitReason::TakeProfit, bar.open.min(self.target_price)));
                }
            }
        }
        if bar_index.saturating_sub(self.entry_bar) >= holding_horizon {
            return Some((ExitReason::HoldingHorizon, bar.close));
        }
        None
    }

    /// A signal pointing the other way.
    pub fn is_opposed_by(&self, signal: &Signal) -> bool {
        match signal.entry_side() {
            Some(side) => side == self.side.exit_side(),
            None => false,
        }
    }

    pub fn close(
        &self,
        exit_bar: usize,
        exit_reference: f64,
        exit_price: f64,
        exit_reason: ExitReason,
    ) -> CompletedTrade {
        CompletedTrade {
            side: self.side,
            entry_bar: self.entry_bar,
            exit_bar,
            entry_reference: self.entry_reference,
            entry_price: self.entry_price,
            exit_reference,
            exit_price,
            quantity: self.quantity,
            return_pct: net_return_pct(self.side, self.entry_price, exit_price),
            predicted_direction: self.predicted_direction,
            direction_correct: direction_matched(
                self.predicted_direction,
                self.entry_reference,
                exit_reference,
            ),
            exit_reason,
            confidence: self.confidence,
        }
    }
}
