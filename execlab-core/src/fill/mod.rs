//! Partial fill simulation.
//!
//! How much of an order fills depends on its liquidity ratio against the bar's
//! volume. Small orders fill completely; larger ones fill a fraction given by
//! the configured `FillRateModel`, and the unfilled remainder is queued as a
//! `CarryoverOrder` to be retried on later bars until it fills or expires.
//!
//! The simulator owns its queue. Independent runs each construct their own.

pub mod config;
pub mod fill_rate;
pub mod queue;

pub use config::FillConfig;
pub use fill_rate::{CustomFillRate, FillRateFn, FillRateModel};
pub use queue::{CarryoverOrder, OrderQueue, QueueStatus, QueuedOrderStatus};

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::domain::{Market, Order, OrderId, OrderIdGen, OrderSide, PriceBar};
use crate::error::{ConfigError, EngineError};
use crate::slippage::{apply_rate, BarContext, SlippageBreakdown, SlippageModel};

/// Remainders smaller than this fraction of the request are filled outright.
const DUST_FRACTION: f64 = 1e-9;

/// Outcome of one fill attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillResult {
    pub order_id: OrderId,
    pub side: OrderSide,
    pub bar_index: usize,
    pub requested_quantity: f64,
    pub filled_quantity: f64,
    pub remaining_quantity: f64,
    /// Fraction of the request filled on this bar, in [0, 1].
    pub fill_rate: f64,
    pub liquidity_ratio: f64,
    pub reference_price: f64,
    pub fill_price: f64,
    /// Rate applied to the reference price (breakdown total, capped).
    pub slippage_rate: f64,
    /// `order_size` includes the bar-volume impact of the filled part when no ADV is set.
    pub breakdown: SlippageBreakdown,
    /// Impact rate of the requested quantity. Non-decreasing in order size.
    pub market_impact: f64,
    /// Queued remainder, if the order did not fill completely.
    pub carryover: Option<CarryoverOrder>,
}

impl FillResult {
    pub fn is_complete(&self) -> bool {
        self.remaining_quantity == 0.0
    }

    pub fn notional(&self) -> f64 {
        self.filled_quantity * self.fill_price
    }
}

#[derive(Debug)]
pub struct PartialFillSimulator {
    config: FillConfig,
    slippage: SlippageModel,
    market: Market,
    queue: OrderQueue,
    ids: OrderIdGen,
}

impl PartialFillSimulator {
    pub fn new(
        config: FillConfig,
        slippage: SlippageModel,
        market: Market,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            slippage,
            market,
            queue: OrderQueue::default(),
            ids: OrderIdGen::default(),
        })
    }

    pub fn config(&self) -> &FillConfig {
        &self.config
    }

    pub fn slippage(&self) -> &SlippageModel {
        &self.slippage
    }

    /// Mutable access for `update_config` / `adjust_for_liquidity`.
    pub fn slippage_mut(&mut self) -> &mut SlippageModel {
        &mut self.slippage
    }

    pub fn market(&self) -> Market {
        self.market
    }

    /// Replace the fill configuration. Queued orders are kept.
    pub fn update_config(&mut self, config: FillConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// `quantity / bar.volume`, or `zero_volume_ratio` when volume is unusable.
    pub fn liquidity_ratio(&self, quantity: f64, bar: &PriceBar) -> f64 {
        if bar.has_volume() {
            quantity / bar.volume
        } else {
            self.config.zero_volume_ratio
        }
    }

    pub fn fill_rate(&self, liquidity_ratio: f64) -> f64 {
        self.config.model.fill_rate(
            liquidity_ratio,
            self.config.liquidity_threshold,
            self.config.min_immediate_fill_rate,
        )
    }

    /// Impact rate of `quantity`: ADV impact when configured, else the
    /// bar-volume term `impact_coefficient × √ratio`.
    pub fn market_impact(&self, quantity: f64, liquidity_ratio: f64) -> f64 {
        if self.slippage.has_impact() {
            self.slippage.order_size_rate(quantity)
        } else if liquidity_ratio.is_finite() && liquidity_ratio > 0.0 {
            self.config.impact_coefficient * liquidity_ratio.sqrt()
        } else {
            0.0
        }
    }

    /// Allocate an order id for a new order.
    pub fn new_order(
        &mut self,
        side: OrderSide,
        reference_price: f64,
        quantity: f64,
        bar_index: usize,
    ) -> Order {
        Order {
            id: self.ids.next_id(),
            side,
            reference_price,
            quantity,
            submitted_bar: bar_index,
        }
    }

    /// Fill a fresh market order against `bar`, queueing any remainder.
    pub fn simulate_fill(
        &mut self,
        reference_price: f64,
        quantity: f64,
        side: OrderSide,
        bar: &PriceBar,
        bar_index: usize,
    ) -> FillResult {
        let order = self.new_order(side, reference_price, quantity, bar_index);
        self.simulate_order(&order, bar)
    }

    /// Fill an order built by `new_order` against the bar at its submission index.
    pub fn simulate_order(&mut self, order: &Order, bar: &PriceBar) -> FillResult {
        let mut result = self.execute(
            order.id,
            order.side,
            order.reference_price,
            order.quantity,
            bar,
            order.submitted_bar,
        );
        if result.remaining_quantity > 0.0 {
            let carry = CarryoverOrder {
                order_id: order.id,
                side: order.side,
                reference_price: order.reference_price,
                original_quantity: result.requested_quantity,
                remaining_quantity: result.remaining_quantity,
                bars_in_queue: 0,
                created_bar: order.submitted_bar,
            };
            tracing::debug!(
                order = %order.id,
                filled = result.filled_quantity,
                remaining = result.remaining_quantity,
                fill_rate = result.fill_rate,
                "partial fill, remainder queued"
            );
            self.queue.push(carry.clone());
            result.carryover = Some(carry);
        }
        result
    }

    /// Retry every queued order against a new bar, oldest first.
    ///
    /// Orders older than `max_queue_duration` bars are cancelled without a
    /// fill. Orders not yet due (created on or already processed at this bar)
    /// are left untouched. A bar index before an order's creation bar is a
    /// caller error and leaves the queue unchanged.
    pub fn process_queued_orders(
        &mut self,
        bar: &PriceBar,
        bar_index: usize,
    ) -> Result<Vec<FillResult>, EngineError> {
        if let Some(order) = self.queue.iter().find(|o| o.age_at(bar_index).is_none()) {
            return Err(EngineError::BarIndexRegression {
                order_id: order.order_id,
                bar_index,
                created_bar: order.created_bar,
            });
        }

        let pending = self.queue.take_all();
        let mut survivors = VecDeque::with_capacity(pending.len());
        let mut results = Vec::new();

        for mut order in pending {
            let age = bar_index - order.created_bar;
            if age <= order.bars_in_queue {
                survivors.push_back(order);
                continue;
            }
            if age > self.config.max_queue_duration {
                tracing::debug!(
                    order = %order.order_id,
                    remaining = order.remaining_quantity,
                    age,
                    "carryover expired"
                );
                self.queue.record_cancellation(&order);
                continue;
            }

            order.bars_in_queue = age;
            let reference = if bar.open.is_finite() && bar.open > 0.0 {
                bar.open
            } else {
                order.reference_price
            };
            let mut result = self.execute(
                order.order_id,
                order.side,
                reference,
                order.remaining_quantity,
                bar,
                bar_index,
            );
            if result.remaining_quantity > 0.0 {
                order.remaining_quantity = result.remaining_quantity;
                result.carryover = Some(order.clone());
                survivors.push_back(order);
            }
            results.push(result);
        }

        self.queue.restore(survivors);
        Ok(results)
    }

    /// Drop all queued orders. Returns how many were dropped.
    pub fn clear_queue(&mut self) -> usize {
        self.queue.clear()
    }

    pub fn queue_status(&self) -> QueueStatus {
        self.queue.status()
    }

    pub fn has_queued_orders(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Carryovers cancelled for exceeding the queue duration.
    pub fn cancelled_orders(&self) -> usize {
        self.queue.cancelled_orders()
    }

    /// One fill attempt. Does not touch the queue.
    fn execute(
        &self,
        order_id: OrderId,
        side: OrderSide,
        reference_price: f64,
        quantity: f64,
        bar: &PriceBar,
        bar_index: usize,
    ) -> FillResult {
        let quantity = if quantity.is_finite() && quantity > 0.0 {
            quantity
        } else {
            if quantity != 0.0 {
                tracing::warn!(order = %order_id, quantity, "unusable order quantity treated as zero");
            }
            0.0
        };

        let liquidity_ratio = self.liquidity_ratio(quantity, bar);
        let mut fill_rate = self.fill_rate(liquidity_ratio);
        let mut filled_quantity = quantity * fill_rate;
        let mut remaining_quantity = quantity - filled_quantity;
        if remaining_quantity <= quantity * DUST_FRACTION {
            filled_quantity = quantity;
            remaining_quantity = 0.0;
            fill_rate = 1.0;
        }

        let market_impact = self.market_impact(quantity, liquidity_ratio);

        let slip = self.slippage.calculate(
            reference_price,
            side,
            filled_quantity,
            Some(BarContext::new(bar, self.market)),
        );
        let mut breakdown = slip.breakdown;
        let price_ok = reference_price.is_finite() && reference_price > 0.0;
        if price_ok && filled_quantity > 0.0 && !self.slippage.has_impact() {
            let filled_ratio = self.liquidity_ratio(filled_quantity, bar);
            breakdown.order_size += self.market_impact(filled_quantity, filled_ratio);
        }
        let slippage_rate = self.slippage.cap(breakdown.total());

        FillResult {
            order_id,
            side,
            bar_index,
            requested_quantity: quantity,
            filled_quantity,
            remaining_quantity,
            fill_rate,
            liquidity_ratio,
            reference_price,
            fill_price: apply_rate(reference_price, side, slippage_rate),
            slippage_rate,
            breakdown,
            market_impact,
            carryover: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slippage::SlippageConfig;
    use chrono::{TimeZone, Utc};

    fn bar(volume: f64) -> PriceBar {
        PriceBar::new(
            Utc.with_ymd_and_hms(2024, 7, 15, 16, 0, 0).unwrap(),
            100.0,
            101.0,
            99.0,
            100.0,
            volume,
        )
    }

    fn simulator(config: FillConfig) -> PartialFillSimulator {
        let slippage = SlippageModel::new(SlippageConfig::default()).unwrap();
        PartialFillSimulator::new(config, slippage, Market::Us).unwrap()
    }

    #[test]
    fn small_order_fills_completely() {
        let mut sim = simulator(FillConfig::default());
        let result = sim.simulate_fill(100.0, 1_000.0, OrderSide::Buy, &bar(1_000_000.0), 0);
        assert_eq!(result.fill_rate, 1.0);
        assert_eq!(result.filled_quantity, 1_000.0);
        assert!(result.carryover.is_none());
        assert!(result.is_complete());
        assert!(!sim.has_queued_orders());
        assert!(result.fill_price > 100.0);
    }

    #[test]
    fn large_order_queues_remainder() {
        let mut sim = simulator(FillConfig::default());
        let result = sim.simulate_fill(100.0, 200_000.0, OrderSide::Buy, &bar(1_000_000.0), 3);
        // ratio 0.2 → 1 - 2 * 0.1 = 0.8
        assert!((result.fill_rate - 0.8).abs() < 1e-12);
        let carry = result.carryover.as_ref().unwrap();
        assert_eq!(carry.bars_in_queue, 0);
        assert_eq!(carry.created_bar, 3);
        assert!((carry.remaining_quantity - 40_000.0).abs() < 1e-6);
        assert_eq!(sim.queue_status().total_orders, 1);
    }

    #[test]
    fn zero_volume_uses_default_ratio() {
        let mut sim = simulator(FillConfig::default());
        let result = sim.simulate_fill(100.0, 10.0, OrderSide::Sell, &bar(0.0), 0);
        assert_eq!(result.liquidity_ratio, 1.0);
        // 1 - 2 * 0.9 < 0.3 → floor
        assert!((result.fill_rate - 0.3).abs() < 1e-12);
        assert!(result.fill_price < 100.0);
    }

    #[test]
    fn zero_quantity_is_a_no_op() {
        let mut sim = simulator(FillConfig::default());
        let result = sim.simulate_fill(100.0, 0.0, OrderSide::Buy, &bar(1_000.0), 0);
        assert_eq!(result.filled_quantity, 0.0);
        assert_eq!(result.remaining_quantity, 0.0);
        assert!(!sim.has_queued_orders());
    }

    #[test]
    fn fill_price_includes_volume_impact_of_filled_part() {
        let mut sim = simulator(FillConfig::default());
        let small = sim.simulate_fill(100.0, 100.0, OrderSide::Buy, &bar(1_000_000.0), 0);
        let large = sim.simulate_fill(100.0, 50_000.0, OrderSide::Buy, &bar(1_000_000.0), 0);
        assert!(large.fill_price > small.fill_price);
        assert!(large.market_impact > small.market_impact);
    }

    #[test]
    fn adv_impact_replaces_volume_impact() {
        let slippage = SlippageModel::new(SlippageConfig::default().with_adv(1_000_000.0)).unwrap();
        let mut sim = PartialFillSimulator::new(FillConfig::default(), slippage, Market::Us).unwrap();
        let result = sim.simulate_fill(100.0, 10_000.0, OrderSide::Buy, &bar(1_000_000.0), 0);
        // sqrt(0.01) * 0.1
        assert!((result.market_impact - 0.01).abs() < 1e-12);
    }

    #[test]
    fn retry_uses_bar_open_and_ages_order() {
        let mut sim = simulator(FillConfig::default());
        sim.simulate_fill(100.0, 500.0, OrderSide::Buy, &bar(1_000.0), 0);
        let mut next = bar(1_000.0);
        next.open = 102.0;
        next.high = 103.0;
        let results = sim.process_queued_orders(&next, 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].reference_price, 102.0);
        let status = sim.queue_status();
        if status.total_orders > 0 {
            assert_eq!(status.orders[0].bars_in_queue, 1);
        }
    }

    #[test]
    fn same_bar_processing_is_skipped() {
        let mut sim = simulator(FillConfig::default());
        sim.simulate_fill(100.0, 500.0, OrderSide::Buy, &bar(1_000.0), 4);
        let results = sim.process_queued_orders(&bar(1_000.0), 4).unwrap();
        assert!(results.is_empty());
        assert_eq!(sim.queue_status().total_orders, 1);
    }

    #[test]
    fn bar_index_regression_is_an_error() {
        let mut sim = simulator(FillConfig::default());
        sim.simulate_fill(100.0, 500.0, OrderSide::Buy, &bar(1_000.0), 4);
        let err = sim.process_queued_orders(&bar(1_000.0), 2).unwrap_err();
        assert!(matches!(
            err,
            EngineError::BarIndexRegression {
                bar_index: 2,
                created_bar: 4,
                ..
            }
        ));
        assert_eq!(sim.queue_status().total_orders, 1);
    }

    #[test]
    fn expired_orders_are_cancelled_without_fill() {
        let mut sim = simulator(FillConfig::default().with_max_queue_duration(1));
        sim.simulate_fill(100.0, 1_000.0, OrderSide::Buy, &bar(100.0), 0);
        let results = sim.process_queued_orders(&bar(100.0), 2).unwrap();
        assert!(results.is_empty());
        let status = sim.queue_status();
        assert_eq!(status.total_orders, 0);
        assert_eq!(status.cancelled_orders, 1);
        assert!(status.cancelled_quantity > 0.0);
    }

    #[test]
    fn clear_queue_drops_everything() {
        let mut sim = simulator(FillConfig::default());
        sim.simulate_fill(100.0, 1_000.0, OrderSide::Buy, &bar(100.0), 0);
        sim.simulate_fill(100.0, 1_000.0, OrderSide::Sell, &bar(100.0), 0);
        assert_eq!(sim.clear_queue(), 2);
        assert_eq!(sim.queue_status().total_orders, 0);
    }

    #[test]
    fn update_config_validates() {
        let mut sim = simulator(FillConfig::default());
        assert!(sim
            .update_config(FillConfig::default().with_min_immediate_fill_rate(-0.1))
            .is_err());
        assert_eq!(sim.config().min_immediate_fill_rate, 0.3);
    }
}
