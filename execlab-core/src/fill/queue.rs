//! Carryover queue: unfilled remainders waiting for a later bar.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::domain::{OrderId, OrderSide};

/// Unfilled remainder of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarryoverOrder {
    pub order_id: OrderId,
    pub side: OrderSide,
    /// Reference price of the original order; used when a retry bar has no valid open.
    pub reference_price: f64,
    pub original_quantity: f64,
    pub remaining_quantity: f64,
    /// `last processed bar - created_bar`. Zero when first queued.
    pub bars_in_queue: usize,
    pub created_bar: usize,
}

impl CarryoverOrder {
    /// Bars elapsed since creation, or `None` if `bar_index` precedes it.
    pub fn age_at(&self, bar_index: usize) -> Option<usize> {
        bar_index.checked_sub(self.created_bar)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOrderStatus {
    pub order_id: OrderId,
    pub side: OrderSide,
    pub remaining_quantity: f64,
    pub bars_in_queue: usize,
    pub created_bar: usize,
}

/// Snapshot of the carryover queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub total_orders: usize,
    pub total_remaining_quantity: f64,
    /// Orders dropped for exceeding the queue duration, over the simulator's lifetime.
    pub cancelled_orders: usize,
    pub cancelled_quantity: f64,
    pub orders: Vec<QueuedOrderStatus>,
}

/// FIFO of carryover orders plus cancellation tallies.
#[derive(Debug, Clone, Default)]
pub struct OrderQueue {
    orders: VecDeque<CarryoverOrder>,
    cancelled_orders: usize,
    cancelled_quantity: f64,
}

impl OrderQueue {
    pub fn push(&mut self, order: CarryoverOrder) {
        self.orders.push_back(order);
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CarryoverOrder> {
        self.orders.iter()
    }

    /// Take every queued order, oldest first.
    pub(crate) fn take_all(&mut self) -> VecDeque<CarryoverOrder> {
        std::mem::take(&mut self.orders)
    }

    pub(crate) fn restore(&mut self, orders: VecDeque<CarryoverOrder>) {
        debug_assert!(self.orders.is_empty());
        self.orders = orders;
    }

    pub(crate) fn record_cancellation(&mut self, order: &CarryoverOrder) {
        self.cancelled_orders += 1;
        self.cancelled_quantity += order.remaining_quantity;
    }

    /// Drop every queued order without counting it as cancelled. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.orders.len();
        self.orders.clear();
        dropped
    }

    pub fn cancelled_orders(&self) -> usize {
        self.cancelled_orders
    }

    pub fn total_remaining(&self) -> f64 {
        self.orders.iter().map(|o| o.remaining_quantity).sum()
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            total_orders: self.orders.len(),
            total_remaining_quantity: self.total_remaining(),
            cancelled_orders: self.cancelled_orders,
            cancelled_quantity: self.cancelled_quantity,
            orders: self
                .orders
                .iter()
                .map(|o| QueuedOrderStatus {
                    order_id: o.order_id,
                    side: o.side,
                    remaining_quantity: o.remaining_quantity,
                    bars_in_queue: o.bars_in_queue,
                    created_bar: o.created_bar,
                })
                .collect(),
        }
    }
}
