//! Open-order book of pending sells
//!
//! Every executed buy creates one pending sell obligation with its own
//! profit target. The book is drained per tick from a stable snapshot so
//! removals never skip or double-process a neighboring order.

use serde::{Deserialize, Serialize};

/// A pending sell obligation created by a prior buy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub buy_price: f64,
    pub sell_price: f64,
    pub quantity: f64,
}

/// Set of pending sell orders, in creation order
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    orders: Vec<OpenOrder>,
}

impl OrderBook {
    pub fn new() -> Self {
        OrderBook::default()
    }

    /// Register the sell obligation for an executed buy.
    ///
    /// The profit target is `buy_price * (1 + up_fraction)`.
    pub fn register_buy(&mut self, buy_price: f64, quantity: f64, up_fraction: f64) {
        let sell_price = buy_price * (1.0 + up_fraction);
        self.orders.push(OpenOrder {
            buy_price,
            sell_price,
            quantity,
        });
        tracing::debug!(buy_price, sell_price, quantity, "registered sell order");
    }

    /// Remove and return every order whose target the price has reached.
    ///
    /// Partitions the book in one pass over a snapshot of its current
    /// contents; surviving orders keep their relative order.
    pub fn take_matured(&mut self, price: f64) -> Vec<OpenOrder> {
        let (matured, open): (Vec<OpenOrder>, Vec<OpenOrder>) = self
            .orders
            .drain(..)
            .partition(|order| price >= order.sell_price);
        self.orders = open;
        matured
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Pending orders, oldest first
    pub fn orders(&self) -> &[OpenOrder] {
        &self.orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn register_sets_target_from_buy_price() {
        let mut book = OrderBook::new();
        book.register_buy(19_600.0, 0.005, 0.04);

        assert_eq!(book.len(), 1);
        assert_relative_eq!(book.orders()[0].sell_price, 20_384.0);
    }

    #[test]
    fn take_matured_removes_only_reached_targets() {
        let mut book = OrderBook::new();
        book.register_buy(19_600.0, 0.005, 0.04); // target 20384
        book.register_buy(19_200.0, 0.005, 0.04); // target 19968

        let matured = book.take_matured(20_000.0);
        assert_eq!(matured.len(), 1);
        assert_relative_eq!(matured[0].buy_price, 19_200.0);

        assert_eq!(book.len(), 1);
        assert_relative_eq!(book.orders()[0].buy_price, 19_600.0);
    }

    #[test]
    fn take_matured_handles_adjacent_orders_in_one_tick() {
        // Adjacent matured entries must all be drained in a single pass;
        // removal during iteration must not skip the neighbor.
        let mut book = OrderBook::new();
        book.register_buy(100.0, 1.0, 0.04);
        book.register_buy(101.0, 1.0, 0.04);
        book.register_buy(102.0, 1.0, 0.04);
        book.register_buy(200.0, 1.0, 0.04);

        let matured = book.take_matured(110.0);
        assert_eq!(matured.len(), 3);
        assert_eq!(book.len(), 1);
        assert_relative_eq!(book.orders()[0].buy_price, 200.0);
    }

    #[test]
    fn take_matured_below_all_targets_is_a_noop() {
        let mut book = OrderBook::new();
        book.register_buy(100.0, 1.0, 0.04);

        assert!(book.take_matured(103.0).is_empty());
        assert_eq!(book.len(), 1);
    }
}
