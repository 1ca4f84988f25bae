//! Order status reconciliation
//!
//! Exchange updates can arrive out of order. The tracker keeps the latest
//! accepted state per exchange id and drops updates that would move an order
//! backwards in the NEW < PARTIALLY_FILLED < terminal progression.

use super::{Order, OrderStatus};
use std::collections::HashMap;

/// Tracks the latest known state of each submitted order
#[derive(Debug, Default)]
pub struct OrderTracker {
    /// Latest accepted order by exchange id
    orders: HashMap<String, Order>,
    /// Number of stale updates dropped
    dropped: usize,
}

impl OrderTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an update; returns false when it was stale and dropped
    ///
    /// Orders without an exchange id cannot be reconciled and are ignored.
    pub fn apply(&mut self, update: &Order) -> bool {
        let Some(exchange_id) = update.exchange_id.as_deref() else {
            return false;
        };

        if let Some(current) = self.orders.get(exchange_id) {
            if is_stale(current, update) {
                self.dropped += 1;
                tracing::debug!(
                    %exchange_id,
                    current = %current.status,
                    update = %update.status,
                    "Dropping stale order update"
                );
                return false;
            }
        }

        self.orders.insert(exchange_id.to_string(), update.clone());
        true
    }

    /// Latest accepted state of an order
    pub fn get(&self, exchange_id: &str) -> Option<&Order> {
        self.orders.get(exchange_id)
    }

    /// Latest accepted status of an order
    pub fn status(&self, exchange_id: &str) -> Option<OrderStatus> {
        self.orders.get(exchange_id).map(|o| o.status)
    }

    /// Orders that have not reached a terminal state
    pub fn open_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values().filter(|o| !o.status.is_terminal())
    }

    /// Number of stale updates dropped so far
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

fn is_stale(current: &Order, update: &Order) -> bool {
    if current.status.is_terminal() {
        return true;
    }
    let (cur, new) = (current.status.severity(), update.status.severity());
    new < cur || (new == cur && update.executed_qty < current.executed_qty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Side;
    use rust_decimal_macros::dec;

    fn update(status: OrderStatus, executed: rust_decimal::Decimal) -> Order {
        let mut order = Order::limit("BTCUSDT", Side::Buy, dec!(10), dec!(100));
        order.exchange_id = Some("ex-1".into());
        order.status = status;
        order.executed_qty = executed;
        order
    }

    #[test]
    fn test_forward_progression() {
        let mut tracker = OrderTracker::new();
        assert!(tracker.apply(&update(OrderStatus::New, dec!(0))));
        assert!(tracker.apply(&update(OrderStatus::PartiallyFilled, dec!(4))));
        assert!(tracker.apply(&update(OrderStatus::PartiallyFilled, dec!(7))));
        assert!(tracker.apply(&update(OrderStatus::Filled, dec!(10))));
        assert_eq!(tracker.status("ex-1"), Some(OrderStatus::Filled));
        assert_eq!(tracker.dropped(), 0);
    }

    #[test]
    fn test_stale_updates_dropped() {
        let mut tracker = OrderTracker::new();
        assert!(tracker.apply(&update(OrderStatus::PartiallyFilled, dec!(5))));
        assert!(!tracker.apply(&update(OrderStatus::New, dec!(0))));
        assert!(!tracker.apply(&update(OrderStatus::PartiallyFilled, dec!(3))));
        assert_eq!(tracker.status("ex-1"), Some(OrderStatus::PartiallyFilled));
        assert_eq!(tracker.dropped(), 2);
    }

    #[test]
    fn test_terminal_never_reverts() {
        let mut tracker = OrderTracker::new();
        assert!(tracker.apply(&update(OrderStatus::Canceled, dec!(0))));
        assert!(!tracker.apply(&update(OrderStatus::Filled, dec!(10))));
        assert!(!tracker.apply(&update(OrderStatus::New, dec!(0))));
        assert_eq!(tracker.status("ex-1"), Some(OrderStatus::Canceled));
        assert_eq!(tracker.open_orders().count(), 0);
    }

    #[test]
    fn test_missing_exchange_id_ignored() {
        let mut tracker = OrderTracker::new();
        let order = Order::market("BTCUSDT", Side::Buy, dec!(1));
        assert!(!tracker.apply(&order));
        assert_eq!(tracker.dropped(), 0);
    }
}
