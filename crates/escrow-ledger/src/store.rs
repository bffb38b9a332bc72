//! The single authoritative mapping from order id to order record.
//!
//! An id is addressable iff its record carries a non-zero amount. A missing
//! record and a zero-amount record both read as "does not exist"; the
//! [`Amount`](escrow_types::Amount) type makes the second unreachable for
//! records written through the ledger, but a foreign backend may still
//! hand one back.

use std::collections::HashMap;

use escrow_types::{Order, OrderId};

/// Storage seam for order records.
///
/// Writes are unconditional: existence rules, duplicate handling and
/// rollback live in the ledger, which is the only writer.
pub trait OrderStore: Send + Sync {
    /// Fetch the record stored at `id`, if any.
    fn get(&self, id: &OrderId) -> Option<Order>;

    /// Store `order` at its id, returning the record it replaced.
    fn put(&mut self, order: Order) -> Option<Order>;

    /// Drop the record at `id`. Used only to undo a creation.
    fn remove(&mut self, id: &OrderId) -> Option<Order>;

    /// Every stored record, in no particular order.
    fn all(&self) -> Vec<Order>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The record at `id` if it is addressable.
    fn find(&self, id: &OrderId) -> Option<Order> {
        self.get(id).filter(|order| !order.amount.value().is_zero())
    }

    fn contains(&self, id: &OrderId) -> bool {
        self.find(id).is_some()
    }
}

/// `HashMap`-backed store.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: HashMap<OrderId, Order>,
}

impl InMemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn get(&self, id: &OrderId) -> Option<Order> {
        self.orders.get(id).cloned()
    }

    fn put(&mut self, order: Order) -> Option<Order> {
        self.orders.insert(order.id.clone(), order)
    }

    fn remove(&mut self, id: &OrderId) -> Option<Order> {
        self.orders.remove(id)
    }

    fn all(&self) -> Vec<Order> {
        self.orders.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.orders.len()
    }
}
