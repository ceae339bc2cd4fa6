//! # Shelf
//!
//! A capacity-bounded, concurrently accessible container of orders for one
//! [`ShelfClass`].
//!
//! ## Concurrency
//! Orders live in a sharded [`DashMap`], so readers and writers on different
//! shards never wait for each other and iterating never observes a torn state.
//! Capacity is enforced by an atomic occupancy counter: [`Shelf::add`] reserves
//! a slot with a compare-and-swap before touching the map, so a shelf never
//! holds more than `capacity` orders no matter how many callers race, and an id
//! is stored at most once.

use crate::model::{Order, OrderId, ShelfClass};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info};

pub struct Shelf {
    class: ShelfClass,
    capacity: usize,
    orders: DashMap<OrderId, Order>,
    occupied: AtomicUsize,
}

impl Shelf {
    /// Creates an empty shelf sized by the class defaults.
    pub fn new(class: ShelfClass) -> Self {
        Self::with_capacity(class, class.capacity())
    }

    pub fn with_capacity(class: ShelfClass, capacity: usize) -> Self {
        Self {
            class,
            capacity,
            orders: DashMap::with_capacity(capacity),
            occupied: AtomicUsize::new(0),
        }
    }

    pub fn class(&self) -> ShelfClass {
        self.class
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of orders currently stored.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Stores `order` if there is a free slot and its id is not already held.
    ///
    /// Returns `false` without changing the shelf otherwise.
    pub fn add(&self, order: Order) -> bool {
        if !self.reserve_slot() {
            return false;
        }

        match self.orders.entry(order.id().clone()) {
            Entry::Occupied(_) => {
                self.release_slot();
                false
            }
            Entry::Vacant(slot) => {
                debug!(shelf = %self.class, order_id = %order.id(), "Added");
                slot.insert(order);
                true
            }
        }
    }

    /// Removes and returns the order with `order_id`, if held.
    pub fn take(&self, order_id: &OrderId) -> Option<Order> {
        let (_, order) = self.orders.remove(order_id)?;
        self.release_slot();
        debug!(shelf = %self.class, %order_id, "Removed");
        Some(order)
    }

    /// Removes the order with `order_id`; `false` if it was not on this shelf.
    pub fn remove(&self, order_id: &OrderId) -> bool {
        self.take(order_id).is_some()
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.orders.contains_key(order_id)
    }

    /// Point-in-time copy of the stored orders, in no particular order.
    pub fn snapshot(&self) -> Vec<Order> {
        self.orders.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Removes every order whose freshness at `now` is zero or below and
    /// returns the ones this call actually removed.
    pub fn sweep_expired(&self, now: Instant) -> Vec<Order> {
        let expired: Vec<Order> = self
            .snapshot()
            .into_iter()
            .filter(|order| order.is_expired_at(now))
            .filter_map(|order| self.take(order.id()))
            .collect();

        for order in &expired {
            info!(shelf = %self.class, order_id = %order.id(), name = order.name(), "Removed expired order");
        }
        expired
    }

    /// Evicts the order with the earliest creation instant.
    pub fn remove_oldest(&self) -> Option<Order> {
        // A concurrent remover can win the race for the chosen order; pick again.
        for _ in 0..=self.capacity {
            let oldest = self
                .snapshot()
                .into_iter()
                .min_by_key(|order| order.created_at_instant())?;

            if let Some(order) = self.take(oldest.id()) {
                return Some(order);
            }
        }
        None
    }

    fn reserve_slot(&self) -> bool {
        self.occupied
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |occupied| {
                (occupied < self.capacity).then_some(occupied + 1)
            })
            .is_ok()
    }

    fn release_slot(&self) {
        self.occupied.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Display for Shelf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.class.shelf_name())
    }
}

impl std::fmt::Debug for Shelf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shelf")
            .field("class", &self.class)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn order(id: &str, clock: &ManualClock) -> Order {
        Order::with_clock(id, format!("order-{id}"), ShelfClass::Hot, 100, 0.5, clock)
    }

    #[test]
    fn test_add_respects_capacity() {
        let clock = ManualClock::new();
        let shelf = Shelf::with_capacity(ShelfClass::Hot, 2);

        assert!(shelf.add(order("1", &clock)));
        assert!(shelf.add(order("2", &clock)));
        assert!(!shelf.add(order("3", &clock)));

        assert_eq!(shelf.len(), 2);
        assert!(!shelf.contains(&"3".into()));
    }

    #[test]
    fn test_add_rejects_duplicate_ids() {
        let clock = ManualClock::new();
        let shelf = Shelf::with_capacity(ShelfClass::Hot, 5);

        assert!(shelf.add(order("1", &clock)));
        assert!(!shelf.add(order("1", &clock)));
        assert_eq!(shelf.len(), 1);

        // The rejected duplicate must not leak a reserved slot.
        for id in ["2", "3", "4", "5"] {
            assert!(shelf.add(order(id, &clock)));
        }
        assert_eq!(shelf.len(), 5);
    }

    #[test]
    fn test_remove_and_contains() {
        let clock = ManualClock::new();
        let shelf = Shelf::new(ShelfClass::Hot);

        assert!(!shelf.remove(&"1".into()));
        assert!(shelf.add(order("1", &clock)));
        assert!(shelf.contains(&"1".into()));
        assert!(shelf.remove(&"1".into()));
        assert!(!shelf.contains(&"1".into()));
        assert!(!shelf.remove(&"1".into()));
        assert!(shelf.is_empty());
    }

    #[test]
    fn test_removal_frees_a_slot() {
        let clock = ManualClock::new();
        let shelf = Shelf::with_capacity(ShelfClass::Hot, 1);

        assert!(shelf.add(order("1", &clock)));
        assert!(!shelf.add(order("2", &clock)));
        assert!(shelf.remove(&"1".into()));
        assert!(shelf.add(order("2", &clock)));
    }

    #[test]
    fn test_sweep_expired_removes_only_expired() {
        let clock = ManualClock::new();
        let shelf = Shelf::new(ShelfClass::Hot);

        let short = Order::with_clock("short", "Fries", ShelfClass::Hot, 1, 1.0, &clock);
        let long = Order::with_clock("long", "Stew", ShelfClass::Hot, 100, 1.0, &clock);
        assert!(shelf.add(short.clone()));
        assert!(shelf.add(long));

        assert!(shelf.sweep_expired(clock.now()).is_empty());

        clock.advance(Duration::from_secs(1));
        let removed = shelf.sweep_expired(clock.now());
        assert_eq!(removed, vec![short]);
        assert!(!shelf.contains(&"short".into()));
        assert!(shelf.contains(&"long".into()));
    }

    #[test]
    fn test_remove_oldest() {
        let clock = ManualClock::new();
        let shelf = Shelf::new(ShelfClass::Hot);
        assert!(shelf.remove_oldest().is_none());

        for id in ["a", "b", "c"] {
            assert!(shelf.add(order(id, &clock)));
            clock.advance(Duration::from_millis(10));
        }

        let evicted = shelf.remove_oldest().unwrap();
        assert_eq!(evicted.id().0, "a");
        assert_eq!(shelf.len(), 2);
        assert_eq!(shelf.remove_oldest().unwrap().id().0, "b");
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let clock = ManualClock::new();
        let shelf = Shelf::new(ShelfClass::Hot);
        assert!(shelf.add(order("1", &clock)));

        let snapshot = shelf.snapshot();
        assert!(shelf.remove(&"1".into()));
        assert_eq!(snapshot.len(), 1);
        assert!(shelf.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_adds_never_exceed_capacity() {
        let clock = Arc::new(ManualClock::new());
        let shelf = Arc::new(Shelf::with_capacity(ShelfClass::Hot, 10));

        let mut handles = vec![];
        for i in 0..200 {
            let shelf = shelf.clone();
            let order = order(&i.to_string(), &clock);
            handles.push(tokio::spawn(async move { shelf.add(order) }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 10);
        assert_eq!(shelf.len(), 10);
        let ids: HashSet<_> = shelf.snapshot().into_iter().map(|o| o.id().clone()).collect();
        assert_eq!(ids.len(), 10);
    }
}
