//! # Shelf Allocator
//!
//! The allocator owns one [`Shelf`] per [`ShelfClass`] and decides where an
//! incoming order goes. It is constructed once by the service and shared by
//! handle (`Arc<ShelfAllocator>`) with every worker; tests simply build a fresh
//! one.
//!
//! ## The Placement Cascade
//!
//! [`ShelfAllocator::place`] first refuses an id that is already on a shelf
//! ([`AllocationError::AlreadyPlaced`]). Otherwise it tries, in order, stopping
//! at the first success:
//!
//! 1. **Home shelf** - sweep expired orders off the order's own shelf, then add.
//! 2. **Overflow shelf** - sweep it, then add.
//! 3. **Reshuffle** - move overflow occupants back to their own home shelves
//!    wherever a home slot is free.
//! 4. **Overflow again** - retry the add.
//! 5. **Evict** - discard the oldest overflow occupant and retry the add.
//! 6. **Give up** - [`AllocationError::PlacementExhausted`].
//!
//! ## Consistency Under Concurrency
//!
//! Each shelf synchronizes on its own; there is no lock spanning shelves, so two
//! placements interleave freely. What that means in practice:
//!
//! - A shelf never holds more than its capacity and never holds an id twice.
//! - An id is claimed for the duration of its placement, so two concurrent
//!   placements of the same order cannot both pass the duplicate check.
//! - While step 3 relocates an order, it is briefly visible on both its home
//!   shelf and overflow. If the overflow removal loses a race (the order was
//!   picked up or expired in between), the home copy is withdrawn again.
//! - A slot freed by step 5 can be claimed by a racing placement, in which case
//!   the retry fails and the order is reported as exhausted.

use crate::clock::Clock;
use crate::model::{Order, OrderId, ShelfClass};
use crate::shelf::{AllocationError, Shelf};
use crate::stats::Stats;
use dashmap::DashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

pub struct ShelfAllocator {
    shelves: [Shelf; 4],
    placing: DashSet<OrderId>,
    clock: Arc<dyn Clock>,
    stats: Arc<Stats>,
}

/// Releases an id claimed by [`ShelfAllocator::place`].
struct PlacementClaim<'a> {
    placing: &'a DashSet<OrderId>,
    order_id: &'a OrderId,
}

impl Drop for PlacementClaim<'_> {
    fn drop(&mut self) {
        self.placing.remove(self.order_id);
    }
}

impl ShelfAllocator {
    /// Creates an allocator with one empty shelf per class, sized by the class defaults.
    pub fn new(clock: Arc<dyn Clock>, stats: Arc<Stats>) -> Self {
        Self {
            shelves: ShelfClass::ALL.map(Shelf::new),
            placing: DashSet::new(),
            clock,
            stats,
        }
    }

    pub fn shelf(&self, class: ShelfClass) -> &Shelf {
        &self.shelves[class.index()]
    }

    pub fn overflow(&self) -> &Shelf {
        self.shelf(ShelfClass::OVERFLOW)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }

    /// Finds a shelf for `order` using the placement cascade.
    ///
    /// # Returns
    ///
    /// - `Ok(shelf)` with the shelf now holding the order
    /// - `Err(AlreadyPlaced)` if the id is already on a shelf; the stored copy
    ///   is left alone
    /// - `Err(PlacementExhausted)` if every step failed; the caller should count
    ///   the order as discarded and must not retry it
    #[instrument(skip(self, order), fields(order_id = %order.id(), class = %order.shelf_class()))]
    pub fn place(&self, order: &Order) -> Result<&Shelf, AllocationError> {
        let already_placed = || AllocationError::AlreadyPlaced {
            order_id: order.id().clone(),
        };

        if !self.placing.insert(order.id().clone()) {
            warn!("Order is already being placed");
            return Err(already_placed());
        }
        let _claim = PlacementClaim {
            placing: &self.placing,
            order_id: order.id(),
        };

        if let Some(shelf) = self.locate(order.id()) {
            warn!(%shelf, "Order is already on a shelf");
            return Err(already_placed());
        }

        self.cascade(order)
    }

    fn cascade(&self, order: &Order) -> Result<&Shelf, AllocationError> {
        let now = self.clock.now();

        // 1. Home shelf
        let home = self.shelf(order.shelf_class());
        self.sweep(home, now);
        if home.add(order.clone()) {
            debug!(shelf = %home, "Placed on home shelf");
            return Ok(home);
        }

        // 2. Overflow shelf
        let overflow = self.overflow();
        self.sweep(overflow, now);
        if overflow.add(order.clone()) {
            debug!(shelf = %overflow, "Placed on overflow shelf");
            return Ok(overflow);
        }

        // 3. Send misplaced overflow orders home, 4. retry
        let moved = self.reshuffle();
        if overflow.add(order.clone()) {
            debug!(moved, "Placed on overflow shelf after reshuffle");
            return Ok(overflow);
        }

        // 5. Evict the oldest overflow occupant, retry
        if let Some(evicted) = overflow.remove_oldest() {
            self.stats.record_discarded();
            warn!(evicted_id = %evicted.id(), evicted_name = evicted.name(), "Discarded oldest overflow order");
            if overflow.add(order.clone()) {
                debug!("Placed on overflow shelf after eviction");
                return Ok(overflow);
            }
        }

        // 6. Nothing left to try
        warn!("Could not place order on any shelf");
        Err(AllocationError::PlacementExhausted {
            order_id: order.id().clone(),
        })
    }

    /// Removes the order for a courier.
    ///
    /// The declared class's shelf is checked first, then overflow, since an
    /// order may have been placed there when its home shelf was full.
    #[instrument(skip(self))]
    pub fn pickup(&self, order_id: &OrderId, class: ShelfClass) -> bool {
        let home = self.shelf(class);
        if home.remove(order_id) {
            info!(shelf = %home, "Picked up");
            return true;
        }

        let overflow = self.overflow();
        if !class.is_overflow() && overflow.remove(order_id) {
            info!(shelf = %overflow, "Picked up");
            return true;
        }

        debug!("Order not on any shelf");
        false
    }

    /// The class of the shelf currently holding `order_id`, if any.
    pub fn locate(&self, order_id: &OrderId) -> Option<ShelfClass> {
        self.shelves
            .iter()
            .find(|shelf| shelf.contains(order_id))
            .map(Shelf::class)
    }

    /// Sweeps one shelf at `now`; the removals are counted as expired.
    pub fn sweep_shelf(&self, class: ShelfClass, now: Instant) -> Vec<Order> {
        self.sweep(self.shelf(class), now)
    }

    /// Sweeps every shelf at the clock's current time.
    pub fn sweep_all(&self) -> Vec<Order> {
        let now = self.clock.now();
        self.shelves
            .iter()
            .flat_map(|shelf| self.sweep(shelf, now))
            .collect()
    }

    /// Current `(class, len)` for every shelf.
    pub fn occupancy(&self) -> Vec<(ShelfClass, usize)> {
        self.shelves
            .iter()
            .map(|shelf| (shelf.class(), shelf.len()))
            .collect()
    }

    /// Total number of orders across all shelves.
    pub fn total_orders(&self) -> usize {
        self.shelves.iter().map(Shelf::len).sum()
    }

    fn sweep(&self, shelf: &Shelf, now: Instant) -> Vec<Order> {
        let expired = shelf.sweep_expired(now);
        if !expired.is_empty() {
            self.stats.record_expired(expired.len() as u64);
        }
        expired
    }

    fn reshuffle(&self) -> usize {
        let overflow = self.overflow();
        let mut moved = 0;

        for order in overflow.snapshot() {
            if order.shelf_class().is_overflow() {
                continue;
            }
            let home = self.shelf(order.shelf_class());
            if !home.add(order.clone()) {
                continue;
            }
            if overflow.remove(order.id()) {
                moved += 1;
                debug!(order_id = %order.id(), shelf = %home, "Moved from overflow to home shelf");
            } else {
                // Picked up or expired while we were moving it.
                home.remove(order.id());
            }
        }

        moved
    }
}

impl std::fmt::Debug for ShelfAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShelfAllocator")
            .field("shelves", &self.shelves)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn allocator() -> (ShelfAllocator, Arc<ManualClock>, Arc<Stats>) {
        let clock = Arc::new(ManualClock::new());
        let stats = Arc::new(Stats::new());
        (ShelfAllocator::new(clock.clone(), stats.clone()), clock, stats)
    }

    fn fill(allocator: &ShelfAllocator, clock: &ManualClock, class: ShelfClass, count: usize, prefix: &str) -> Vec<Order> {
        (1..=count)
            .map(|i| {
                let order = Order::with_clock(format!("{prefix}-{i}"), format!("{prefix} {i}"), class, 1000, 0.5, clock);
                allocator.place(&order).unwrap();
                clock.advance(Duration::from_millis(1));
                order
            })
            .collect()
    }

    #[test]
    fn test_place_on_home_shelf() {
        let (allocator, clock, _) = allocator();

        for class in [ShelfClass::Hot, ShelfClass::Cold, ShelfClass::Frozen] {
            let order = Order::with_clock(format!("100-{class}"), "testOrder", class, 1, 0.5, clock.as_ref());
            let shelf = allocator.place(&order).unwrap();
            assert_eq!(shelf.class(), class);
            assert!(shelf.contains(order.id()));
        }
    }

    #[test]
    fn test_full_home_routes_to_overflow() {
        let (allocator, clock, _) = allocator();
        fill(&allocator, &clock, ShelfClass::Cold, ShelfClass::Cold.capacity(), "cold");

        let order = Order::with_clock("100", "testOrder", ShelfClass::Cold, 1, 0.5, clock.as_ref());
        let shelf = allocator.place(&order).unwrap();

        assert_eq!(shelf.class(), ShelfClass::Overflow);
        assert_eq!(allocator.locate(order.id()), Some(ShelfClass::Overflow));
    }

    #[test]
    fn test_home_slot_is_preferred_once_free() {
        let (allocator, clock, _) = allocator();
        let orders = fill(
            &allocator,
            &clock,
            ShelfClass::Hot,
            ShelfClass::Hot.capacity() + ShelfClass::Overflow.capacity(),
            "hot",
        );

        assert!(allocator.pickup(orders[0].id(), ShelfClass::Hot));

        let order = Order::with_clock("new", "newOrder", ShelfClass::Hot, 100, 0.5, clock.as_ref());
        assert_eq!(allocator.place(&order).unwrap().class(), ShelfClass::Hot);
    }

    #[test]
    fn test_pre_placement_sweep_counts_expired() {
        let (allocator, clock, stats) = allocator();
        let stale = Order::with_clock("stale", "Fries", ShelfClass::Hot, 1, 1.0, clock.as_ref());
        allocator.place(&stale).unwrap();

        clock.advance(Duration::from_secs(2));
        let fresh = Order::with_clock("fresh", "Burger", ShelfClass::Hot, 100, 1.0, clock.as_ref());
        allocator.place(&fresh).unwrap();

        assert_eq!(allocator.locate(stale.id()), None);
        assert_eq!(stats.snapshot().expired, 1);
    }

    #[test]
    fn test_pickup_falls_back_to_overflow() {
        let (allocator, clock, _) = allocator();
        fill(&allocator, &clock, ShelfClass::Frozen, ShelfClass::Frozen.capacity(), "frozen");

        let order = Order::with_clock("late", "Popsicle", ShelfClass::Frozen, 100, 0.5, clock.as_ref());
        allocator.place(&order).unwrap();

        assert!(allocator.pickup(order.id(), ShelfClass::Frozen));
        assert!(!allocator.pickup(order.id(), ShelfClass::Frozen));
        assert_eq!(allocator.locate(order.id()), None);
    }

    #[test]
    fn test_sweep_all() {
        let (allocator, clock, stats) = allocator();
        for (id, class) in [("h", ShelfClass::Hot), ("c", ShelfClass::Cold), ("f", ShelfClass::Frozen)] {
            let order = Order::with_clock(id, id, class, 1, 1.0, clock.as_ref());
            allocator.place(&order).unwrap();
        }

        clock.advance(Duration::from_secs(1));
        assert_eq!(allocator.sweep_all().len(), 3);
        assert_eq!(allocator.total_orders(), 0);
        assert_eq!(stats.snapshot().expired, 3);
    }

    #[test]
    fn test_placing_a_stored_id_again_is_rejected() {
        let (allocator, clock, stats) = allocator();
        let order = Order::with_clock("dup", "Curry", ShelfClass::Hot, 100, 0.5, clock.as_ref());

        assert_eq!(allocator.place(&order).unwrap().class(), ShelfClass::Hot);
        assert_eq!(
            allocator.place(&order).err(),
            Some(AllocationError::AlreadyPlaced { order_id: order.id().clone() })
        );

        assert_eq!(allocator.locate(order.id()), Some(ShelfClass::Hot));
        assert!(!allocator.overflow().contains(order.id()));
        assert_eq!(allocator.total_orders(), 1);
        assert_eq!(stats.snapshot().discarded, 0);
    }

    #[test]
    fn test_overflow_order_does_not_evict_its_own_copy() {
        let (allocator, clock, stats) = allocator();
        let spilled = fill(&allocator, &clock, ShelfClass::Overflow, ShelfClass::Overflow.capacity(), "any");

        assert!(matches!(
            allocator.place(&spilled[0]),
            Err(AllocationError::AlreadyPlaced { .. })
        ));
        assert!(spilled.iter().all(|o| allocator.overflow().contains(o.id())));
        assert_eq!(stats.snapshot().discarded, 0);
    }

    #[test]
    fn test_picked_up_id_can_be_placed_again() {
        let (allocator, clock, _) = allocator();
        let order = Order::with_clock("again", "Pho", ShelfClass::Cold, 100, 0.5, clock.as_ref());

        allocator.place(&order).unwrap();
        assert!(allocator.pickup(order.id(), ShelfClass::Cold));
        assert_eq!(allocator.place(&order).unwrap().class(), ShelfClass::Cold);
    }
}
