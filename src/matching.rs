//! Matching Engine - price-time priority crossing and resting.
//!
//! For each admitted order:
//! 1. ALLOCATE: take an arena slot (refuse the order if none is left)
//! 2. CROSS: walk opposite levels best-first while they cross the limit,
//!    filling each level's queue in arrival order
//! 3. REST: park any remainder on the order's own side, or release the
//!    slot if the order was fully filled

use crate::arena::OrderArena;
use crate::config::EngineConfig;
use crate::error::OrderError;
use crate::order::{Execution, Fill, Order, Side};
use crate::order_book::OrderBook;

/// The matching core: the arena and the book it indexes into.
///
/// Single-threaded and not reentrant. Whoever owns this value is the
/// only context allowed to touch the book.
///
/// Both halves are private: the book holds handles into the arena, so
/// they are only ever mutated (and reset) together.
pub struct MatchingEngine {
    /// Storage for every live order
    arena: OrderArena,
    book: OrderBook,
}

impl MatchingEngine {
    /// Create a matching engine able to hold `capacity` live orders.
    pub fn new(capacity: u32) -> Self {
        Self::with_config(&EngineConfig {
            arena_capacity: capacity,
            ..EngineConfig::default()
        })
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            arena: OrderArena::new(config.arena_capacity),
            book: OrderBook::with_capacity(
                config.level_reserve,
                config.orders_per_level,
                config.compact_threshold,
            ),
        }
    }

    /// Admit a limit order and report what happened to it.
    pub fn add_order(
        &mut self,
        id: u64,
        price: i32,
        quantity: u32,
        side: Side,
    ) -> Result<Execution, OrderError> {
        let mut fills = Vec::new();
        let resting_qty = self.add_order_into(Order::new(id, price, quantity, side), &mut fills)?;
        Ok(Execution {
            order_id: id,
            fills,
            resting_qty,
        })
    }

    /// Admit a limit order, appending its fills to `fills`.
    ///
    /// On error nothing has changed: no fills are appended and the book and
    /// arena are untouched.
    ///
    /// # Returns
    /// The quantity left resting in the book.
    pub fn add_order_into(&mut self, order: Order, fills: &mut Vec<Fill>) -> Result<u32, OrderError> {
        if order.quantity == 0 {
            return Err(OrderError::ZeroQuantity { order_id: order.id });
        }

        let handle = self
            .arena
            .allocate(order)
            .ok_or(OrderError::ArenaExhausted {
                order_id: order.id,
                capacity: self.arena.capacity(),
            })?;

        let mut taker = order;
        self.cross(&mut taker, fills);

        if taker.quantity > 0 {
            self.arena.get_mut(&handle).quantity = taker.quantity;
            self.book.rest(taker.side, taker.price, handle, taker.quantity);
        } else {
            self.arena.deallocate(handle);
        }

        Ok(taker.quantity)
    }

    /// Match `taker` against the opposite side, best price first.
    fn cross(&mut self, taker: &mut Order, fills: &mut Vec<Fill>) {
        let maker_side = taker.side.opposite();
        let Self { arena, book } = self;

        let mut exhausted = 0;
        for level in book.levels_mut(maker_side).iter_mut() {
            if taker.quantity == 0 {
                break;
            }
            if !level.is_active() {
                continue;
            }
            // Sorted best-first: once one level fails, all later ones do
            if !taker.side.crosses(taker.price, level.price()) {
                break;
            }
            if level.match_against(arena, taker, fills) {
                exhausted += 1;
            }
        }

        if exhausted > 0 {
            book.note_exhausted(maker_side, exhausted);
        }
    }

    // ========================================================================
    // Utility Methods
    // ========================================================================

    /// Read-only view of the order storage
    #[inline]
    pub fn arena(&self) -> &OrderArena {
        &self.arena
    }

    /// Read-only view of the book
    #[inline]
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    #[inline]
    pub fn best_bid(&self) -> Option<i32> {
        self.book.best_bid()
    }

    #[inline]
    pub fn best_ask(&self) -> Option<i32> {
        self.book.best_ask()
    }

    #[inline]
    pub fn spread(&self) -> Option<i64> {
        self.book.spread()
    }

    /// Number of resting orders
    #[inline]
    pub fn order_count(&self) -> usize {
        self.book.order_count()
    }

    /// Resting orders at one price in time priority, as (id, quantity).
    pub fn resting_at(&self, side: Side, price: i32) -> Vec<(u64, u32)> {
        self.book
            .orders_at(&self.arena, side, price)
            .map(|o| (o.id, o.quantity))
            .collect()
    }

    /// Total resting quantity on both sides
    pub fn resting_qty(&self) -> u64 {
        [Side::Buy, Side::Sell]
            .into_iter()
            .flat_map(|side| self.book.levels(side))
            .map(|l| l.total_qty())
            .sum()
    }

    /// Warm up the engine (pre-fault memory pages)
    pub fn warm_up(&mut self) {
        self.arena.warm_up();
    }

    /// Drop every resting order and return all arena capacity.
    pub fn reset(&mut self) {
        self.book.clear(&mut self.arena);
        self.arena.reset();
    }

    /// Compute a hash of the current state (for determinism testing)
    pub fn state_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        for side in [Side::Buy, Side::Sell] {
            for level in self.book.levels(side).iter().filter(|l| l.is_active()) {
                level.price().hash(&mut hasher);
                for order in level.iter(&self.arena) {
                    order.hash(&mut hasher);
                }
            }
        }
        self.arena.allocated().hash(&mut hasher);
        hasher.finish()
    }
}
