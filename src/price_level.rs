//! Price Level - FIFO queue of resting orders at one price.
//!
//! Filled orders are not removed from the queue; a head cursor marks the
//! first live entry and everything before it is logically gone. The
//! consumed prefix is only dropped by `compact` or when an exhausted
//! level is reused.

use crate::arena::{OrderArena, OrderHandle};
use crate::order::{Fill, Order};

/// All resting orders at one exact price on one side.
///
/// Invariants: `head <= orders.len()`; every entry at or after `head` is
/// `Some` and refers to a live order at `price`; every entry before
/// `head` is `None`.
#[derive(Debug)]
pub struct PriceLevel {
    price: i32,
    orders: Vec<Option<OrderHandle>>,
    /// First still-live entry
    head: usize,
    /// False once `head` reaches the end of the queue
    active: bool,
    /// Remaining quantity across live entries
    total_qty: u64,
}

impl PriceLevel {
    /// Create a level holding a single order.
    pub fn new(price: i32, reserve: usize, handle: OrderHandle, qty: u32) -> Self {
        let mut orders = Vec::with_capacity(reserve.max(1));
        orders.push(Some(handle));
        Self {
            price,
            orders,
            head: 0,
            active: true,
            total_qty: qty as u64,
        }
    }

    #[inline]
    pub fn price(&self) -> i32 {
        self.price
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn head(&self) -> usize {
        self.head
    }

    /// Physical queue length, consumed prefix included
    #[inline]
    pub fn queue_len(&self) -> usize {
        self.orders.len()
    }

    /// Number of live orders
    #[inline]
    pub fn order_count(&self) -> usize {
        self.orders.len() - self.head
    }

    #[inline]
    pub fn total_qty(&self) -> u64 {
        self.total_qty
    }

    /// Append an order at the back of the queue and mark the level active.
    ///
    /// An exhausted level drops its consumed prefix first.
    pub fn push_back(&mut self, handle: OrderHandle, qty: u32) {
        if !self.active {
            self.orders.clear();
            self.head = 0;
        }
        self.orders.push(Some(handle));
        self.total_qty += qty as u64;
        self.active = true;
    }

    /// Match `taker` against this level in time priority.
    ///
    /// Walks from the head cursor, trading `min(taker, maker)` per entry.
    /// Makers reaching zero are released to the arena and the cursor moves
    /// past them. Stops when the taker is exhausted or the queue is.
    ///
    /// # Returns
    /// `true` if this call exhausted the level.
    pub fn match_against(
        &mut self,
        arena: &mut OrderArena,
        taker: &mut Order,
        fills: &mut Vec<Fill>,
    ) -> bool {
        while taker.quantity > 0 {
            let Some(entry) = self.orders.get_mut(self.head) else {
                break;
            };
            let Some(maker_handle) = entry.as_ref() else {
                // Unreachable under the level invariant; skip rather than stall
                self.head += 1;
                continue;
            };

            let maker = arena.get_mut(maker_handle);
            let traded = taker.quantity.min(maker.quantity);
            taker.quantity -= traded;
            maker.quantity -= traded;
            let maker_id = maker.id;
            let maker_done = maker.quantity == 0;

            self.total_qty -= traded as u64;
            fills.push(Fill {
                taker_id: taker.id,
                maker_id,
                price: self.price,
                quantity: traded,
                taker_side: taker.side,
            });

            if maker_done {
                if let Some(handle) = entry.take() {
                    arena.deallocate(handle);
                }
                self.head += 1;
            }
        }

        if self.active && self.head >= self.orders.len() {
            self.active = false;
            return true;
        }
        false
    }

    /// Drop the consumed prefix so `head` returns to 0.
    pub fn compact(&mut self) {
        if self.head > 0 {
            self.orders.drain(..self.head);
            self.head = 0;
        }
    }

    /// Iterate over live orders in time priority.
    pub fn iter<'a>(&'a self, arena: &'a OrderArena) -> impl Iterator<Item = &'a Order> + 'a {
        self.orders[self.head..]
            .iter()
            .flatten()
            .map(move |handle| arena.get(handle))
    }

    /// Release every live order back to the arena and empty the level.
    pub fn release_all(&mut self, arena: &mut OrderArena) {
        for handle in self.orders.drain(..).flatten() {
            arena.deallocate(handle);
        }
        self.head = 0;
        self.total_qty = 0;
        self.active = false;
    }
}
