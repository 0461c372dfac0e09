//! Order Book - two sorted sequences of price levels.
//!
//! Bids are kept in strictly descending price order and asks in strictly
//! ascending order, so index 0 is always the best price on either side.
//! Levels are created on first use and deactivated (not removed) when
//! exhausted; `compact` sweeps the inactive ones out.

use std::cmp::Ordering;

use tracing::debug;

use crate::arena::{OrderArena, OrderHandle};
use crate::order::{Order, Side};
use crate::price_level::PriceLevel;

/// Aggregated view of one active level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelDepth {
    pub price: i32,
    pub total_qty: u64,
    pub order_count: usize,
}

pub struct OrderBook {
    /// Buy levels, best (highest) first
    bids: Vec<PriceLevel>,
    /// Sell levels, best (lowest) first
    asks: Vec<PriceLevel>,
    /// Inactive level counts, indexed by `side_index`
    inactive: [usize; 2],
    /// Queue reserve for newly created levels
    orders_per_level: usize,
    /// Compact a side once it holds more inactive levels than this (0 = never)
    compact_threshold: usize,
}

#[inline]
const fn side_index(side: Side) -> usize {
    match side {
        Side::Buy => 0,
        Side::Sell => 1,
    }
}

/// Ordering of a level relative to `price` in that side's sort order.
#[inline]
fn level_order(side: Side, level_price: i32, price: i32) -> Ordering {
    match side {
        Side::Buy => price.cmp(&level_price),
        Side::Sell => level_price.cmp(&price),
    }
}

impl OrderBook {
    pub fn new() -> Self {
        Self::with_capacity(0, 0, 0)
    }

    /// Create a book with pre-allocated level storage.
    ///
    /// # Arguments
    /// * `levels` - Level slots reserved per side
    /// * `orders_per_level` - Queue slots reserved for each new level
    /// * `compact_threshold` - Inactive levels tolerated per side (0 disables auto-compaction)
    pub fn with_capacity(levels: usize, orders_per_level: usize, compact_threshold: usize) -> Self {
        Self {
            bids: Vec::with_capacity(levels),
            asks: Vec::with_capacity(levels),
            inactive: [0; 2],
            orders_per_level,
            compact_threshold,
        }
    }

    // ========================================================================
    // Level Access
    // ========================================================================

    /// All levels on a side in priority order, inactive ones included
    #[inline]
    pub fn levels(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    #[inline]
    pub(crate) fn levels_mut(&mut self, side: Side) -> &mut [PriceLevel] {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Look up the level at an exact price (active or not).
    pub fn level(&self, side: Side, price: i32) -> Option<&PriceLevel> {
        let levels = self.levels(side);
        levels
            .binary_search_by(|l| level_order(side, l.price(), price))
            .ok()
            .map(|i| &levels[i])
    }

    /// Best active price on a side
    pub fn best_price(&self, side: Side) -> Option<i32> {
        self.levels(side)
            .iter()
            .find(|l| l.is_active())
            .map(PriceLevel::price)
    }

    /// Highest resting buy price
    #[inline]
    pub fn best_bid(&self) -> Option<i32> {
        self.best_price(Side::Buy)
    }

    /// Lowest resting sell price
    #[inline]
    pub fn best_ask(&self) -> Option<i32> {
        self.best_price(Side::Sell)
    }

    /// Best ask minus best bid, if both sides are populated
    pub fn spread(&self) -> Option<i64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask as i64 - bid as i64),
            _ => None,
        }
    }

    /// Up to `max_levels` active levels on a side, best first.
    pub fn depth(&self, side: Side, max_levels: usize) -> Vec<LevelDepth> {
        self.levels(side)
            .iter()
            .filter(|l| l.is_active())
            .take(max_levels)
            .map(|l| LevelDepth {
                price: l.price(),
                total_qty: l.total_qty(),
                order_count: l.order_count(),
            })
            .collect()
    }

    /// Number of live resting orders on both sides
    pub fn order_count(&self) -> usize {
        self.bids
            .iter()
            .chain(self.asks.iter())
            .map(PriceLevel::order_count)
            .sum()
    }

    /// Number of levels on a side, inactive ones included
    #[inline]
    pub fn level_count(&self, side: Side) -> usize {
        self.levels(side).len()
    }

    #[inline]
    pub fn inactive_levels(&self, side: Side) -> usize {
        self.inactive[side_index(side)]
    }

    /// Resting orders at one price, in time priority.
    pub fn orders_at<'a>(
        &'a self,
        arena: &'a OrderArena,
        side: Side,
        price: i32,
    ) -> impl Iterator<Item = &'a Order> + 'a {
        self.level(side, price)
            .into_iter()
            .flat_map(move |level| level.iter(arena))
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Rest an order on its own side.
    ///
    /// Appends to the existing level at `price` (reactivating it if needed),
    /// or inserts a new level at the position that keeps the side sorted.
    pub(crate) fn rest(&mut self, side: Side, price: i32, handle: OrderHandle, qty: u32) {
        let reserve = self.orders_per_level;
        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };

        match levels.binary_search_by(|l| level_order(side, l.price(), price)) {
            Ok(i) => {
                let level = &mut levels[i];
                if !level.is_active() {
                    self.inactive[side_index(side)] -= 1;
                }
                level.push_back(handle, qty);
            }
            Err(i) => levels.insert(i, PriceLevel::new(price, reserve, handle, qty)),
        }
    }

    /// Record levels deactivated by matching and compact the side if it
    /// crossed the threshold.
    pub(crate) fn note_exhausted(&mut self, side: Side, count: usize) {
        let idx = side_index(side);
        self.inactive[idx] += count;
        if self.compact_threshold > 0 && self.inactive[idx] > self.compact_threshold {
            self.compact(side);
        }
    }

    /// Remove inactive levels from a side and trim consumed queue prefixes.
    ///
    /// Matching results are unaffected: only logically removed entries go.
    pub fn compact(&mut self, side: Side) {
        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let before = levels.len();
        levels.retain(|l| l.is_active());
        for level in levels.iter_mut() {
            level.compact();
        }
        self.inactive[side_index(side)] = 0;

        debug!(
            ?side,
            removed = before - levels.len(),
            remaining = levels.len(),
            "compacted price levels"
        );
    }

    /// Release every resting order and drop all levels.
    pub fn clear(&mut self, arena: &mut OrderArena) {
        for level in self.bids.iter_mut().chain(self.asks.iter_mut()) {
            level.release_all(arena);
        }
        self.bids.clear();
        self.asks.clear();
        self.inactive = [0; 2];
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rest(book: &mut OrderBook, arena: &mut OrderArena, id: u64, side: Side, price: i32, qty: u32) {
        let h = arena.allocate(Order::new(id, price, qty, side)).unwrap();
        book.rest(side, price, h, qty);
    }

    fn prices(book: &OrderBook, side: Side) -> Vec<i32> {
        book.levels(side).iter().map(PriceLevel::price).collect()
    }

    #[test]
    fn test_empty_book() {
        let book = OrderBook::new();
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.spread(), None);
        assert_eq!(book.order_count(), 0);
    }

    #[test]
    fn test_bids_sorted_descending() {
        let mut arena = OrderArena::new(10);
        let mut book = OrderBook::new();
        for (id, price) in [(1, 100), (2, 102), (3, 98), (4, 101)] {
            rest(&mut book, &mut arena, id, Side::Buy, price, 10);
        }
        assert_eq!(prices(&book, Side::Buy), vec![102, 101, 100, 98]);
        assert_eq!(book.best_bid(), Some(102));
    }

    #[test]
    fn test_asks_sorted_ascending() {
        let mut arena = OrderArena::new(10);
        let mut book = OrderBook::new();
        for (id, price) in [(1, 100), (2, 102), (3, 98), (4, -3)] {
            rest(&mut book, &mut arena, id, Side::Sell, price, 10);
        }
        assert_eq!(prices(&book, Side::Sell), vec![-3, 98, 100, 102]);
        assert_eq!(book.best_ask(), Some(-3));
    }

    #[test]
    fn test_same_price_shares_level() {
        let mut arena = OrderArena::new(10);
        let mut book = OrderBook::new();
        rest(&mut book, &mut arena, 1, Side::Sell, 100, 10);
        rest(&mut book, &mut arena, 2, Side::Sell, 100, 5);

        assert_eq!(book.level_count(Side::Sell), 1);
        let ids: Vec<_> = book.orders_at(&arena, Side::Sell, 100).map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(
            book.depth(Side::Sell, 5),
            vec![LevelDepth {
                price: 100,
                total_qty: 15,
                order_count: 2
            }]
        );
    }

    #[test]
    fn test_spread() {
        let mut arena = OrderArena::new(10);
        let mut book = OrderBook::new();
        rest(&mut book, &mut arena, 1, Side::Buy, 99, 10);
        rest(&mut book, &mut arena, 2, Side::Sell, 101, 10);
        assert_eq!(book.spread(), Some(2));
    }

    fn exhaust_best(book: &mut OrderBook, arena: &mut OrderArena, side: Side) {
        let mut taker = Order::new(999, 0, u32::MAX, side.opposite());
        let mut fills = Vec::new();
        let level = book
            .levels_mut(side)
            .iter_mut()
            .find(|l| l.is_active())
            .unwrap();
        assert!(level.match_against(arena, &mut taker, &mut fills));
        book.note_exhausted(side, 1);
    }

    #[test]
    fn test_inactive_level_skipped_by_queries() {
        let mut arena = OrderArena::new(10);
        let mut book = OrderBook::new();
        rest(&mut book, &mut arena, 1, Side::Sell, 99, 3);
        rest(&mut book, &mut arena, 2, Side::Sell, 100, 10);

        exhaust_best(&mut book, &mut arena, Side::Sell);

        assert_eq!(book.level_count(Side::Sell), 2, "Level stays in place");
        assert_eq!(book.inactive_levels(Side::Sell), 1);
        assert_eq!(book.best_ask(), Some(100));
        assert_eq!(book.depth(Side::Sell, 10).len(), 1);
        assert!(book.level(Side::Sell, 99).is_some_and(|l| !l.is_active()));
    }

    #[test]
    fn test_rest_reactivates_level() {
        let mut arena = OrderArena::new(10);
        let mut book = OrderBook::new();
        rest(&mut book, &mut arena, 1, Side::Sell, 99, 3);
        exhaust_best(&mut book, &mut arena, Side::Sell);
        assert_eq!(book.inactive_levels(Side::Sell), 1);

        rest(&mut book, &mut arena, 2, Side::Sell, 99, 4);

        assert_eq!(book.inactive_levels(Side::Sell), 0);
        assert_eq!(book.level_count(Side::Sell), 1);
        assert_eq!(book.best_ask(), Some(99));
    }

    #[test]
    fn test_compact_removes_inactive() {
        let mut arena = OrderArena::new(10);
        let mut book = OrderBook::new();
        rest(&mut book, &mut arena, 1, Side::Buy, 101, 3);
        rest(&mut book, &mut arena, 2, Side::Buy, 100, 3);
        rest(&mut book, &mut arena, 3, Side::Buy, 99, 3);
        exhaust_best(&mut book, &mut arena, Side::Buy);
        exhaust_best(&mut book, &mut arena, Side::Buy);

        book.compact(Side::Buy);

        assert_eq!(prices(&book, Side::Buy), vec![99]);
        assert_eq!(book.inactive_levels(Side::Buy), 0);
        assert_eq!(book.order_count(), 1);
    }

    #[test]
    fn test_auto_compaction_threshold() {
        let mut arena = OrderArena::new(10);
        let mut book = OrderBook::with_capacity(4, 4, 1);
        for (id, price) in [(1, 97), (2, 98), (3, 99)] {
            rest(&mut book, &mut arena, id, Side::Sell, price, 1);
        }

        exhaust_best(&mut book, &mut arena, Side::Sell);
        assert_eq!(book.level_count(Side::Sell), 3, "At threshold: no compaction yet");

        exhaust_best(&mut book, &mut arena, Side::Sell);
        assert_eq!(book.level_count(Side::Sell), 1, "Past threshold: compacted");
        assert_eq!(book.best_ask(), Some(99));
    }

    #[test]
    fn test_clear_releases_arena() {
        let mut arena = OrderArena::new(10);
        let mut book = OrderBook::new();
        rest(&mut book, &mut arena, 1, Side::Buy, 100, 3);
        rest(&mut book, &mut arena, 2, Side::Sell, 101, 3);

        book.clear(&mut arena);

        assert!(arena.is_empty());
        assert_eq!(book.order_count(), 0);
        assert_eq!(book.level_count(Side::Buy), 0);
    }
}
