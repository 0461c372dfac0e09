//! Stress Tests - Push the engine to its limits.
//!
//! These tests verify correctness under extreme conditions:
//! - Near-capacity operation and slot reuse
//! - High contention at single price levels
//! - Long sessions that churn through many price levels
//! - Extreme prices and quantities

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tick_lob::{EngineConfig, MatchingEngine, OrderError, Side};

// ============================================================================
// Capacity Stress Tests
// ============================================================================

#[test]
fn test_near_capacity_operation() {
    const CAPACITY: u32 = 10_000;
    let mut engine = MatchingEngine::new(CAPACITY);

    // Fill to 95% capacity with non-overlapping prices
    let target_orders = (CAPACITY as f64 * 0.95) as u64;

    for i in 0..target_orders {
        let (side, price) = if i % 2 == 0 {
            (Side::Buy, 8000 + (i % 100) as i32 * 10)
        } else {
            (Side::Sell, 10000 + (i % 100) as i32 * 10)
        };
        let exec = engine.add_order(i, price, 100, side).unwrap();
        assert!(exec.is_resting(), "Order {} should rest", i);
    }

    assert_eq!(engine.order_count(), target_orders as usize);
    assert_eq!(engine.arena().allocated() as u64, target_orders);
}

#[test]
fn test_arena_full_rejection() {
    const CAPACITY: u32 = 100;
    let mut engine = MatchingEngine::new(CAPACITY);

    for i in 0..CAPACITY as u64 {
        engine.add_order(i, 100, 10, Side::Buy).unwrap();
    }
    let before = engine.state_hash();

    // Even a crossing order needs a slot before it can match
    let err = engine.add_order(999, 100, 10, Side::Sell).unwrap_err();

    assert_eq!(
        err,
        OrderError::ArenaExhausted {
            order_id: 999,
            capacity: CAPACITY
        }
    );
    assert_eq!(engine.state_hash(), before, "Rejection must not touch the book");
    assert_eq!(engine.order_count(), CAPACITY as usize);
}

#[test]
fn test_arena_reuse_after_fills() {
    const CAPACITY: u32 = 64;
    let mut engine = MatchingEngine::new(CAPACITY);
    let mut id = 0u64;

    // Many rounds of fill-the-arena-then-drain-it; no slot may leak
    for round in 0..500 {
        for _ in 0..CAPACITY - 1 {
            id += 1;
            engine.add_order(id, 100 + round % 7, 5, Side::Sell).unwrap();
        }
        id += 1;
        let exec = engine
            .add_order(id, 200, 5 * (CAPACITY - 1), Side::Buy)
            .unwrap();
        assert_eq!(exec.fills.len(), CAPACITY as usize - 1);
        assert!(!exec.is_resting());
        assert!(engine.arena().is_empty(), "Round {} leaked slots", round);
    }
}

// ============================================================================
// Contention Stress Tests
// ============================================================================

#[test]
fn test_single_price_level_contention() {
    const ORDERS: u64 = 10_000;
    let mut engine = MatchingEngine::new(ORDERS as u32 + 1);

    for i in 0..ORDERS {
        engine.add_order(i, 100, 1, Side::Sell).unwrap();
    }
    assert_eq!(engine.book().level(Side::Sell, 100).unwrap().order_count(), ORDERS as usize);

    let exec = engine.add_order(ORDERS, 100, ORDERS as u32, Side::Buy).unwrap();

    assert_eq!(exec.fills.len(), ORDERS as usize);
    assert_eq!(engine.order_count(), 0);
    assert_eq!(engine.best_ask(), None);
}

#[test]
fn test_fifo_priority_under_contention() {
    let mut engine = MatchingEngine::new(10_000);

    for i in 0..1_000u64 {
        engine.add_order(i, 100, 3, Side::Buy).unwrap();
    }

    // Chip away with odd-sized sells; makers must be consumed strictly in order
    let mut expected_maker = 0u64;
    let mut remaining_on_maker = 3u32;
    for i in 0..600u64 {
        let exec = engine.add_order(10_000 + i, 100, 5, Side::Sell).unwrap();
        for fill in &exec.fills {
            assert_eq!(fill.maker_id, expected_maker);
            remaining_on_maker -= fill.quantity;
            if remaining_on_maker == 0 {
                expected_maker += 1;
                remaining_on_maker = 3;
            }
        }
    }

    assert_eq!(engine.resting_qty(), 3 * 1_000 - 5 * 600);
}

#[test]
fn test_rapid_match_cycles() {
    let mut engine = MatchingEngine::new(1_000);

    // Rest and immediately take out the same level over and over
    for i in 0..100_000u64 {
        let price = (i % 5) as i32;
        engine.add_order(2 * i, price, 10, Side::Sell).unwrap();
        let exec = engine.add_order(2 * i + 1, price, 10, Side::Buy).unwrap();
        assert_eq!(exec.filled_qty(), 10);
    }

    assert_eq!(engine.order_count(), 0);
    assert!(engine.arena().is_empty());
    assert!(
        engine.book().level_count(Side::Sell) <= 5,
        "Emptied levels must be reused, not duplicated"
    );
}

// ============================================================================
// Long Session Tests
// ============================================================================

#[test]
fn test_drifting_prices_stay_bounded() {
    let mut engine = MatchingEngine::with_config(&EngineConfig {
        compact_threshold: 64,
        ..EngineConfig::with_capacity(10_000)
    });

    // A market that walks upward leaves a trail of exhausted levels behind
    for i in 0..50_000u64 {
        let price = (i / 10) as i32;
        engine.add_order(2 * i, price, 10, Side::Sell).unwrap();
        engine.add_order(2 * i + 1, price, 10, Side::Buy).unwrap();
    }

    assert_eq!(engine.order_count(), 0);
    for side in [Side::Buy, Side::Sell] {
        assert!(
            engine.book().inactive_levels(side) <= 64,
            "{:?} side kept {} inactive levels",
            side,
            engine.book().inactive_levels(side)
        );
    }
}

#[test]
fn test_random_session_conservation() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let mut engine = MatchingEngine::new(100_000);
    let mut submitted = 0u64;
    let mut traded = 0u64;

    for id in 0..50_000u64 {
        let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let qty = rng.gen_range(1..1_000);
        let exec = engine.add_order(id, rng.gen_range(900..1_100), qty, side).unwrap();
        submitted += qty as u64;
        traded += exec.filled_qty();
    }

    // Every unit either rested or traded (a trade consumes one unit per side)
    assert_eq!(submitted, engine.resting_qty() + 2 * traded);
    if let (Some(bid), Some(ask)) = (engine.best_bid(), engine.best_ask()) {
        assert!(bid < ask, "Book must never stay crossed");
    }
}

// ============================================================================
// Extreme Value Tests
// ============================================================================

#[test]
fn test_extreme_prices() {
    let mut engine = MatchingEngine::new(100);

    engine.add_order(1, i32::MAX, 10, Side::Sell).unwrap();
    engine.add_order(2, i32::MIN, 10, Side::Buy).unwrap();
    assert_eq!(engine.spread(), Some(i32::MAX as i64 - i32::MIN as i64));

    // A sell at the bottom of the range takes the bid at i32::MIN
    let exec = engine.add_order(3, i32::MIN, 4, Side::Sell).unwrap();
    assert_eq!(exec.fills[0].price, i32::MIN);

    // A buy at the top of the range takes the ask at i32::MAX
    let exec = engine.add_order(4, i32::MAX, 10, Side::Buy).unwrap();
    assert_eq!(exec.fills[0].price, i32::MAX);
    assert_eq!(engine.best_ask(), None);
}

#[test]
fn test_extreme_quantities() {
    let mut engine = MatchingEngine::new(100);

    engine.add_order(1, 100, u32::MAX, Side::Sell).unwrap();
    engine.add_order(2, 100, u32::MAX, Side::Sell).unwrap();
    assert_eq!(engine.resting_qty(), 2 * u32::MAX as u64);

    let exec = engine.add_order(3, 100, u32::MAX, Side::Buy).unwrap();
    assert_eq!(exec.filled_qty(), u32::MAX as u64);
    assert_eq!(engine.resting_at(Side::Sell, 100), vec![(2, u32::MAX)]);
}
