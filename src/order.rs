//! Order and trade types shared by the codec, the book, and the pipeline.
//!
//! Orders cross the pipeline by value; fills are the matcher's output.

use serde::{Deserialize, Serialize};

/// Order side. The discriminants are the wire encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Side {
    /// Buy side (rests on the bids)
    #[serde(alias = "bid")]
    Buy = 1,
    /// Sell side (rests on the asks)
    #[serde(alias = "ask")]
    Sell = 2,
}

impl Side {
    /// Returns the opposite side
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Returns true if an order on this side with the given limit can trade
    /// against a resting level at `level_price`.
    #[inline]
    pub const fn crosses(self, limit: i32, level_price: i32) -> bool {
        match self {
            // Buyer takes any ask at or below the limit
            Side::Buy => level_price <= limit,
            // Seller takes any bid at or above the limit
            Side::Sell => level_price >= limit,
        }
    }

    /// Decode the one-byte wire tag.
    #[inline]
    pub const fn from_wire(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Side::Buy),
            2 => Some(Side::Sell),
            _ => None,
        }
    }

    /// The one-byte wire tag.
    #[inline]
    pub const fn to_wire(self) -> u8 {
        self as u8
    }
}

/// A limit order.
///
/// `quantity` is the remaining unfilled amount; it only ever decreases
/// once the order has been admitted.
///
/// # Memory Layout
///
/// | Field    | Type | Offset | Size |
/// |----------|------|--------|------|
/// | id       | u64  | 0      | 8    |
/// | price    | i32  | 8      | 4    |
/// | quantity | u32  | 12     | 4    |
/// | side     | u8   | 16     | 1    |
/// | (padding)| -    | 17     | 7    |
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Order {
    /// Client-assigned order ID
    pub id: u64,
    /// Limit price in ticks
    pub price: i32,
    /// Remaining quantity
    pub quantity: u32,
    /// Order side
    pub side: Side,
}

const _: () = assert!(
    std::mem::size_of::<Order>() == 24,
    "Order must stay 24 bytes so two arena slots share a cache line"
);

impl Order {
    #[inline]
    pub const fn new(id: u64, price: i32, quantity: u32, side: Side) -> Self {
        Self {
            id,
            price,
            quantity,
            side,
        }
    }

    /// Placeholder value for unused arena slots
    #[inline]
    pub const fn empty() -> Self {
        Self::new(0, 0, 0, Side::Buy)
    }
}

/// One execution between the incoming (taker) order and one resting (maker) order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fill {
    /// Incoming order ID
    pub taker_id: u64,
    /// Resting order ID
    pub maker_id: u64,
    /// Execution price (the resting level's price)
    pub price: i32,
    /// Executed quantity
    pub quantity: u32,
    /// Side of the incoming order
    pub taker_side: Side,
}

/// Outcome of admitting one order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Execution {
    pub order_id: u64,
    /// Fills in execution order (best price first, then time priority)
    pub fills: Vec<Fill>,
    /// Quantity left resting in the book (0 if fully filled)
    pub resting_qty: u32,
}

impl Execution {
    /// Total quantity executed against resting orders.
    pub fn filled_qty(&self) -> u64 {
        self.fills.iter().map(|f| f.quantity as u64).sum()
    }

    /// Whether a remainder was placed in the book.
    #[inline]
    pub fn is_resting(&self) -> bool {
        self.resting_qty > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_side_crosses() {
        // Buy at 100 takes asks at or below 100
        assert!(Side::Buy.crosses(100, 99));
        assert!(Side::Buy.crosses(100, 100));
        assert!(!Side::Buy.crosses(100, 101));

        // Sell at 100 takes bids at or above 100
        assert!(Side::Sell.crosses(100, 101));
        assert!(Side::Sell.crosses(100, 100));
        assert!(!Side::Sell.crosses(100, 99));

        // Negative ticks are ordinary prices
        assert!(Side::Buy.crosses(-5, -10));
        assert!(!Side::Sell.crosses(-5, -10));
    }

    #[test]
    fn test_side_wire_tags() {
        assert_eq!(Side::Buy.to_wire(), 1);
        assert_eq!(Side::Sell.to_wire(), 2);
        assert_eq!(Side::from_wire(1), Some(Side::Buy));
        assert_eq!(Side::from_wire(2), Some(Side::Sell));
        assert_eq!(Side::from_wire(0), None);
        assert_eq!(Side::from_wire(3), None);
    }

    #[test]
    fn test_execution_totals() {
        let fill = |maker_id, quantity| Fill {
            taker_id: 9,
            maker_id,
            price: 100,
            quantity,
            taker_side: Side::Buy,
        };
        let exec = Execution {
            order_id: 9,
            fills: vec![fill(1, 3), fill(2, 9)],
            resting_qty: 0,
        };
        assert_eq!(exec.filled_qty(), 12);
        assert!(!exec.is_resting());
    }
}
