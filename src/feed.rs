//! Feed - CSV order input and fill output for replays.
//!
//! Prices on disk are decimals; the book works in integer ticks. A row's
//! price must be an exact multiple of the tick size.

use std::io::{Read, Write};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FeedError;
use crate::order::{Fill, Order, Side};

/// One row of an order CSV (`id,side,price,quantity`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedRow {
    pub id: u64,
    pub side: Side,
    pub price: Decimal,
    pub quantity: u32,
}

impl FeedRow {
    /// Convert to an order priced in ticks.
    ///
    /// `row` is only used to label errors.
    pub fn to_order(&self, tick_size: Decimal, row: usize) -> Result<Order, FeedError> {
        let price = to_ticks(self.price, tick_size, row)?;
        Ok(Order::new(self.id, price, self.quantity, self.side))
    }
}

/// A fill as written to the output CSV, price back in decimal units
#[derive(Debug, Serialize)]
struct FillRow {
    taker_id: u64,
    maker_id: u64,
    price: Decimal,
    quantity: u32,
    taker_side: Side,
}

fn check_tick_size(tick_size: Decimal) -> Result<(), FeedError> {
    if tick_size <= Decimal::ZERO {
        return Err(FeedError::InvalidTickSize(tick_size));
    }
    Ok(())
}

fn to_ticks(price: Decimal, tick_size: Decimal, row: usize) -> Result<i32, FeedError> {
    let ticks = price
        .checked_div(tick_size)
        .ok_or(FeedError::PriceOutOfRange { row, price })?;
    if !ticks.fract().is_zero() {
        return Err(FeedError::OffTick {
            row,
            price,
            tick_size,
        });
    }
    ticks.to_i32().ok_or(FeedError::PriceOutOfRange { row, price })
}

/// Read every order from a headed CSV, converting prices to ticks.
///
/// Rows are numbered from 1, not counting the header.
pub fn read_orders<R: Read>(reader: R, tick_size: Decimal) -> Result<Vec<Order>, FeedError> {
    check_tick_size(tick_size)?;

    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut orders = Vec::new();
    for (i, result) in csv.deserialize::<FeedRow>().enumerate() {
        let row = result?;
        orders.push(row.to_order(tick_size, i + 1)?);
    }

    debug!(orders = orders.len(), %tick_size, "order feed loaded");
    Ok(orders)
}

/// Write fills as CSV with a header, converting tick prices to decimals.
pub fn write_fills<W: Write>(writer: W, fills: &[Fill], tick_size: Decimal) -> Result<(), FeedError> {
    check_tick_size(tick_size)?;

    let mut csv = csv::Writer::from_writer(writer);
    for fill in fills {
        csv.serialize(FillRow {
            taker_id: fill.taker_id,
            maker_id: fill.maker_id,
            price: Decimal::from(fill.price) * tick_size,
            quantity: fill.quantity,
            taker_side: fill.taker_side,
        })?;
    }
    csv.flush()?;

    debug!(fills = fills.len(), "fills written");
    Ok(())
}
