//! Wire Codec - fixed-width binary order records.
//!
//! # Record Layout (17 bytes, little-endian, no padding)
//!
//! | Offset | Size | Field    | Encoding              |
//! |--------|------|----------|-----------------------|
//! | 0      | 8    | id       | u64                   |
//! | 8      | 4    | price    | i32, tick units       |
//! | 12     | 4    | quantity | u32                   |
//! | 16     | 1    | side     | 1 = buy, 2 = sell     |
//!
//! There is no versioning or checksum.

use crate::error::CodecError;
use crate::order::{Order, Side};

/// Size of one encoded order record
pub const RECORD_LEN: usize = 17;

/// A single encoded record
pub type Record = [u8; RECORD_LEN];

/// Encode an order into a fresh record.
#[inline]
pub fn encode(order: &Order) -> Record {
    let mut record = [0u8; RECORD_LEN];
    record[0..8].copy_from_slice(&order.id.to_le_bytes());
    record[8..12].copy_from_slice(&order.price.to_le_bytes());
    record[12..16].copy_from_slice(&order.quantity.to_le_bytes());
    record[16] = order.side.to_wire();
    record
}

/// Encode an order into the front of `buf`.
///
/// # Returns
/// The number of bytes written (always `RECORD_LEN`).
pub fn encode_into(order: &Order, buf: &mut [u8]) -> Result<usize, CodecError> {
    let got = buf.len();
    let dst = buf.get_mut(..RECORD_LEN).ok_or(CodecError::Truncated {
        needed: RECORD_LEN,
        got,
    })?;
    dst.copy_from_slice(&encode(order));
    Ok(RECORD_LEN)
}

/// Decode one order from the front of `buf`.
///
/// Bytes past the first record are ignored.
#[inline]
pub fn decode(buf: &[u8]) -> Result<Order, CodecError> {
    let record: &Record = buf
        .get(..RECORD_LEN)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(CodecError::Truncated {
            needed: RECORD_LEN,
            got: buf.len(),
        })?;

    let side = Side::from_wire(record[16]).ok_or(CodecError::InvalidSide(record[16]))?;

    Ok(Order {
        id: u64::from_le_bytes([
            record[0], record[1], record[2], record[3], record[4], record[5], record[6], record[7],
        ]),
        price: i32::from_le_bytes([record[8], record[9], record[10], record[11]]),
        quantity: u32::from_le_bytes([record[12], record[13], record[14], record[15]]),
        side,
    })
}

/// Encode a sequence of orders back to back.
pub fn encode_all<'a, I>(orders: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a Order>,
{
    let orders = orders.into_iter();
    let mut out = Vec::with_capacity(orders.size_hint().0 * RECORD_LEN);
    for order in orders {
        out.extend_from_slice(&encode(order));
    }
    out
}

/// Iterate over the records of a contiguous byte stream.
///
/// A trailing partial record yields a final `Truncated` error.
pub fn records(bytes: &[u8]) -> Records<'_> {
    Records { rest: bytes }
}

/// Iterator returned by [`records`]
#[derive(Debug, Clone)]
pub struct Records<'a> {
    rest: &'a [u8],
}

impl Iterator for Records<'_> {
    type Item = Result<Order, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let result = decode(self.rest);
        // Stop after a short tail instead of reporting it forever
        self.rest = self.rest.get(RECORD_LEN..).unwrap_or(&[]);
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.rest.len().div_ceil(RECORD_LEN);
        (n, Some(n))
    }
}
