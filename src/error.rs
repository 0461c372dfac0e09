//! Error types.
//!
//! Pipeline full/empty are not errors: `push` hands the item back and
//! `pop` returns `None`.

use thiserror::Error;

/// Wire record decode/encode failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("record truncated: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },

    #[error("invalid side tag {0} (expected 1 = buy, 2 = sell)")]
    InvalidSide(u8),
}

/// Reasons an order is refused before it reaches matching
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderError {
    #[error("order {order_id}: quantity must be non-zero")]
    ZeroQuantity { order_id: u64 },

    #[error("order {order_id}: arena exhausted (capacity {capacity})")]
    ArenaExhausted { order_id: u64, capacity: u32 },
}

/// CSV order feed failures
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("tick size must be positive, got {0}")]
    InvalidTickSize(rust_decimal::Decimal),

    #[error("row {row}: price {price} is not a multiple of tick size {tick_size}")]
    OffTick {
        row: usize,
        price: rust_decimal::Decimal,
        tick_size: rust_decimal::Decimal,
    },

    #[error("row {row}: price {price} is out of tick range")]
    PriceOutOfRange {
        row: usize,
        price: rust_decimal::Decimal,
    },
}

/// Producer-side failures while feeding the pipeline
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestError {
    #[error("decode: {0}")]
    Codec(#[from] CodecError),

    #[error("matching side disconnected after {pushed} orders")]
    Disconnected { pushed: usize },
}

/// Failures of a full ingestion + matching run
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("ingest: {0}")]
    Ingest(#[from] IngestError),

    #[error("pipeline needs at least 2 slots, got {0}")]
    PipelineTooSmall(usize),

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}
