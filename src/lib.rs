//! # Tick-LOB
//!
//! A continuous limit order book matching engine with price-time priority.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: One thread owns the order book exclusively (no locks)
//! - **Arena Allocation**: Orders live in a fixed-capacity slab, recycled LIFO
//! - **Lazy Removal**: Filled orders and emptied levels are skipped, not erased
//! - **Lock-Free Handoff**: Decoding and matching meet at an SPSC ring buffer
//!
//! ## Architecture
//!
//! ```text
//! [Ingest Thread] --> [SPSC Ring Buffer] --> [Matching Thread (Pinned)]
//!   decode 17-byte                             arena + book
//!   wire records                                     |
//!                                                 [Fills]
//! ```

pub mod arena;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod ingest;
pub mod matching;
pub mod order;
pub mod order_book;
pub mod price_level;
pub mod spsc;

// Re-exports for convenience
pub use arena::{OrderArena, OrderHandle, NULL_INDEX};
pub use codec::{Record, RECORD_LEN};
pub use config::EngineConfig;
pub use engine::{run_pipeline, Engine, PipelineRun, RunReport};
pub use error::{CodecError, EngineError, FeedError, IngestError, OrderError};
pub use ingest::{IngestStats, Ingestor};
pub use matching::MatchingEngine;
pub use order::{Execution, Fill, Order, Side};
pub use order_book::{LevelDepth, OrderBook};
pub use price_level::PriceLevel;
pub use spsc::{ring_buffer, Consumer, Producer, PushError};
