//! Ingestion - the producing context.
//!
//! Decodes wire records and hands the orders to the matching thread
//! through the ring buffer, spinning briefly and then yielding while the
//! ring is full.

use tracing::{debug, warn};

use crate::codec;
use crate::error::IngestError;
use crate::order::Order;
use crate::spsc::{Producer, PushError};

/// Spins before falling back to `yield_now`
const SPIN_LIMIT: u32 = 64;

/// Totals reported when the producer finishes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Orders handed to the pipeline
    pub pushed: usize,
    /// Push attempts that found the ring full
    pub full_retries: u64,
}

/// Producer end of the pipeline plus its retry policy.
///
/// Dropping (or `finish`ing) the ingestor closes the pipeline.
#[derive(Debug)]
pub struct Ingestor {
    producer: Producer<Order>,
    stats: IngestStats,
}

impl Ingestor {
    pub fn new(producer: Producer<Order>) -> Self {
        Self {
            producer,
            stats: IngestStats::default(),
        }
    }

    /// Push one order, retrying until the ring has room.
    ///
    /// Fails only if the consumer has gone away.
    pub fn submit(&mut self, order: Order) -> Result<(), IngestError> {
        let mut item = order;
        let mut spins = 0u32;
        loop {
            match self.producer.push(item) {
                Ok(()) => {
                    self.stats.pushed += 1;
                    return Ok(());
                }
                Err(PushError::Full(back)) => {
                    item = back;
                    self.stats.full_retries += 1;
                    if self.producer.is_abandoned() {
                        return Err(IngestError::Disconnected {
                            pushed: self.stats.pushed,
                        });
                    }
                    if spins < SPIN_LIMIT {
                        spins += 1;
                        std::hint::spin_loop();
                    } else {
                        std::thread::yield_now();
                    }
                }
            }
        }
    }

    /// Decode a stream of back-to-back records and submit each order.
    ///
    /// Orders before a bad record have already been submitted when the
    /// error is returned.
    ///
    /// # Returns
    /// The number of orders submitted from `bytes`.
    pub fn ingest(&mut self, bytes: &[u8]) -> Result<usize, IngestError> {
        let mut count = 0;
        for record in codec::records(bytes) {
            let order = record.map_err(|err| {
                warn!(offset = count * codec::RECORD_LEN, %err, "rejecting wire record");
                err
            })?;
            self.submit(order)?;
            count += 1;
        }
        Ok(count)
    }

    #[inline]
    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Close the pipeline and return the totals.
    pub fn finish(self) -> IngestStats {
        debug!(
            pushed = self.stats.pushed,
            full_retries = self.stats.full_retries,
            "ingestion finished"
        );
        self.stats
    }
}
