//! Engine - the matching context's event loop.
//!
//! Owns the matcher exclusively, drains orders from the ring buffer,
//! and optionally pins itself to a dedicated core.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, OrderError};
use crate::ingest::{IngestStats, Ingestor};
use crate::matching::MatchingEngine;
use crate::order::{Fill, Order};
use crate::spsc::{ring_buffer, Consumer};

/// Idle polls that spin before falling back to `yield_now`
const SPIN_LIMIT: u32 = 64;

/// What the matching context did during a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Orders popped from the pipeline
    pub processed: u64,
    /// Orders refused (zero quantity, arena exhausted)
    pub rejected: u64,
    /// Individual fills produced
    pub fills: u64,
    /// Quantity traded across all fills
    pub traded_qty: u64,
    /// Every fill, in order, when `record_fills` is set
    pub fill_log: Vec<Fill>,
    pub elapsed: Duration,
}

impl RunReport {
    /// Orders per second over the run
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }
}

/// The matching context.
pub struct Engine {
    pub matcher: MatchingEngine,
    config: EngineConfig,
    /// Reused fill buffer for the hot path
    scratch: Vec<Fill>,
    report: RunReport,
}

impl Engine {
    /// Create an engine with the given arena capacity and default settings.
    pub fn new(capacity: u32) -> Self {
        Self::with_config(EngineConfig::with_capacity(capacity))
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            matcher: MatchingEngine::with_config(&config),
            config,
            scratch: Vec::with_capacity(64),
            report: RunReport::default(),
        }
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Match a single order and fold the outcome into the report.
    ///
    /// This is the entry point for synchronous usage (tests, benchmarks).
    #[inline]
    pub fn process(&mut self, order: Order) -> Result<u32, OrderError> {
        self.report.processed += 1;
        self.scratch.clear();

        match self.matcher.add_order_into(order, &mut self.scratch) {
            Ok(resting) => {
                self.report.fills += self.scratch.len() as u64;
                self.report.traded_qty += self.scratch.iter().map(|f| f.quantity as u64).sum::<u64>();
                if self.config.record_fills {
                    self.report.fill_log.extend_from_slice(&self.scratch);
                }
                Ok(resting)
            }
            Err(err) => {
                self.report.rejected += 1;
                warn!(%err, "order rejected");
                Err(err)
            }
        }
    }

    /// Fills produced by the most recent `process` call
    #[inline]
    pub fn last_fills(&self) -> &[Fill] {
        &self.scratch
    }

    /// Run the event loop until the producer is gone and the ring is drained.
    ///
    /// Pins to a core and pre-faults the arena first when configured to.
    /// The accumulated report is handed over and the engine's own report
    /// starts empty again.
    pub fn run(&mut self, input: &mut Consumer<Order>) -> RunReport {
        if self.config.pin_to_core {
            self.pin_to_core();
        }
        self.warm_up();

        info!(
            capacity = self.matcher.arena().capacity(),
            slots = input.capacity() + 1,
            "matching loop started"
        );

        let start = Instant::now();
        let mut idle = 0u32;
        loop {
            if let Some(order) = input.pop() {
                idle = 0;
                let _ = self.process(order);
                continue;
            }

            if input.is_abandoned() {
                // Everything pushed before the producer left is visible now
                while let Some(order) = input.pop() {
                    let _ = self.process(order);
                }
                break;
            }

            if idle < SPIN_LIMIT {
                idle += 1;
                std::hint::spin_loop();
            } else {
                thread::yield_now();
            }
        }
        self.report.elapsed += start.elapsed();

        info!(
            processed = self.report.processed,
            rejected = self.report.rejected,
            fills = self.report.fills,
            resting = self.matcher.order_count(),
            "matching loop finished"
        );
        std::mem::take(&mut self.report)
    }

    /// Pin the current thread to the last available CPU core.
    ///
    /// The last core is typically isolated from OS interrupts.
    pub fn pin_to_core(&self) -> bool {
        let pinned = core_affinity::get_core_ids()
            .and_then(|ids| ids.last().copied())
            .is_some_and(core_affinity::set_for_current);
        if !pinned {
            warn!("could not pin matching thread to a core");
        }
        pinned
    }

    /// Warm up the engine by pre-faulting memory pages.
    pub fn warm_up(&mut self) {
        self.matcher.warm_up();
    }

    #[inline]
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Clear the book, the arena, and the report for an independent run.
    pub fn reset(&mut self) {
        self.matcher.reset();
        self.report = RunReport::default();
        self.scratch.clear();
    }

    #[inline]
    pub fn best_bid(&self) -> Option<i32> {
        self.matcher.best_bid()
    }

    #[inline]
    pub fn best_ask(&self) -> Option<i32> {
        self.matcher.best_ask()
    }

    #[inline]
    pub fn order_count(&self) -> usize {
        self.matcher.order_count()
    }

    /// Compute state hash for determinism testing.
    #[inline]
    pub fn state_hash(&self) -> u64 {
        self.matcher.state_hash()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

/// Result of [`run_pipeline`]
pub struct PipelineRun {
    /// The engine after the run, book intact
    pub engine: Engine,
    pub ingest: IngestStats,
    pub report: RunReport,
}

/// Feed `bytes` through a two-thread pipeline: one thread decodes and
/// pushes, the other matches.
pub fn run_pipeline(config: EngineConfig, bytes: &[u8]) -> Result<PipelineRun, EngineError> {
    if config.pipeline_slots < 2 {
        return Err(EngineError::PipelineTooSmall(config.pipeline_slots));
    }
    let (tx, rx) = ring_buffer::<Order>(config.pipeline_slots);
    let mut engine = Engine::with_config(config);

    let (ingested, ingest, report) = thread::scope(|s| {
        let matcher = &mut engine;
        let consumer = s.spawn(move || {
            let mut rx = rx;
            matcher.run(&mut rx)
        });
        let producer = s.spawn(move || {
            let mut ingestor = Ingestor::new(tx);
            let result = ingestor.ingest(bytes);
            (result, ingestor.finish())
        });

        let (ingested, ingest) = producer
            .join()
            .map_err(|_| EngineError::ThreadPanicked("ingest"))?;
        let report = consumer
            .join()
            .map_err(|_| EngineError::ThreadPanicked("matching"))?;
        Ok::<_, EngineError>((ingested, ingest, report))
    })?;

    ingested?;
    Ok(PipelineRun {
        engine,
        ingest,
        report,
    })
}
