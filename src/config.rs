//! Engine configuration.

/// Sizing and runtime knobs for the matching context and its pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of live orders (resting plus the one being matched)
    pub arena_capacity: u32,
    /// Price levels reserved per side up front
    pub level_reserve: usize,
    /// Queue slots reserved for each new price level
    pub orders_per_level: usize,
    /// Compact a side once it holds more inactive levels than this (0 = never)
    pub compact_threshold: usize,
    /// Ring buffer cells between ingestion and matching (one is kept empty)
    pub pipeline_slots: usize,
    /// Pin the matching thread to the last CPU core
    pub pin_to_core: bool,
    /// Keep every fill in the run report
    pub record_fills: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            arena_capacity: 1_000_000,
            level_reserve: 10_000,
            orders_per_level: 128,
            compact_threshold: 1024,
            pipeline_slots: 1 << 16,
            pin_to_core: false,
            record_fills: false,
        }
    }
}

impl EngineConfig {
    /// Default configuration with the given arena capacity.
    pub fn with_capacity(arena_capacity: u32) -> Self {
        Self {
            arena_capacity,
            ..Self::default()
        }
    }
}
