//! Statistics collection and reporting module
//!
//! This module provides functionality for tracking and reporting mining statistics,
//! including:
//! - Hashrate calculations
//! - Submission success/failure tracking
//! - The idle-time reward bonus
//! - Structured events emitted by the mining core
//!
//! The reporting side ([`StatsReporter`]) only reads; the mining loop is the
//! sole writer of the counters.

/// Process-wide counters and the time bonus calculation
pub mod tracker;

/// Observer interface for mining events
pub mod events;

/// Periodic status logging and event relay
pub mod reporter;

// Re-export main components
pub use events::{EventSink, MiningEvent, NullSink, SubmissionState};
pub use reporter::{HardwareStats, StatsReporter};
pub use tracker::{CumulativeStats, RoundStatsTracker, time_bonus_percent};
