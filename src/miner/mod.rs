// src/miner/mod.rs
//! Core mining functionality
//!
//! This module contains all components related to the mining process:
//! - Hash validation against the difficulty threshold
//! - Nonce range partitioning and round scheduling
//! - Worker execution of individual sub-ranges
//! - Solution submission with retries
//! - The round loop tying them together

/// Proof-of-work preimage encoding and threshold check
pub mod validator;

/// Nonce search scheduler
///
/// Partitions each round across the worker pool, enforces the deadline and
/// picks the winning nonce.
pub mod scheduler;

/// Worker implementation
///
/// Scans a single contiguous nonce range.
pub mod worker;

/// Submission pipeline with transient-error retries
pub mod submission;

/// Round-by-round mining driver
pub mod mining_loop;

// Re-export main components for cleaner imports
pub use self::mining_loop::{LoopSettings, MiningLoop, RoundOutcome};
pub use self::scheduler::{NonceSearchScheduler, SearchOutcome};
pub use self::submission::{SubmissionOutcome, SubmissionPipeline, SubmissionPolicy};
pub use self::validator::validate;
pub use self::worker::Worker;
