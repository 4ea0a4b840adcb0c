//! LAK Miner - proof-of-work miner for the LAK token contract
//!
//! This crate searches nonces whose Keccak-256 preimage hash falls below the
//! contract's effective difficulty and submits them as `mine` transactions:
//! - Parallel nonce search over disjoint, non-repeating ranges
//! - Per-round deadline and cooperative shutdown
//! - Submission with bounded retries for transient network errors
//! - Periodic status and hardware reporting

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Miner core: hash validation, search scheduling, submission and the round loop
pub mod miner;

/// Ledger access over JSON-RPC
pub mod network;

/// Statistics collection and reporting functionality
pub mod stats;

/// Utility functions and error handling
pub mod utils;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Shared type definitions
pub mod types;

// Core exports
pub use cli::Commands;
pub use config::Config;
pub use miner::{MiningLoop, NonceSearchScheduler, SubmissionPipeline, Worker};
pub use network::{Ledger, RpcLedger};
pub use stats::{HardwareStats, RoundStatsTracker, StatsReporter};
pub use types::{DifficultySnapshot, SearchResult, SearchTask};
pub use utils::{MinerError, init_logging};
