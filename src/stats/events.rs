// src/stats/events.rs
//! Observer interface between the mining core and whatever presents it
//!
//! The core emits [`MiningEvent`]s and never renders anything itself.

use crate::stats::tracker::CumulativeStats;
use crate::types::RoundStatus;
use alloy_primitives::{B256, U256};
use crossbeam_channel::Sender;
use std::fmt;

/// Submission pipeline states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    /// Nothing in flight
    Idle,
    /// Sending attempt `attempt` (1-based)
    Submitting {
        /// Attempt number
        attempt: u32,
    },
    /// Accepted into the pending pool
    AwaitingConfirmation {
        /// Transaction hash
        tx: B256,
    },
    /// Finalized successfully
    Confirmed {
        /// Transaction hash
        tx: B256,
    },
    /// Finalized with a failure status
    RejectedOnChain {
        /// Transaction hash
        tx: B256,
    },
    /// Failed before finalization
    Failed {
        /// Whether another attempt will follow
        retryable: bool,
        /// Error description
        reason: String,
    },
}

impl SubmissionState {
    /// True for states the pipeline never leaves
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::Confirmed { .. }
                | SubmissionState::RejectedOnChain { .. }
                | SubmissionState::Failed {
                    retryable: false,
                    ..
                }
        )
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionState::Idle => write!(f, "idle"),
            SubmissionState::Submitting { attempt } => write!(f, "submitting (attempt {})", attempt),
            SubmissionState::AwaitingConfirmation { tx } => {
                write!(f, "waiting for confirmation of {}", tx)
            }
            SubmissionState::Confirmed { tx } => write!(f, "confirmed in {}", tx),
            SubmissionState::RejectedOnChain { tx } => write!(f, "rejected on chain ({})", tx),
            SubmissionState::Failed {
                retryable: true,
                reason,
            } => write!(f, "transient failure, retrying: {}", reason),
            SubmissionState::Failed { reason, .. } => write!(f, "failed: {}", reason),
        }
    }
}

/// Structured events emitted by the mining core
#[derive(Debug, Clone, PartialEq)]
pub enum MiningEvent {
    /// A round started with a fresh snapshot
    RoundStarted {
        /// Last committed state hash
        last_hash: B256,
        /// Difficulty threshold for the round
        difficulty: U256,
        /// Derived time bonus, in percent
        time_bonus_percent: u64,
        /// Timestamp mined against
        timestamp: u64,
    },
    /// One scheduler round finished without a hit
    SearchProgress {
        /// Hashes computed so far in this search
        attempts: u64,
    },
    /// A valid nonce was found
    NonceFound {
        /// Winning nonce
        nonce: U256,
        /// Hashes computed in this search
        attempts: u64,
    },
    /// Search deadline reached without a hit
    SearchTimedOut {
        /// Hashes computed in this search
        attempts: u64,
    },
    /// Round lifecycle transition
    RoundStatus(RoundStatus),
    /// Submission pipeline transition
    Submission(SubmissionState),
    /// Counters after a round finished
    StatsUpdated(CumulativeStats),
}

/// Receiver of [`MiningEvent`]s
pub trait EventSink: Send + Sync {
    /// Delivers one event; must not block the caller
    fn emit(&self, event: MiningEvent);
}

impl EventSink for Sender<MiningEvent> {
    fn emit(&self, event: MiningEvent) {
        // A dropped listener only means nobody is watching.
        let _ = self.send(event);
    }
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: MiningEvent) {}
}
