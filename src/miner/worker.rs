// src/miner/worker.rs
//! Worker implementation
//!
//! A worker scans one contiguous nonce sub-range in ascending order and
//! stops at the first nonce whose hash beats the round's difficulty.
//! Workers share nothing mutable: each owns its task and returns one result.

use crate::miner::validator::{Preimage, meets_difficulty};
use crate::types::{SearchResult, SearchTask};
use alloy_primitives::U256;

/// Executes a single [`SearchTask`]
pub struct Worker {
    task: SearchTask,
}

impl Worker {
    /// Creates a worker bound to `task`
    pub fn new(task: SearchTask) -> Self {
        Worker { task }
    }

    /// The task this worker owns
    pub fn task(&self) -> &SearchTask {
        &self.task
    }

    /// Scans the assigned range
    ///
    /// Returns the lowest valid nonce in the range, or a miss carrying the
    /// number of hashes computed.
    pub fn run(&self) -> SearchResult {
        let task = &self.task;
        let difficulty = task.snapshot.effective_difficulty;
        let mut preimage = Preimage::new(
            &task.snapshot.last_hash,
            &task.miner_address,
            task.timestamp,
        );

        let mut attempts = 0u64;
        let mut nonce = task.range_start;
        while nonce < task.range_end {
            attempts += 1;
            let hash = preimage.hash(nonce);
            if meets_difficulty(&hash, &difficulty) {
                return SearchResult::hit(nonce, attempts);
            }
            nonce += U256::from(1u64);
        }

        SearchResult::miss(attempts)
    }
}
