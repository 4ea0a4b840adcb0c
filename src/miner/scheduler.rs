// src/miner/scheduler.rs
//! Nonce search scheduler implementation
//!
//! Splits the nonce space into rounds of `worker_count × batch_size`
//! consecutive integers, fans each round out over a fixed worker pool and
//! waits for every worker before deciding whether to continue. The
//! deadline and the stop flag are only checked at round boundaries.

use crate::miner::worker::Worker;
use crate::stats::events::{EventSink, MiningEvent};
use crate::types::{DifficultySnapshot, SearchResult, SearchTask};
use crate::utils::error::MinerError;
use alloy_primitives::{Address, U256};
use rand::RngCore;
use rand::rngs::OsRng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Result of a full search call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Lowest winning nonce of the first round that produced a hit
    pub nonce: Option<U256>,
    /// Hashes computed across all rounds of this search
    pub attempts: u64,
    /// Number of rounds executed
    pub rounds: u64,
    /// True when the stop flag ended the search
    pub stopped: bool,
}

/// Splits `[cursor, cursor + worker_count × batch_size)` into one
/// contiguous, equally sized sub-range per worker
pub fn partition(cursor: U256, worker_count: usize, batch_size: u64) -> Vec<(U256, U256)> {
    let batch = U256::from(batch_size);
    (0..worker_count)
        .map(|i| {
            let start = cursor.saturating_add(U256::from(i) * batch);
            (start, start.saturating_add(batch))
        })
        .collect()
}

/// Picks the numerically smallest nonce among successful results
pub fn select_winner(results: &[SearchResult]) -> Option<U256> {
    results
        .iter()
        .filter(|r| r.found)
        .filter_map(|r| r.nonce)
        .min()
}

/// Coordinates bounded-time nonce searches across worker threads
pub struct NonceSearchScheduler {
    /// Worker pool, one thread per worker
    pool: Arc<ThreadPool>,
    /// Number of sub-ranges per round
    worker_count: usize,
    /// Nonces per worker per round
    batch_size: u64,
    /// First nonce of the next round
    cursor: U256,
    /// Pause between rounds
    round_pause: Duration,
}

impl NonceSearchScheduler {
    /// Creates a scheduler starting at a random offset
    ///
    /// The offset comes from the OS random source and fits in 64 bits, so
    /// the cursor stays far below the top of the 256-bit space.
    pub fn new(
        worker_count: usize,
        batch_size: u64,
        round_pause: Duration,
    ) -> Result<Self, MinerError> {
        let start = U256::from(OsRng.next_u64());
        Self::with_start(worker_count, batch_size, round_pause, start)
    }

    /// Creates a scheduler starting at `start`
    pub fn with_start(
        worker_count: usize,
        batch_size: u64,
        round_pause: Duration,
        start: U256,
    ) -> Result<Self, MinerError> {
        if worker_count == 0 {
            return Err(MinerError::ConfigError(
                "worker count must be at least 1".into(),
            ));
        }
        if batch_size == 0 {
            return Err(MinerError::ConfigError(
                "batch size must be at least 1".into(),
            ));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .thread_name(|i| format!("miner-worker-{}", i))
            .build()?;

        Ok(NonceSearchScheduler {
            pool: Arc::new(pool),
            worker_count,
            batch_size,
            cursor: start,
            round_pause,
        })
    }

    /// Number of workers per round
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Nonces per worker per round
    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// First nonce of the next round
    pub fn cursor(&self) -> U256 {
        self.cursor
    }

    /// Nonces covered by one round
    pub fn round_span(&self) -> U256 {
        U256::from(self.worker_count) * U256::from(self.batch_size)
    }

    /// Builds the tasks of the round starting at the current cursor
    pub fn plan_round(
        &self,
        snapshot: &DifficultySnapshot,
        miner_address: Address,
        timestamp: u64,
    ) -> Vec<SearchTask> {
        partition(self.cursor, self.worker_count, self.batch_size)
            .into_iter()
            .map(|(range_start, range_end)| SearchTask {
                range_start,
                range_end,
                snapshot: *snapshot,
                miner_address,
                timestamp,
            })
            .collect()
    }

    /// Runs one round on the worker pool and advances the cursor
    ///
    /// Blocks until every worker finished its sub-range. Results come back
    /// in worker order.
    pub fn run_round_blocking(
        &mut self,
        snapshot: &DifficultySnapshot,
        miner_address: Address,
        timestamp: u64,
    ) -> Vec<SearchResult> {
        let tasks = self.plan_round(snapshot, miner_address, timestamp);
        let results = execute(&self.pool, tasks);
        self.advance();
        results
    }

    /// Searches until a round yields a valid nonce, the deadline passes or
    /// `running` is cleared
    ///
    /// The deadline is checked before each round, so the search may overrun
    /// it by up to one round. A deadline already in the past runs no rounds.
    pub async fn search(
        &mut self,
        snapshot: &DifficultySnapshot,
        miner_address: Address,
        timestamp: u64,
        deadline: Instant,
        running: &AtomicBool,
        events: &dyn EventSink,
    ) -> Result<SearchOutcome, MinerError> {
        let mut outcome = SearchOutcome {
            nonce: None,
            attempts: 0,
            rounds: 0,
            stopped: false,
        };

        while Instant::now() < deadline {
            if !running.load(Ordering::SeqCst) {
                outcome.stopped = true;
                break;
            }

            let tasks = self.plan_round(snapshot, miner_address, timestamp);
            let pool = Arc::clone(&self.pool);
            let results = tokio::task::spawn_blocking(move || execute(&pool, tasks)).await?;
            self.advance();

            outcome.rounds += 1;
            outcome.attempts += results.iter().map(|r| r.attempts_made).sum::<u64>();

            if let Some(nonce) = select_winner(&results) {
                outcome.nonce = Some(nonce);
                events.emit(MiningEvent::NonceFound {
                    nonce,
                    attempts: outcome.attempts,
                });
                return Ok(outcome);
            }

            events.emit(MiningEvent::SearchProgress {
                attempts: outcome.attempts,
            });
            tokio::time::sleep(self.round_pause).await;
        }

        if !outcome.stopped {
            events.emit(MiningEvent::SearchTimedOut {
                attempts: outcome.attempts,
            });
        }
        Ok(outcome)
    }

    fn advance(&mut self) {
        self.cursor = self.cursor.wrapping_add(self.round_span());
    }
}

fn execute(pool: &ThreadPool, tasks: Vec<SearchTask>) -> Vec<SearchResult> {
    pool.install(|| {
        tasks
            .into_par_iter()
            .map(|task| Worker::new(task).run())
            .collect()
    })
}
