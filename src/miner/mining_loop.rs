// src/miner/mining_loop.rs
//! Top-level mining driver
//!
//! Each round: read block time (local clock as fallback), fetch a fresh
//! difficulty snapshot, search until the deadline, and submit any hit.
//! Round-level errors are logged and turned into a round outcome; the loop
//! itself only ends when the `running` flag is cleared.

use crate::miner::scheduler::NonceSearchScheduler;
use crate::miner::submission::{SubmissionOutcome, SubmissionPipeline, SubmissionPolicy};
use crate::network::ledger::{Ledger, current_timestamp};
use crate::stats::events::{EventSink, MiningEvent, NullSink, SubmissionState};
use crate::stats::tracker::{RoundStatsTracker, time_bonus_percent};
use crate::types::{DifficultySnapshot, MiningRoundState, RoundStatus, Solution};
use crate::utils::error::MinerError;
use alloy_primitives::{Address, B256, U256};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Loop-level settings
#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    /// Address credited with rewards and hashed into every preimage
    pub miner_address: Address,
    /// Wall-clock budget of one search
    pub max_mining_time: Duration,
    /// Pause between consecutive rounds
    pub round_delay: Duration,
    /// Submission gas and retry settings
    pub submission: SubmissionPolicy,
}

/// How a round ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Deadline reached without a valid nonce
    TimedOut,
    /// Stop requested before a nonce was found
    Stopped,
    /// A nonce was found and the pipeline reached a terminal state
    Submitted(SubmissionOutcome),
    /// The round could not run (snapshot read or worker failure)
    Error(String),
}

/// Composes snapshot fetch, search, submission and accounting into an
/// endless sequence of rounds
pub struct MiningLoop<L> {
    ledger: L,
    scheduler: NonceSearchScheduler,
    settings: LoopSettings,
    tracker: Arc<RoundStatsTracker>,
    round_state: Arc<ArcSwap<MiningRoundState>>,
    events: Arc<dyn EventSink>,
    running: Arc<AtomicBool>,
}

impl<L: Ledger> MiningLoop<L> {
    /// Creates a loop with fresh counters and no event listener
    pub fn new(ledger: L, scheduler: NonceSearchScheduler, settings: LoopSettings) -> Self {
        MiningLoop {
            ledger,
            scheduler,
            settings,
            tracker: Arc::new(RoundStatsTracker::new()),
            round_state: Arc::new(ArcSwap::from_pointee(MiningRoundState::default())),
            events: Arc::new(NullSink),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Routes events to `events`
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Shares an existing stop flag
    pub fn with_running(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    /// Process-wide counters
    pub fn tracker(&self) -> Arc<RoundStatsTracker> {
        self.tracker.clone()
    }

    /// Current round state as published to reporters
    pub fn round_state(&self) -> Arc<ArcSwap<MiningRoundState>> {
        self.round_state.clone()
    }

    /// Stop flag; clearing it ends the loop at the next round boundary
    pub fn running(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// The ledger this loop mines against
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Runs rounds until the stop flag is cleared
    pub async fn run(&mut self) {
        while self.running.load(Ordering::SeqCst) {
            let outcome = self.run_round().await;
            log::debug!("Round finished: {:?}", outcome);

            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(self.settings.round_delay).await;
        }
        self.publish(MiningRoundState::default());
    }

    /// Runs a single round; never fails
    pub async fn run_round(&mut self) -> RoundOutcome {
        self.publish(MiningRoundState::default().with_status(RoundStatus::Searching));

        let outcome = match self.try_round().await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Round failed: {}", e);
                self.publish(MiningRoundState::default().with_status(RoundStatus::Failed));
                RoundOutcome::Error(e.to_string())
            }
        };

        self.events
            .emit(MiningEvent::StatsUpdated(self.tracker.snapshot()));
        outcome
    }

    async fn try_round(&mut self) -> Result<RoundOutcome, MinerError> {
        let timestamp = current_timestamp(&self.ledger).await;
        let snapshot = DifficultySnapshot::fetch(&self.ledger, timestamp).await?;

        self.events.emit(MiningEvent::RoundStarted {
            last_hash: snapshot.last_hash,
            difficulty: snapshot.effective_difficulty,
            time_bonus_percent: time_bonus_percent(snapshot.time_since_last_event),
            timestamp,
        });

        let deadline = Instant::now() + self.settings.max_mining_time;
        let search = self
            .scheduler
            .search(
                &snapshot,
                self.settings.miner_address,
                timestamp,
                deadline,
                &self.running,
                self.events.as_ref(),
            )
            .await?;
        self.tracker.record_attempts(search.attempts);

        let Some(nonce) = search.nonce else {
            return Ok(if search.stopped {
                self.publish(MiningRoundState::default());
                RoundOutcome::Stopped
            } else {
                self.publish(MiningRoundState::default().with_status(RoundStatus::TimedOut));
                RoundOutcome::TimedOut
            });
        };

        let found = MiningRoundState {
            status: RoundStatus::Found,
            current_nonce: Some(nonce),
            current_tx: None,
        };
        self.publish(found.clone());
        self.publish(found.with_status(RoundStatus::Submitting));

        let events = RoundEvents {
            inner: self.events.as_ref(),
            round_state: &self.round_state,
            nonce,
        };
        let pipeline = SubmissionPipeline::new(
            &self.ledger,
            self.settings.submission,
            &self.tracker,
            &events,
        );
        let result = pipeline.submit(&Solution { nonce, timestamp }).await;

        let status = if result.is_confirmed() {
            RoundStatus::Confirmed
        } else {
            RoundStatus::Failed
        };
        self.publish(MiningRoundState {
            status,
            current_nonce: Some(nonce),
            current_tx: transaction_of(&result.state),
        });

        Ok(RoundOutcome::Submitted(result))
    }

    fn publish(&self, state: MiningRoundState) {
        self.events.emit(MiningEvent::RoundStatus(state.status));
        self.round_state.store(Arc::new(state));
    }
}

/// Forwards submission events and publishes the pending transaction as
/// soon as the ledger accepts it
struct RoundEvents<'a> {
    inner: &'a dyn EventSink,
    round_state: &'a ArcSwap<MiningRoundState>,
    nonce: U256,
}

impl EventSink for RoundEvents<'_> {
    fn emit(&self, event: MiningEvent) {
        if let MiningEvent::Submission(SubmissionState::AwaitingConfirmation { tx }) = &event {
            self.round_state.store(Arc::new(MiningRoundState {
                status: RoundStatus::Submitting,
                current_nonce: Some(self.nonce),
                current_tx: Some(*tx),
            }));
        }
        self.inner.emit(event);
    }
}

fn transaction_of(state: &SubmissionState) -> Option<B256> {
    match state {
        SubmissionState::AwaitingConfirmation { tx }
        | SubmissionState::Confirmed { tx }
        | SubmissionState::RejectedOnChain { tx } => Some(*tx),
        _ => None,
    }
}
