// src/miner/submission.rs
//! Solution submission with bounded retries
//!
//! `Idle → Submitting → AwaitingConfirmation → Confirmed | RejectedOnChain`,
//! with `Failed` reachable from the in-flight states. Transient failures go
//! back to `Idle` and resend the identical `(nonce, timestamp)` payload;
//! duplicate acceptance is left to the contract's own replay protection.

use crate::network::ledger::Ledger;
use crate::stats::events::{EventSink, MiningEvent, SubmissionState};
use crate::stats::tracker::RoundStatsTracker;
use crate::types::{GasParams, Solution};
use crate::utils::error::MinerError;
use std::time::Duration;

/// Retry and gas settings for submissions
#[derive(Debug, Clone, Copy)]
pub struct SubmissionPolicy {
    /// Gas bounds of every submission
    pub gas: GasParams,
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Fixed pause before a retry
    pub retry_backoff: Duration,
    /// Reward units credited per confirmed submission
    pub reward_per_mine: u64,
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        SubmissionPolicy {
            gas: GasParams::default(),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
            reward_per_mine: 1,
        }
    }
}

/// Terminal result of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    /// Terminal state reached
    pub state: SubmissionState,
    /// Attempts made, 1-based
    pub attempts: u32,
}

impl SubmissionOutcome {
    /// True when the transaction was confirmed
    pub fn is_confirmed(&self) -> bool {
        matches!(self.state, SubmissionState::Confirmed { .. })
    }
}

/// Drives a found solution to a terminal on-chain outcome
pub struct SubmissionPipeline<'a, L> {
    ledger: &'a L,
    policy: SubmissionPolicy,
    tracker: &'a RoundStatsTracker,
    events: &'a dyn EventSink,
}

impl<'a, L: Ledger> SubmissionPipeline<'a, L> {
    /// Creates a pipeline over `ledger`
    pub fn new(
        ledger: &'a L,
        policy: SubmissionPolicy,
        tracker: &'a RoundStatsTracker,
        events: &'a dyn EventSink,
    ) -> Self {
        SubmissionPipeline {
            ledger,
            policy,
            tracker,
            events,
        }
    }

    /// Submits `solution` and waits for finalization
    ///
    /// Counts exactly one success or one failure in the tracker. The hash
    /// attempt counter is never touched here.
    pub async fn submit(&self, solution: &Solution) -> SubmissionOutcome {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.transition(SubmissionState::Submitting { attempt });

            match self.attempt(solution).await {
                Ok(state) => {
                    match &state {
                        SubmissionState::Confirmed { .. } => {
                            self.tracker.record_confirmed(self.policy.reward_per_mine)
                        }
                        _ => self.tracker.record_failure(),
                    }
                    self.transition(state.clone());
                    return SubmissionOutcome {
                        state,
                        attempts: attempt,
                    };
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    self.transition(SubmissionState::Failed {
                        retryable: true,
                        reason: format!("{} ({}/{})", e, attempt, max_attempts),
                    });
                    tokio::time::sleep(self.policy.retry_backoff).await;
                    self.transition(SubmissionState::Idle);
                }
                Err(e) => {
                    self.tracker.record_failure();
                    let state = SubmissionState::Failed {
                        retryable: false,
                        reason: e.to_string(),
                    };
                    self.transition(state.clone());
                    return SubmissionOutcome {
                        state,
                        attempts: attempt,
                    };
                }
            }
        }
    }

    /// One send-and-confirm pass
    ///
    /// Returns the terminal state reached on chain, or the error that
    /// interrupted the pass.
    async fn attempt(&self, solution: &Solution) -> Result<SubmissionState, MinerError> {
        let tx = self
            .ledger
            .submit_mine(solution.nonce, solution.timestamp, &self.policy.gas)
            .await?;
        self.transition(SubmissionState::AwaitingConfirmation { tx });

        let receipt = self.ledger.await_receipt(tx).await?;
        if receipt.success {
            Ok(SubmissionState::Confirmed { tx })
        } else {
            Ok(SubmissionState::RejectedOnChain { tx })
        }
    }

    fn transition(&self, state: SubmissionState) {
        self.events.emit(MiningEvent::Submission(state));
    }
}
