// src/stats/reporter.rs
use crate::stats::events::{MiningEvent, SubmissionState};
use crate::stats::tracker::{RoundStatsTracker, time_bonus_percent};
use crate::types::MiningRoundState;
use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender};
use log::Level;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use sysinfo::System;

/// Statistics related to hardware load
#[derive(Debug, Clone)]
pub struct HardwareStats {
    /// Current CPU usage percentage (0-100)
    pub cpu_usage: f32,
    /// Memory currently in use on the host (in bytes)
    pub memory_used: u64,
}

/// Periodically logs mining progress and relays core events to the log
pub struct StatsReporter {
    /// Counters written by the mining loop
    tracker: Arc<RoundStatsTracker>,
    /// Round state published by the mining loop
    round_state: Arc<ArcSwap<MiningRoundState>>,
    /// System information collector
    system: System,
    /// Interval at which stats are reported
    report_interval: Duration,
}

impl StatsReporter {
    /// Creates a new StatsReporter with the specified reporting interval
    pub fn new(
        tracker: Arc<RoundStatsTracker>,
        round_state: Arc<ArcSwap<MiningRoundState>>,
        report_interval: Duration,
    ) -> Self {
        StatsReporter {
            tracker,
            round_state,
            system: System::new_all(),
            report_interval,
        }
    }

    /// Creates and returns a channel sender for mining events
    ///
    /// The returned sender implements `EventSink`; a background thread logs
    /// every event it receives until all senders are dropped.
    pub fn event_sender(&self) -> Sender<MiningEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self::start_event_listener(rx);
        tx
    }

    /// One-line summary of the current round and counters
    pub fn status_line(&self) -> String {
        let state = self.round_state.load();
        let stats = self.tracker.snapshot();
        let nonce = state
            .current_nonce
            .map(|n| n.to_string())
            .unwrap_or_else(|| "...".into());
        let tx = state
            .current_tx
            .map(|tx| tx.to_string())
            .unwrap_or_else(|| "...".into());

        format!(
            "Status: {} | Success: {} | Fails: {} | Rewards: {} | Avg. hashrate: {} | Nonce: {} | TX: {}",
            state.status,
            stats.success_count,
            stats.failure_count,
            stats.total_reward_units,
            stats.hashrate_display(),
            nonce,
            tx
        )
    }

    /// Gets the current hardware statistics
    ///
    /// This refreshes system information before returning the stats.
    pub fn get_hardware_stats(&mut self) -> HardwareStats {
        self.system.refresh_cpu_all();
        self.system.refresh_memory();

        HardwareStats {
            cpu_usage: self.system.global_cpu_usage(),
            memory_used: self.system.used_memory(),
        }
    }

    /// Starts the periodic reporting of statistics
    ///
    /// Spawns a background thread that logs stats at the configured interval
    /// while `running` stays set.
    pub fn start_reporting(&self, running: Arc<AtomicBool>) {
        let tracker = self.tracker.clone();
        let round_state = self.round_state.clone();
        let interval = self.report_interval;

        std::thread::spawn(move || {
            let mut reporter = StatsReporter::new(tracker, round_state, interval);

            while running.load(Ordering::Relaxed) {
                std::thread::sleep(interval);
                let hw_stats = reporter.get_hardware_stats();

                log::info!(
                    "{} | CPU: {:.1}% | Mem: {} MiB",
                    reporter.status_line(),
                    hw_stats.cpu_usage,
                    hw_stats.memory_used / (1024 * 1024)
                );
            }
        });
    }

    /// Logs the final counters, used on shutdown
    pub fn log_final_stats(&self) {
        let stats = self.tracker.snapshot();
        log::info!("Mining stopped. Final stats:");
        log::info!(
            "  - Success: {}, Fails: {}",
            stats.success_count,
            stats.failure_count
        );
        log::info!("  - Total rewards: {}", stats.total_reward_units);
        log::info!("  - Avg. hashrate: {}", stats.hashrate_display());
    }

    /// Starts a listener for mining events on a background thread
    fn start_event_listener(receiver: Receiver<MiningEvent>) {
        std::thread::spawn(move || {
            for event in receiver {
                let (level, message) = describe(&event);
                log::log!(level, "{}", message);
            }
        });
    }
}

/// Log level and message for one event
pub fn describe(event: &MiningEvent) -> (Level, String) {
    match event {
        MiningEvent::RoundStarted {
            last_hash,
            difficulty,
            time_bonus_percent: bonus,
            timestamp,
        } => (
            Level::Info,
            format!(
                "Starting search | lastHash: {} | difficulty: {:#x} | time bonus: +{}% | timestamp: {}",
                last_hash, difficulty, bonus, timestamp
            ),
        ),
        MiningEvent::SearchProgress { attempts } => (
            Level::Debug,
            format!("Mining... (attempts: {:.1}k)", *attempts as f64 / 1000.0),
        ),
        MiningEvent::NonceFound { nonce, attempts } => (
            Level::Info,
            format!("Nonce found: {} after {} attempts", nonce, attempts),
        ),
        MiningEvent::SearchTimedOut { attempts } => (
            Level::Info,
            format!("No nonce before deadline ({} attempts)", attempts),
        ),
        MiningEvent::RoundStatus(status) => (Level::Debug, format!("Round status: {}", status)),
        MiningEvent::Submission(state) => {
            let level = match state {
                SubmissionState::Failed {
                    retryable: true, ..
                } => Level::Warn,
                SubmissionState::Failed { .. } | SubmissionState::RejectedOnChain { .. } => {
                    Level::Error
                }
                _ => Level::Info,
            };
            (level, format!("Submission {}", state))
        }
        MiningEvent::StatsUpdated(stats) => (
            Level::Debug,
            format!(
                "Success: {} | Fails: {} | Rewards: {} | Avg. hashrate: {}",
                stats.success_count,
                stats.failure_count,
                stats.total_reward_units,
                stats.hashrate_display()
            ),
        ),
    }
}

/// Human readable time bonus for a snapshot value
pub fn format_time_bonus(time_since_last_event: u64) -> String {
    format!("+{}%", time_bonus_percent(time_since_last_event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoundStatus;
    use alloy_primitives::{B256, U256};

    #[test]
    fn submission_levels_follow_severity() {
        let retry = MiningEvent::Submission(SubmissionState::Failed {
            retryable: true,
            reason: "could not coalesce".into(),
        });
        assert_eq!(describe(&retry).0, Level::Warn);

        let rejected = MiningEvent::Submission(SubmissionState::RejectedOnChain { tx: B256::ZERO });
        assert_eq!(describe(&rejected).0, Level::Error);

        let confirmed = MiningEvent::Submission(SubmissionState::Confirmed { tx: B256::ZERO });
        assert_eq!(describe(&confirmed).0, Level::Info);
    }

    #[test]
    fn status_line_reflects_published_round_state() {
        let tracker = Arc::new(RoundStatsTracker::new());
        tracker.record_confirmed(1);
        let state = Arc::new(ArcSwap::from_pointee(MiningRoundState {
            status: RoundStatus::Submitting,
            current_nonce: Some(U256::from(42u64)),
            current_tx: None,
        }));

        let reporter = StatsReporter::new(tracker, state, Duration::from_secs(60));
        let line = reporter.status_line();
        assert!(line.starts_with("Status: submitting"));
        assert!(line.contains("Success: 1"));
        assert!(line.contains("Nonce: 42"));
        assert!(line.ends_with("TX: ..."));
    }

    #[test]
    fn status_line_shows_pending_transaction() {
        let tx = B256::repeat_byte(0xcd);
        let state = Arc::new(ArcSwap::from_pointee(MiningRoundState {
            status: RoundStatus::Submitting,
            current_nonce: Some(U256::from(42u64)),
            current_tx: Some(tx),
        }));

        let reporter = StatsReporter::new(Arc::new(RoundStatsTracker::new()), state, Duration::from_secs(60));
        assert!(reporter.status_line().ends_with(&format!("TX: {}", tx)));
    }

    #[test]
    fn time_bonus_formatting() {
        assert_eq!(format_time_bonus(65), "+20%");
    }
}
