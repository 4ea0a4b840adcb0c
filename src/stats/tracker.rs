// src/stats/tracker.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Width of one time-bonus period, in seconds
pub const BONUS_PERIOD_SECS: u64 = 30;
/// Bonus granted per full period, in percent
pub const BONUS_PERCENT_PER_PERIOD: u64 = 10;
/// Number of periods after which the bonus stops growing
pub const MAX_BONUS_PERIODS: u64 = 10;

/// Reward multiplier bonus earned by idle time since the last mine
///
/// Every full [`BONUS_PERIOD_SECS`] adds [`BONUS_PERCENT_PER_PERIOD`]
/// percent, capped at [`MAX_BONUS_PERIODS`] periods.
pub fn time_bonus_percent(time_since_last_event: u64) -> u64 {
    let periods = (time_since_last_event / BONUS_PERIOD_SECS).min(MAX_BONUS_PERIODS);
    periods * BONUS_PERCENT_PER_PERIOD
}

/// Point-in-time copy of the process-wide counters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CumulativeStats {
    /// Confirmed submissions
    pub success_count: u64,
    /// Rejected or failed submissions
    pub failure_count: u64,
    /// Reward units credited by confirmed submissions
    pub total_reward_units: u64,
    /// Hashes computed across all rounds and workers
    pub total_attempts: u64,
    /// Wall-clock time since the tracker was created
    pub elapsed: Duration,
}

impl CumulativeStats {
    /// Average hashes per second over the whole run
    pub fn hashrate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_attempts as f64 / secs
        } else {
            0.0
        }
    }

    /// Hashrate formatted the way the status line shows it
    pub fn hashrate_display(&self) -> String {
        let rate = self.hashrate();
        if rate > 0.0 {
            format!("{:.1} kH/s", rate / 1000.0)
        } else {
            "0 H/s".to_string()
        }
    }
}

/// Running counters for throughput and submission outcomes
///
/// Only the control flow writes here; the reporter reads concurrently.
/// Counters are reset only by constructing a new tracker at process start.
#[derive(Debug)]
pub struct RoundStatsTracker {
    successes: AtomicU64,
    failures: AtomicU64,
    rewards: AtomicU64,
    attempts: AtomicU64,
    start_time: Instant,
}

impl Default for RoundStatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundStatsTracker {
    /// Creates a tracker whose clock starts now
    pub fn new() -> Self {
        RoundStatsTracker {
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            rewards: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Adds hashes computed during a search, found or not
    pub fn record_attempts(&self, attempts: u64) {
        self.attempts.fetch_add(attempts, Ordering::Relaxed);
    }

    /// Records a confirmed submission worth `reward_units`
    pub fn record_confirmed(&self, reward_units: u64) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.rewards.fetch_add(reward_units, Ordering::Relaxed);
    }

    /// Records a rejected or failed submission
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counters
    pub fn snapshot(&self) -> CumulativeStats {
        CumulativeStats {
            success_count: self.successes.load(Ordering::Relaxed),
            failure_count: self.failures.load(Ordering::Relaxed),
            total_reward_units: self.rewards.load(Ordering::Relaxed),
            total_attempts: self.attempts.load(Ordering::Relaxed),
            elapsed: self.start_time.elapsed(),
        }
    }

    /// `total_attempts / elapsed seconds`
    pub fn hashrate(&self) -> f64 {
        self.snapshot().hashrate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_bonus_buckets_full_periods() {
        assert_eq!(time_bonus_percent(0), 0);
        assert_eq!(time_bonus_percent(29), 0);
        assert_eq!(time_bonus_percent(30), 10);
        assert_eq!(time_bonus_percent(95), 30);
        assert_eq!(time_bonus_percent(299), 90);
    }

    #[test]
    fn time_bonus_is_capped() {
        assert_eq!(time_bonus_percent(300), 100);
        assert_eq!(time_bonus_percent(10_000), 100);
        assert_eq!(time_bonus_percent(u64::MAX), 100);
    }

    #[test]
    fn outcomes_update_the_right_counters() {
        let tracker = RoundStatsTracker::new();
        tracker.record_attempts(1_000);
        tracker.record_attempts(500);
        tracker.record_confirmed(1);
        tracker.record_failure();
        tracker.record_failure();

        let stats = tracker.snapshot();
        assert_eq!(stats.total_attempts, 1_500);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.failure_count, 2);
        assert_eq!(stats.total_reward_units, 1);
    }

    #[test]
    fn hashrate_divides_attempts_by_elapsed_time() {
        let stats = CumulativeStats {
            success_count: 0,
            failure_count: 0,
            total_reward_units: 0,
            total_attempts: 50_000,
            elapsed: Duration::from_secs(10),
        };
        assert_eq!(stats.hashrate(), 5_000.0);
        assert_eq!(stats.hashrate_display(), "5.0 kH/s");

        let idle = CumulativeStats {
            elapsed: Duration::ZERO,
            ..stats
        };
        assert_eq!(idle.hashrate(), 0.0);
        assert_eq!(idle.hashrate_display(), "0 H/s");
    }
}
