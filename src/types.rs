// src/types.rs
//! Shared value types passed between the scheduler, the submission
//! pipeline and the reporting layer.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// External proof-of-work parameters captured once per search round
///
/// Fetched in a single set of reads at the start of a round and never
/// mutated; the next round replaces it wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultySnapshot {
    /// Last committed state hash on the contract
    pub last_hash: B256,
    /// Threshold a hash must stay strictly below
    pub effective_difficulty: U256,
    /// Seconds elapsed since the last successful mine on chain
    pub time_since_last_event: u64,
}

/// One worker's share of a search round
///
/// Owned by exactly one worker and immutable once dispatched.
#[derive(Debug, Clone)]
pub struct SearchTask {
    /// First nonce to try
    pub range_start: U256,
    /// Exclusive upper bound
    pub range_end: U256,
    /// Round snapshot shared by every task of the round
    pub snapshot: DifficultySnapshot,
    /// Address the reward is credited to (part of the hash preimage)
    pub miner_address: Address,
    /// Timestamp committed to in the hash and the submission
    pub timestamp: u64,
}

impl SearchTask {
    /// Nonce range covered by this task
    pub fn range(&self) -> Range<U256> {
        self.range_start..self.range_end
    }
}

/// Outcome of a single [`SearchTask`]
///
/// Attempts are reported even when nothing was found so throughput
/// accounting stays exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    /// Whether a valid nonce was found
    pub found: bool,
    /// The first valid nonce in the range, if any
    pub nonce: Option<U256>,
    /// Number of hashes computed
    pub attempts_made: u64,
}

impl SearchResult {
    /// A result carrying a hit
    pub fn hit(nonce: U256, attempts_made: u64) -> Self {
        SearchResult {
            found: true,
            nonce: Some(nonce),
            attempts_made,
        }
    }

    /// A result for an exhausted range
    pub fn miss(attempts_made: u64) -> Self {
        SearchResult {
            found: false,
            nonce: None,
            attempts_made,
        }
    }
}

/// A nonce ready for submission together with the timestamp it was mined at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    /// Winning nonce
    pub nonce: U256,
    /// Timestamp used in the hash preimage
    pub timestamp: u64,
}

/// Fixed gas bounds passed through to every submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasParams {
    /// Gas limit of the `mine` call
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    /// Priority fee per gas, in wei
    #[serde(default = "default_max_priority_fee")]
    pub max_priority_fee_per_gas: u64,
    /// Maximum fee per gas, in wei
    #[serde(default = "default_max_fee")]
    pub max_fee_per_gas: u64,
}

fn default_gas_limit() -> u64 {
    150_000
}

fn default_max_priority_fee() -> u64 {
    // 0.01 gwei
    10_000_000
}

fn default_max_fee() -> u64 {
    // 103 gwei
    103_000_000_000
}

impl Default for GasParams {
    fn default() -> Self {
        GasParams {
            gas_limit: default_gas_limit(),
            max_priority_fee_per_gas: default_max_priority_fee(),
            max_fee_per_gas: default_max_fee(),
        }
    }
}

/// Receipt data the pipeline cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction hash
    pub tx_hash: B256,
    /// True when the transaction executed successfully
    pub success: bool,
    /// Block the transaction was included in, if reported
    pub block_number: Option<u64>,
}

/// Lifecycle of a single mining round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundStatus {
    /// Waiting for the next round
    #[default]
    Idle,
    /// Workers are scanning nonce ranges
    Searching,
    /// A valid nonce was found
    Found,
    /// The solution is being submitted
    Submitting,
    /// The submission was confirmed on chain
    Confirmed,
    /// Submission or round failed
    Failed,
    /// Deadline reached without a valid nonce
    TimedOut,
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundStatus::Idle => write!(f, "idle"),
            RoundStatus::Searching => write!(f, "searching"),
            RoundStatus::Found => write!(f, "nonce found"),
            RoundStatus::Submitting => write!(f, "submitting"),
            RoundStatus::Confirmed => write!(f, "confirmed"),
            RoundStatus::Failed => write!(f, "failed"),
            RoundStatus::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Per-round state visible to the reporting layer
///
/// Created at the start of a round and discarded at its end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiningRoundState {
    /// Current position in the round lifecycle
    pub status: RoundStatus,
    /// Nonce found this round
    pub current_nonce: Option<U256>,
    /// Hash of the submitted transaction
    pub current_tx: Option<B256>,
}

impl MiningRoundState {
    /// Returns a copy moved to `status`, keeping nonce and transaction
    pub fn with_status(&self, status: RoundStatus) -> Self {
        MiningRoundState {
            status,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_defaults_match_fixed_bounds() {
        let gas = GasParams::default();
        assert_eq!(gas.gas_limit, 150_000);
        assert_eq!(gas.max_priority_fee_per_gas, 10_000_000);
        assert_eq!(gas.max_fee_per_gas, 103_000_000_000);
    }

    #[test]
    fn gas_bounds_load_from_toml() {
        let gas: GasParams =
            toml::from_str("max_priority_fee_per_gas = 20000000\nmax_fee_per_gas = 103000000000\n")
                .unwrap();
        assert_eq!(gas.gas_limit, 150_000);
        assert_eq!(gas.max_priority_fee_per_gas, 20_000_000);
        assert_eq!(gas.max_fee_per_gas, 103_000_000_000);
    }

    #[test]
    fn round_state_keeps_nonce_across_transitions() {
        let state = MiningRoundState {
            status: RoundStatus::Found,
            current_nonce: Some(U256::from(7u64)),
            current_tx: None,
        };
        let next = state.with_status(RoundStatus::Submitting);
        assert_eq!(next.status, RoundStatus::Submitting);
        assert_eq!(next.current_nonce, Some(U256::from(7u64)));
    }
}
