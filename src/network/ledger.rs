// src/network/ledger.rs
//! Remote ledger collaborator
//!
//! Everything the mining core needs from the chain, behind one trait so the
//! core can run against a JSON-RPC node or a scripted ledger in tests.

use crate::types::{DifficultySnapshot, GasParams, TxReceipt};
use crate::utils::error::MinerError;
use alloy_primitives::{B256, U256};
use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

/// Read and write access to the mining contract
pub trait Ledger: Send + Sync {
    /// Timestamp of the latest block, in seconds
    fn block_timestamp(&self) -> impl Future<Output = Result<u64, MinerError>> + Send;

    /// Last committed state hash
    fn last_hash(&self) -> impl Future<Output = Result<B256, MinerError>> + Send;

    /// Difficulty threshold effective at `timestamp`
    fn effective_difficulty(
        &self,
        timestamp: u64,
    ) -> impl Future<Output = Result<U256, MinerError>> + Send;

    /// Seconds since the last successful mine
    fn time_since_last_mine(&self) -> impl Future<Output = Result<u64, MinerError>> + Send;

    /// Sends the state-changing `mine(nonce, timestamp)` call and returns
    /// the transaction hash once the network accepted it
    fn submit_mine(
        &self,
        nonce: U256,
        timestamp: u64,
        gas: &GasParams,
    ) -> impl Future<Output = Result<B256, MinerError>> + Send;

    /// Waits until `tx` is finalized
    fn await_receipt(&self, tx: B256) -> impl Future<Output = Result<TxReceipt, MinerError>> + Send;
}

/// Local wall clock in seconds since the Unix epoch
pub fn local_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Block time, or the local clock when the ledger cannot be reached
///
/// The fallback is a documented degradation, not an error.
pub async fn current_timestamp<L: Ledger>(ledger: &L) -> u64 {
    match ledger.block_timestamp().await {
        Ok(ts) => ts,
        Err(e) => {
            let ts = local_timestamp();
            log::warn!("Block timestamp unavailable ({}), using local clock {}", e, ts);
            ts
        }
    }
}

impl DifficultySnapshot {
    /// Reads the three snapshot values concurrently
    ///
    /// Fails as a whole if any read fails; a partial snapshot is never
    /// produced.
    pub async fn fetch<L: Ledger>(ledger: &L, timestamp: u64) -> Result<Self, MinerError> {
        let (last_hash, effective_difficulty, time_since_last_event) = futures::try_join!(
            ledger.last_hash(),
            ledger.effective_difficulty(timestamp),
            ledger.time_since_last_mine()
        )?;

        Ok(DifficultySnapshot {
            last_hash,
            effective_difficulty,
            time_since_last_event,
        })
    }
}
