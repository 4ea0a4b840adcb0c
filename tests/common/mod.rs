//! Scripted ledger shared by the integration tests
#![allow(dead_code)]

use alloy_primitives::{Address, B256, U256, address, b256};
use lak_miner_rs::network::Ledger;
use lak_miner_rs::types::{DifficultySnapshot, GasParams, TxReceipt};
use lak_miner_rs::MinerError;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Miner address whose nonce 42 is the lowest hash over 0..=42 for
/// `SCENARIO_LAST_HASH` at `SCENARIO_TIMESTAMP`
pub const SCENARIO_MINER: Address = address!("0x0000000000000000000000000000000000000025");
pub const SCENARIO_LAST_HASH: B256 =
    b256!("0x0000000000000000000000000000000000000000000000000000000000000001");
pub const SCENARIO_TIMESTAMP: u64 = 1000;
/// keccak(lastHash ‖ miner ‖ 42 ‖ 1000) + 1
pub fn scenario_difficulty() -> U256 {
    U256::from_be_bytes(
        b256!("0x120fed264d9f68bd6b0f490e30abd3daec2798e19e7f245f0183493ca9189e1c").0,
    )
}
pub const SCENARIO_TX: B256 =
    b256!("0x00000000000000000000000000000000000000000000000000000000000000aa");

pub fn scenario_snapshot() -> DifficultySnapshot {
    DifficultySnapshot {
        last_hash: SCENARIO_LAST_HASH,
        effective_difficulty: scenario_difficulty(),
        time_since_last_event: 65,
    }
}

/// In-memory ledger with scripted failures
pub struct MockLedger {
    pub last_hash: B256,
    pub difficulty: U256,
    pub time_since_last_mine: u64,
    block_timestamp: Option<u64>,
    snapshot_failures: AtomicU32,
    submit_script: Mutex<VecDeque<Result<B256, MinerError>>>,
    receipt_success: bool,
    receipt_timeout: bool,
    receipt_delay: Duration,
    submit_calls: AtomicU32,
    submissions: Mutex<Vec<(U256, u64)>>,
    difficulty_reads: Mutex<Vec<u64>>,
}

impl MockLedger {
    pub fn new(last_hash: B256, difficulty: U256) -> Self {
        MockLedger {
            last_hash,
            difficulty,
            time_since_last_mine: 65,
            block_timestamp: Some(SCENARIO_TIMESTAMP),
            snapshot_failures: AtomicU32::new(0),
            submit_script: Mutex::new(VecDeque::new()),
            receipt_success: true,
            receipt_timeout: false,
            receipt_delay: Duration::ZERO,
            submit_calls: AtomicU32::new(0),
            submissions: Mutex::new(Vec::new()),
            difficulty_reads: Mutex::new(Vec::new()),
        }
    }

    pub fn scenario() -> Self {
        Self::new(SCENARIO_LAST_HASH, scenario_difficulty())
    }

    /// `None` makes every block timestamp read fail
    pub fn with_block_timestamp(mut self, timestamp: Option<u64>) -> Self {
        self.block_timestamp = timestamp;
        self
    }

    /// The next `count` `lastHash` reads fail
    pub fn failing_snapshot_reads(self, count: u32) -> Self {
        self.snapshot_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Results returned by successive `submit_mine` calls; once drained,
    /// submissions succeed with `SCENARIO_TX`
    pub fn with_submit_results(self, results: Vec<Result<B256, MinerError>>) -> Self {
        *self.submit_script.lock().unwrap() = results.into();
        self
    }

    pub fn with_receipt_success(mut self, success: bool) -> Self {
        self.receipt_success = success;
        self
    }

    /// Every receipt wait ends in `ConfirmationTimeout`
    pub fn with_receipt_timeout(mut self) -> Self {
        self.receipt_timeout = true;
        self
    }

    /// Receipt waits take `delay` before answering
    pub fn with_receipt_delay(mut self, delay: Duration) -> Self {
        self.receipt_delay = delay;
        self
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<(U256, u64)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn difficulty_reads(&self) -> Vec<u64> {
        self.difficulty_reads.lock().unwrap().clone()
    }
}

impl Ledger for MockLedger {
    async fn block_timestamp(&self) -> Result<u64, MinerError> {
        self.block_timestamp
            .ok_or_else(|| MinerError::ConnectionError("node unreachable".into()))
    }

    async fn last_hash(&self) -> Result<B256, MinerError> {
        let remaining = self.snapshot_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.snapshot_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(MinerError::ConnectionError("connection reset by peer".into()));
        }
        Ok(self.last_hash)
    }

    async fn effective_difficulty(&self, timestamp: u64) -> Result<U256, MinerError> {
        self.difficulty_reads.lock().unwrap().push(timestamp);
        Ok(self.difficulty)
    }

    async fn time_since_last_mine(&self) -> Result<u64, MinerError> {
        Ok(self.time_since_last_mine)
    }

    async fn submit_mine(
        &self,
        nonce: U256,
        timestamp: u64,
        _gas: &GasParams,
    ) -> Result<B256, MinerError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submissions.lock().unwrap().push((nonce, timestamp));
        self.submit_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(SCENARIO_TX))
    }

    async fn await_receipt(&self, tx: B256) -> Result<TxReceipt, MinerError> {
        tokio::time::sleep(self.receipt_delay).await;
        if self.receipt_timeout {
            return Err(MinerError::ConfirmationTimeout(tx));
        }
        Ok(TxReceipt {
            tx_hash: tx,
            success: self.receipt_success,
            block_number: Some(1),
        })
    }
}
