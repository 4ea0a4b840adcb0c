// src/config/config.rs
use crate::{
    miner::{LoopSettings, SubmissionPolicy},
    network::rpc::LedgerConfig,
    types::GasParams,
    utils::error::MinerError,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Environment variable that overrides `network.private_key`
pub const PRIVATE_KEY_ENV: &str = "LAK_MINER_PRIVATE_KEY";

/// Main configuration structure for the mining application
///
/// Contains all settings needed to configure mining operations: the ledger
/// connection, search tuning, gas bounds, retry policy and reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ledger connection settings
    pub network: LedgerConfig,

    /// Search tuning
    #[serde(default)]
    pub mining: MiningConfig,

    /// Fixed gas bounds for submissions
    #[serde(default)]
    pub gas: GasParams,

    /// Submission retry policy
    #[serde(default)]
    pub submission: SubmissionConfig,

    /// Status reporting
    #[serde(default)]
    pub stats: StatsConfig,
}

/// Search tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Number of worker threads to use for mining
    /// (0 = number of CPU cores, at least 2)
    #[serde(default)]
    pub worker_threads: usize,

    /// Nonces each worker scans per round
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Search budget per round, in seconds
    #[serde(default = "default_max_mining_time")]
    pub max_mining_time_secs: u64,

    /// Pause between scheduler rounds, in milliseconds
    #[serde(default = "default_round_pause")]
    pub round_pause_ms: u64,

    /// Pause between mining rounds, in milliseconds
    #[serde(default = "default_round_delay")]
    pub round_delay_ms: u64,

    /// Start the nonce cursor at a random offset
    #[serde(default = "default_true")]
    pub randomize_start: bool,

    /// Reward units credited per confirmed mine
    #[serde(default = "default_reward_per_mine")]
    pub reward_per_mine: u64,
}

/// Submission retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Attempts per solution, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay before a retry, in milliseconds
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

/// Status reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Interval between status lines, in seconds
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
}

fn default_batch_size() -> u64 {
    100_000
}

fn default_max_mining_time() -> u64 {
    5
}

fn default_round_pause() -> u64 {
    100
}

fn default_round_delay() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_reward_per_mine() -> u64 {
    1
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    500
}

fn default_report_interval() -> u64 {
    60
}

/// Worker count used when the configuration leaves it at 0
pub fn default_worker_count() -> usize {
    num_cpus::get().max(2)
}

impl Default for MiningConfig {
    fn default() -> Self {
        MiningConfig {
            worker_threads: 0,
            batch_size: default_batch_size(),
            max_mining_time_secs: default_max_mining_time(),
            round_pause_ms: default_round_pause(),
            round_delay_ms: default_round_delay(),
            randomize_start: true,
            reward_per_mine: default_reward_per_mine(),
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        SubmissionConfig {
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            report_interval_secs: default_report_interval(),
        }
    }
}

impl Config {
    /// Loads configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded configuration
    /// * `Err(MinerError)` - If file couldn't be read or parsed
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MinerError> {
        let path = path.into();
        let config_str = std::fs::read_to_string(&path).map_err(|e| {
            MinerError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut config = Self::from_toml(&config_str)?;
        if let Ok(key) = std::env::var(PRIVATE_KEY_ENV) {
            log::debug!("Using private key from {}", PRIVATE_KEY_ENV);
            config.network.private_key = Some(key);
        }
        Ok(config)
    }

    /// Parses configuration from TOML text
    pub fn from_toml(config_str: &str) -> Result<Self, MinerError> {
        toml::from_str(config_str)
            .map_err(|e| MinerError::ConfigError(format!("Invalid config format: {}", e)))
    }

    /// Derives `miner_address` from the signing key when it is unset
    ///
    /// A key that belongs to a different account than `miner_address` is
    /// rejected, since the contract credits `msg.sender`.
    pub fn resolve_identity(&mut self) -> Result<(), MinerError> {
        let Some(signer) = self.network.signer()? else {
            return Ok(());
        };
        let signer_address = signer.address();
        if self.network.miner_address.is_zero() {
            self.network.miner_address = signer_address;
        } else if self.network.miner_address != signer_address {
            return Err(MinerError::ConfigError(format!(
                "network.miner_address {:#x} does not match the private key's account {:#x}",
                self.network.miner_address, signer_address
            )));
        }
        Ok(())
    }

    /// Checks values that would make mining impossible or wasteful
    pub fn validate(&self) -> Result<(), MinerError> {
        let url = Url::parse(&self.network.rpc_url)?;
        if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") {
            return Err(MinerError::ConfigError(format!(
                "rpc_url must use http, https, ws or wss, got '{}'",
                url.scheme()
            )));
        }
        if self.network.contract_address.is_zero() {
            return Err(MinerError::ConfigError(
                "network.contract_address is not set".into(),
            ));
        }
        if self.network.miner_address.is_zero() {
            return Err(MinerError::ConfigError(
                "network.miner_address is not set (set it or network.private_key)".into(),
            ));
        }
        if self.mining.batch_size == 0 {
            return Err(MinerError::ConfigError("mining.batch_size must be > 0".into()));
        }
        if self.mining.max_mining_time_secs == 0 {
            return Err(MinerError::ConfigError(
                "mining.max_mining_time_secs must be > 0".into(),
            ));
        }
        if self.submission.max_attempts == 0 {
            return Err(MinerError::ConfigError(
                "submission.max_attempts must be > 0".into(),
            ));
        }
        if self.gas.max_priority_fee_per_gas > self.gas.max_fee_per_gas {
            return Err(MinerError::ConfigError(
                "gas.max_priority_fee_per_gas exceeds gas.max_fee_per_gas".into(),
            ));
        }
        Ok(())
    }

    /// Worker thread count after resolving the 0 = auto setting
    pub fn worker_threads(&self) -> usize {
        match self.mining.worker_threads {
            0 => default_worker_count(),
            n => n,
        }
    }

    /// Pause between scheduler rounds
    pub fn round_pause(&self) -> Duration {
        Duration::from_millis(self.mining.round_pause_ms)
    }

    /// Submission settings derived from the `gas` and `submission` sections
    pub fn submission_policy(&self) -> SubmissionPolicy {
        SubmissionPolicy {
            gas: self.gas,
            max_attempts: self.submission.max_attempts,
            retry_backoff: Duration::from_millis(self.submission.retry_backoff_ms),
            reward_per_mine: self.mining.reward_per_mine,
        }
    }

    /// Mining loop settings
    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            miner_address: self.network.miner_address,
            max_mining_time: Duration::from_secs(self.mining.max_mining_time_secs),
            round_delay: Duration::from_millis(self.mining.round_delay_ms),
            submission: self.submission_policy(),
        }
    }

    /// Generates a configuration template string
    ///
    /// # Returns
    /// String containing a commented TOML configuration template
    pub fn generate_template() -> String {
        let mut template = String::new();
        template.push_str("# LAK Miner Configuration\n\n");
        template.push_str("[network]\n");
        template.push_str("# JSON-RPC endpoint (http, https, ws or wss)\n");
        template.push_str("rpc_url = \"wss://monad-testnet.drpc.org\"\n");
        template.push_str("contract_address = \"0x569d430a45F5F71F9f04A882c45eA71274BBa24c\"\n");
        template.push_str("# Derived from the private key when left at zero\n");
        template.push_str("miner_address = \"0x0000000000000000000000000000000000000000\"\n");
        template.push_str("# Signing key; prefer the LAK_MINER_PRIVATE_KEY environment variable\n");
        template.push_str("# private_key = \"0x...\"\n");
        template.push_str("request_timeout_secs = 10\n");
        template.push_str("receipt_poll_interval_ms = 500\n");
        template.push_str("confirmation_timeout_secs = 120\n\n");

        template.push_str("[mining]\n");
        template.push_str("# Number of worker threads (0 = auto-detect, minimum 2)\n");
        template.push_str("worker_threads = 0\n");
        template.push_str("# Nonces per worker per round\n");
        template.push_str("batch_size = 100000\n");
        template.push_str("# Search budget per round, in seconds\n");
        template.push_str("max_mining_time_secs = 5\n");
        template.push_str("round_pause_ms = 100\n");
        template.push_str("round_delay_ms = 1000\n");
        template.push_str("randomize_start = true\n");
        template.push_str("reward_per_mine = 1\n\n");

        template.push_str("[gas]\n");
        template.push_str("gas_limit = 150000\n");
        template.push_str("# Fees in wei (0.01 gwei / 103 gwei)\n");
        template.push_str("max_priority_fee_per_gas = 10000000\n");
        template.push_str("max_fee_per_gas = 103000000000\n\n");

        template.push_str("[submission]\n");
        template.push_str("max_attempts = 3\n");
        template.push_str("retry_backoff_ms = 500\n\n");

        template.push_str("[stats]\n");
        template.push_str("report_interval_secs = 60\n");

        template
    }
}
