// src/cli/commands.rs
use alloy_primitives::U256;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// LAK Miner CLI - proof-of-work miner for the LAK token contract
#[derive(Parser, Debug)]
#[command(name = "lak-miner-rs")]
#[command(version, about, long_about = None)]
pub struct Commands {
    /// The action to perform
    #[command(subcommand)]
    pub action: Action,
}

/// Top-level commands for the miner application
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Start mining against the configured contract
    Start(StartOptions),

    /// Measure local hashrate without touching the network
    Bench(BenchOptions),

    /// Generate configuration file template
    Config(ConfigOptions),

    /// Print contract and miner status
    Status(StatusOptions),

    /// Compare a local validity check with the contract's own
    Verify(VerifyOptions),
}

/// Options for starting the mining operation
#[derive(Parser, Debug)]
pub struct StartOptions {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Number of worker threads to use (overrides config)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Nonces per worker per round (overrides config)
    #[arg(short, long)]
    pub batch_size: Option<u64>,
}

/// Options for the local hashrate benchmark
#[derive(Parser, Debug)]
pub struct BenchOptions {
    /// Duration of benchmark in seconds
    #[arg(short, long, default_value_t = 30)]
    pub duration: u64,

    /// Number of threads to use
    #[arg(short, long, default_value_t = crate::config::default_worker_count())]
    pub threads: usize,

    /// Nonces per worker per round
    #[arg(short, long, default_value_t = 100_000)]
    pub batch_size: u64,
}

/// Options for generating configuration files
#[derive(Parser, Debug)]
pub struct ConfigOptions {
    /// Output file path
    #[arg(short, long, default_value = "config.toml")]
    pub output: PathBuf,
}

/// Options for the status report
#[derive(Parser, Debug)]
pub struct StatusOptions {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Options for checking a single nonce
#[derive(Parser, Debug)]
pub struct VerifyOptions {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Nonce to check (decimal or 0x-prefixed hex)
    #[arg(short, long, value_parser = parse_u256)]
    pub nonce: U256,

    /// Timestamp to hash with (defaults to the latest block time)
    #[arg(short, long)]
    pub timestamp: Option<u64>,
}

/// Parses a 256-bit integer given in decimal or 0x-prefixed hex
pub fn parse_u256(value: &str) -> Result<U256, String> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(value, 10),
    };
    parsed.map_err(|e| format!("invalid 256-bit integer '{}': {}", value, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_and_hex_nonces() {
        assert_eq!(parse_u256("42").unwrap(), U256::from(42u64));
        assert_eq!(parse_u256("0x2a").unwrap(), U256::from(42u64));
        assert!(parse_u256("nope").is_err());
    }

    #[test]
    fn start_accepts_overrides() {
        let cli = Commands::parse_from([
            "lak-miner-rs",
            "start",
            "--config",
            "miner.toml",
            "--workers",
            "4",
            "--batch-size",
            "500",
        ]);
        match cli.action {
            Action::Start(opts) => {
                assert_eq!(opts.config, PathBuf::from("miner.toml"));
                assert_eq!(opts.workers, Some(4));
                assert_eq!(opts.batch_size, Some(500));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn verify_takes_optional_timestamp() {
        let cli = Commands::parse_from(["lak-miner-rs", "verify", "--nonce", "0x10"]);
        match cli.action {
            Action::Verify(opts) => {
                assert_eq!(opts.nonce, U256::from(16u64));
                assert_eq!(opts.timestamp, None);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }
}
