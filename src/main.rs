// src/main.rs
use alloy_primitives::{Address, B256, U256};
use arc_swap::ArcSwap;
use clap::Parser;
use lak_miner_rs::miner::validator::validate;
use lak_miner_rs::network::current_timestamp;
use lak_miner_rs::network::ledger::local_timestamp;
use lak_miner_rs::stats::EventSink;
use lak_miner_rs::stats::reporter::format_time_bonus;
use lak_miner_rs::types::{MiningRoundState, RoundStatus};
use lak_miner_rs::utils::logging::init_bench_logging;
use lak_miner_rs::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

/// Main entry point for the LAK miner
///
/// # Returns
/// - `Ok(())` on successful execution
/// - `Err(MinerError)` if any operation fails
fn main() -> Result<(), MinerError> {
    let cli = cli::Commands::parse();

    match cli.action {
        cli::Action::Start(opts) => start_mining(opts),
        cli::Action::Bench(opts) => run_benchmark(opts),
        cli::Action::Config(opts) => generate_config(opts),
        cli::Action::Status(opts) => show_status(opts),
        cli::Action::Verify(opts) => verify_nonce(opts),
    }
}

/// Starts the mining operation with given configuration options
///
/// # Operations
/// 1. Initializes logging
/// 2. Loads configuration, applies CLI overrides and validates it
/// 3. Checks for a signing key and that the node is reachable (fatal if not)
/// 4. Sets up statistics reporting and Ctrl-C handling
/// 5. Runs mining rounds until stopped
fn start_mining(opts: cli::StartOptions) -> Result<(), MinerError> {
    utils::init_logging();

    let mut config = Config::load(&opts.config)?;
    // Apply CLI overrides
    if let Some(workers) = opts.workers {
        config.mining.worker_threads = workers;
    }
    if let Some(batch_size) = opts.batch_size {
        config.mining.batch_size = batch_size;
    }
    config.resolve_identity()?;
    config.validate()?;

    let rt = Runtime::new()?;
    rt.block_on(async move {
        let ledger = RpcLedger::new(config.network.clone())?;
        if ledger.signer_address().is_none() {
            return Err(MinerError::ConfigError(format!(
                "no signing key: set network.private_key or {}",
                config::PRIVATE_KEY_ENV
            )));
        }
        let info = ledger.chain_info().await.map_err(|e| {
            log::error!("Cannot reach {}: {}", config.network.rpc_url, e);
            e
        })?;
        log::info!("Connected to chain {}", info.chain_id);
        log::info!("Miner: {:#x}", config.network.miner_address);
        log::info!("Balance: {} wei", info.balance);

        let workers = config.worker_threads();
        let scheduler = if config.mining.randomize_start {
            NonceSearchScheduler::new(workers, config.mining.batch_size, config.round_pause())?
        } else {
            NonceSearchScheduler::with_start(
                workers,
                config.mining.batch_size,
                config.round_pause(),
                U256::ZERO,
            )?
        };
        log::info!(
            "Using {} workers x {} nonces per round, starting at nonce {}",
            workers,
            config.mining.batch_size,
            scheduler.cursor()
        );

        let mut mining = MiningLoop::new(ledger, scheduler, config.loop_settings());

        // Statistics reporting
        let reporter = StatsReporter::new(
            mining.tracker(),
            mining.round_state(),
            Duration::from_secs(config.stats.report_interval_secs),
        );
        let events: Arc<dyn EventSink> = Arc::new(reporter.event_sender());
        mining = mining.with_events(events);

        let running = mining.running();
        reporter.start_reporting(running.clone());

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Stop requested, finishing current round");
                running.store(false, Ordering::SeqCst);
            }
        });

        mining.run().await;
        reporter.log_final_stats();
        Ok::<(), MinerError>(())
    })
}

/// Runs the local hashrate benchmark
///
/// Searches against an unreachable difficulty so every round runs to
/// completion; no network access is needed.
fn run_benchmark(opts: cli::BenchOptions) -> Result<(), MinerError> {
    init_bench_logging();

    let tracker = Arc::new(RoundStatsTracker::new());
    let round_state = Arc::new(ArcSwap::from_pointee(
        MiningRoundState::default().with_status(RoundStatus::Searching),
    ));
    let mut reporter = StatsReporter::new(tracker.clone(), round_state, Duration::from_secs(5));
    let events = reporter.event_sender();
    let running = AtomicBool::new(true);

    let mut scheduler = NonceSearchScheduler::new(opts.threads, opts.batch_size, Duration::ZERO)?;
    let snapshot = DifficultySnapshot {
        last_hash: B256::ZERO,
        effective_difficulty: U256::ZERO,
        time_since_last_event: 0,
    };

    log::info!(
        "Starting benchmark for {} seconds on {} threads",
        opts.duration,
        opts.threads
    );

    let rt = Runtime::new()?;
    let deadline = Instant::now() + Duration::from_secs(opts.duration);
    let outcome = rt.block_on(scheduler.search(
        &snapshot,
        Address::ZERO,
        local_timestamp(),
        deadline,
        &running,
        &events,
    ))?;
    tracker.record_attempts(outcome.attempts);

    // Report final results
    let stats = tracker.snapshot();
    let hw_stats = reporter.get_hardware_stats();
    log::info!("Benchmark results:");
    log::info!("Total hashes: {} in {} rounds", stats.total_attempts, outcome.rounds);
    log::info!("Average hashrate: {}", stats.hashrate_display());
    log::info!("CPU usage at end: {:.1}%", hw_stats.cpu_usage);
    log::logger().flush();

    Ok(())
}

/// Generates configuration template file
fn generate_config(opts: cli::ConfigOptions) -> Result<(), MinerError> {
    let config = config::generate_template();
    std::fs::write(&opts.output, config)?;
    println!("Configuration template written to {}", opts.output.display());
    Ok(())
}

/// Prints contract counters and the current difficulty snapshot
fn show_status(opts: cli::StatusOptions) -> Result<(), MinerError> {
    utils::init_logging();
    let config = config::load(&opts.config)?;

    let rt = Runtime::new()?;
    rt.block_on(async move {
        let ledger = RpcLedger::new(config.network.clone())?;
        let info = ledger.chain_info().await?;
        let timestamp = current_timestamp(&ledger).await;
        let (status, snapshot) = futures::try_join!(
            ledger.contract_status(),
            DifficultySnapshot::fetch(&ledger, timestamp)
        )?;

        log::info!("Chain: {} | Block time: {}", info.chain_id, timestamp);
        log::info!("Miner: {:#x}", config.network.miner_address);
        log::info!("Balance: {} wei", info.balance);
        log::info!("Token balance: {}", status.token_balance);
        log::info!(
            "Mines: {} (this miner) / {} (total)",
            status.miner_mines,
            status.total_mines
        );
        log::info!("Remaining supply: {}", status.remaining_supply);
        log::info!(
            "Difficulty: {}% (base {}%)",
            status.difficulty_percent,
            status.base_difficulty_percent
        );
        log::info!("Last hash: {}", snapshot.last_hash);
        log::info!("Effective difficulty: {:#x}", snapshot.effective_difficulty);
        log::info!(
            "Time since last mine: {}s, bonus {}",
            snapshot.time_since_last_event,
            format_time_bonus(snapshot.time_since_last_event)
        );
        Ok::<(), MinerError>(())
    })
}

/// Checks one nonce locally and against the contract's `checkHash`
fn verify_nonce(opts: cli::VerifyOptions) -> Result<(), MinerError> {
    utils::init_logging();
    let config = config::load(&opts.config)?;

    let rt = Runtime::new()?;
    rt.block_on(async move {
        let ledger = RpcLedger::new(config.network.clone())?;
        let timestamp = match opts.timestamp {
            Some(ts) => ts,
            None => current_timestamp(&ledger).await,
        };

        let (snapshot, (remote_hash, remote_valid)) = futures::try_join!(
            DifficultySnapshot::fetch(&ledger, timestamp),
            ledger.check_hash(opts.nonce, timestamp)
        )?;
        let (local_hash, local_valid) = validate(
            &snapshot.last_hash,
            &config.network.miner_address,
            opts.nonce,
            timestamp,
            &snapshot.effective_difficulty,
        );

        log::info!("Nonce {} at timestamp {}", opts.nonce, timestamp);
        log::info!("Local:    {} valid={}", local_hash, local_valid);
        log::info!("Contract: {} valid={}", remote_hash, remote_valid);

        if local_hash != remote_hash {
            return Err(MinerError::ProtocolError(format!(
                "hash mismatch: local {} vs contract {}",
                local_hash, remote_hash
            )));
        }
        if local_valid != remote_valid {
            // The difficulty read and checkHash can straddle a new block.
            log::warn!("Validity differs; difficulty may have changed between calls");
        }
        Ok::<(), MinerError>(())
    })
}
