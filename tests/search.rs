mod common;

use alloy_primitives::{Address, B256, U256};
use common::*;
use lak_miner_rs::miner::validator::validate;
use lak_miner_rs::stats::{MiningEvent, NullSink};
use lak_miner_rs::NonceSearchScheduler;
use lak_miner_rs::types::DifficultySnapshot;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

fn far_deadline() -> Instant {
    Instant::now() + Duration::from_secs(30)
}

#[test]
fn scenario_nonce_is_the_only_hit_up_to_42() {
    let difficulty = scenario_difficulty();
    let hits: Vec<u64> = (0..=42u64)
        .filter(|n| {
            validate(
                &SCENARIO_LAST_HASH,
                &SCENARIO_MINER,
                U256::from(*n),
                SCENARIO_TIMESTAMP,
                &difficulty,
            )
            .1
        })
        .collect();
    assert_eq!(hits, vec![42]);

    // Strict comparison: the hash itself is not below hash + 0.
    let (hash, _) = validate(
        &SCENARIO_LAST_HASH,
        &SCENARIO_MINER,
        U256::from(42u64),
        SCENARIO_TIMESTAMP,
        &difficulty,
    );
    let (_, valid) = validate(
        &SCENARIO_LAST_HASH,
        &SCENARIO_MINER,
        U256::from(42u64),
        SCENARIO_TIMESTAMP,
        &U256::from_be_bytes(hash.0),
    );
    assert!(!valid);
}

#[tokio::test]
async fn single_worker_finds_scenario_nonce() {
    let mut scheduler =
        NonceSearchScheduler::with_start(1, 50, Duration::ZERO, U256::ZERO).unwrap();
    let running = AtomicBool::new(true);

    let outcome = scheduler
        .search(
            &scenario_snapshot(),
            SCENARIO_MINER,
            SCENARIO_TIMESTAMP,
            far_deadline(),
            &running,
            &NullSink,
        )
        .await
        .unwrap();

    assert_eq!(outcome.nonce, Some(U256::from(42u64)));
    assert_eq!(outcome.attempts, 43);
    assert_eq!(outcome.rounds, 1);
    assert!(!outcome.stopped);
    // The cursor moves past the round even though it produced a hit.
    assert_eq!(scheduler.cursor(), U256::from(50u64));
}

#[tokio::test]
async fn split_range_finds_the_same_nonce() {
    let mut scheduler =
        NonceSearchScheduler::with_start(2, 25, Duration::ZERO, U256::ZERO).unwrap();
    let running = AtomicBool::new(true);
    let (tx, rx) = crossbeam_channel::unbounded();

    let outcome = scheduler
        .search(
            &scenario_snapshot(),
            SCENARIO_MINER,
            SCENARIO_TIMESTAMP,
            far_deadline(),
            &running,
            &tx,
        )
        .await
        .unwrap();

    assert_eq!(outcome.nonce, Some(U256::from(42u64)));
    // 25 misses in [0, 25) plus 25..=42 in the second worker.
    assert_eq!(outcome.attempts, 43);

    let events: Vec<MiningEvent> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![MiningEvent::NonceFound {
            nonce: U256::from(42u64),
            attempts: 43
        }]
    );
}

#[tokio::test]
async fn impossible_difficulty_times_out_near_the_deadline() {
    let mut scheduler =
        NonceSearchScheduler::with_start(2, 1_000, Duration::from_millis(10), U256::ZERO)
            .unwrap();
    let running = AtomicBool::new(true);
    let (tx, rx) = crossbeam_channel::unbounded();
    let snapshot = DifficultySnapshot {
        last_hash: B256::ZERO,
        effective_difficulty: U256::ZERO,
        time_since_last_event: 0,
    };

    let budget = Duration::from_millis(200);
    let started = Instant::now();
    let outcome = scheduler
        .search(
            &snapshot,
            Address::ZERO,
            SCENARIO_TIMESTAMP,
            started + budget,
            &running,
            &tx,
        )
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome.nonce, None);
    assert!(!outcome.stopped);
    assert!(outcome.rounds >= 1);
    assert_eq!(outcome.attempts, outcome.rounds * 2_000);
    assert!(elapsed >= budget);
    assert!(elapsed < budget + Duration::from_secs(2), "overran: {:?}", elapsed);

    let last = rx.try_iter().last();
    assert_eq!(
        last,
        Some(MiningEvent::SearchTimedOut {
            attempts: outcome.attempts
        })
    );
}
