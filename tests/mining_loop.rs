mod common;

use alloy_primitives::U256;
use common::*;
use lak_miner_rs::MiningLoop;
use lak_miner_rs::miner::{LoopSettings, RoundOutcome, SubmissionPolicy};
use lak_miner_rs::network::ledger::local_timestamp;
use lak_miner_rs::stats::{EventSink, MiningEvent};
use lak_miner_rs::types::RoundStatus;
use lak_miner_rs::NonceSearchScheduler;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn settings() -> LoopSettings {
    LoopSettings {
        miner_address: SCENARIO_MINER,
        max_mining_time: Duration::from_secs(30),
        round_delay: Duration::from_millis(5),
        submission: SubmissionPolicy {
            retry_backoff: Duration::from_millis(5),
            ..SubmissionPolicy::default()
        },
    }
}

fn scheduler() -> NonceSearchScheduler {
    NonceSearchScheduler::with_start(1, 50, Duration::ZERO, U256::ZERO).unwrap()
}

#[tokio::test]
async fn round_submits_and_confirms_the_found_nonce() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let events: Arc<dyn EventSink> = Arc::new(tx);
    let mut mining = MiningLoop::new(MockLedger::scenario(), scheduler(), settings())
        .with_events(events);

    let outcome = mining.run_round().await;

    match outcome {
        RoundOutcome::Submitted(result) => {
            assert!(result.is_confirmed());
            assert_eq!(result.attempts, 1);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(
        mining.ledger().submissions(),
        vec![(U256::from(42u64), SCENARIO_TIMESTAMP)]
    );

    let stats = mining.tracker().snapshot();
    assert_eq!(stats.success_count, 1);
    assert_eq!(stats.failure_count, 0);
    assert_eq!(stats.total_attempts, 43);

    let state = mining.round_state().load_full();
    assert_eq!(state.status, RoundStatus::Confirmed);
    assert_eq!(state.current_nonce, Some(U256::from(42u64)));
    assert_eq!(state.current_tx, Some(SCENARIO_TX));

    let events: Vec<MiningEvent> = rx.try_iter().collect();
    assert!(matches!(
        events.first(),
        Some(MiningEvent::RoundStatus(RoundStatus::Searching))
    ));
    assert!(events.contains(&MiningEvent::RoundStarted {
        last_hash: SCENARIO_LAST_HASH,
        difficulty: scenario_difficulty(),
        time_bonus_percent: 20,
        timestamp: SCENARIO_TIMESTAMP,
    }));
    assert!(matches!(events.last(), Some(MiningEvent::StatsUpdated(_))));
}

#[tokio::test]
async fn pending_transaction_is_published_before_confirmation() {
    let ledger = MockLedger::scenario().with_receipt_delay(Duration::from_millis(300));
    let mut mining = MiningLoop::new(ledger, scheduler(), settings());
    let round_state = mining.round_state();

    let sample = async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        round_state.load_full()
    };
    let (outcome, pending) = tokio::join!(mining.run_round(), sample);

    assert_eq!(pending.status, RoundStatus::Submitting);
    assert_eq!(pending.current_nonce, Some(U256::from(42u64)));
    assert_eq!(pending.current_tx, Some(SCENARIO_TX));
    assert!(matches!(outcome, RoundOutcome::Submitted(ref r) if r.is_confirmed()));
    assert_eq!(mining.round_state().load().status, RoundStatus::Confirmed);
}

#[tokio::test]
async fn snapshot_failure_ends_only_the_round() {
    let ledger = MockLedger::scenario().failing_snapshot_reads(1);
    let mut mining = MiningLoop::new(ledger, scheduler(), settings());

    let first = mining.run_round().await;
    assert!(matches!(first, RoundOutcome::Error(_)));
    assert_eq!(mining.round_state().load().status, RoundStatus::Failed);
    assert_eq!(mining.ledger().submit_calls(), 0);
    assert_eq!(mining.tracker().snapshot().total_attempts, 0);

    let second = mining.run_round().await;
    assert!(matches!(second, RoundOutcome::Submitted(ref r) if r.is_confirmed()));
    assert_eq!(mining.ledger().submit_calls(), 1);
}

#[tokio::test]
async fn block_time_failure_falls_back_to_local_clock() {
    let ledger = MockLedger::scenario().with_block_timestamp(None);
    let mut mining = MiningLoop::new(ledger, scheduler(), settings());

    let before = local_timestamp();
    mining.run_round().await;
    let after = local_timestamp();

    let reads = mining.ledger().difficulty_reads();
    assert_eq!(reads.len(), 1);
    assert!(reads[0] >= before && reads[0] <= after);
}

#[tokio::test]
async fn cleared_flag_stops_before_the_first_round() {
    let mut mining = MiningLoop::new(MockLedger::scenario(), scheduler(), settings());
    mining.running().store(false, Ordering::SeqCst);

    mining.run().await;

    assert_eq!(mining.ledger().submit_calls(), 0);
    assert_eq!(mining.round_state().load().status, RoundStatus::Idle);
}

#[tokio::test]
async fn run_keeps_mining_until_stopped() {
    let mut mining = MiningLoop::new(MockLedger::scenario(), scheduler(), settings());
    let running = mining.running();

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        running.store(false, Ordering::SeqCst);
    });
    mining.run().await;
    stopper.await.unwrap();

    // The first round submits 42; later rounds scan fresh ranges.
    let submissions = mining.ledger().submissions();
    assert!(!submissions.is_empty());
    assert_eq!(submissions[0].0, U256::from(42u64));
    assert!(submissions.windows(2).all(|w| w[0].0 < w[1].0));
    assert_eq!(mining.round_state().load().status, RoundStatus::Idle);
}
