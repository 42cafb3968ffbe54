//! Round lifecycle through the public API: timed cycling, failed
//! settlements, and slow spectators.

use async_trait::async_trait;
use roulette_table::{
    config::TableConfig,
    errors::SettlementError,
    games::{BetPayload, SettlementRequest, SettlementResponse, SettlementService},
    table::{BroadcastHub, ClientConnection, Phase, RoundManager, TableEvent},
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

/// Fails every odd round, lands on pocket 17 otherwise
struct FlakySettlement {
    calls: AtomicU64,
}

#[async_trait]
impl SettlementService for FlakySettlement {
    async fn settle(&self, request: SettlementRequest) -> Result<SettlementResponse, SettlementError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.round % 2 == 1 {
            return Err(SettlementError::Transport("settlement host unreachable".to_string()));
        }
        Ok(SettlementResponse::resolve(request.round, 17, &request.wagers))
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

fn config() -> TableConfig {
    TableConfig {
        open_window_ms: 2_000,
        pause_window_ms: 1_000,
        ..TableConfig::default()
    }
}

async fn next_event(conn: &mut ClientConnection) -> TableEvent {
    let frame = conn.outbound.recv().await.expect("connection closed");
    serde_json::from_str(&frame).expect("valid event")
}

async fn wait_for_open(conn: &mut ClientConnection, round: u64) {
    loop {
        if let TableEvent::State {
            phase: Phase::Open,
            round: r,
            ..
        } = next_event(conn).await
        {
            if r == round {
                return;
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_round_is_reported_and_next_round_settles() {
    let hub = Arc::new(BroadcastHub::new(64));
    let mut spectator = hub.register("spectator").await.expect("register");
    let settlement = Arc::new(FlakySettlement {
        calls: AtomicU64::new(0),
    });
    let manager = Arc::new(RoundManager::new(config(), hub.clone(), settlement.clone()));
    let handle = manager.spawn();

    // Round 1 fails
    wait_for_open(&mut spectator, 1).await;
    manager
        .submit_wager("alice", BetPayload::new(vec![17], 10))
        .await
        .expect("bet accepted");
    let failure = loop {
        match next_event(&mut spectator).await {
            TableEvent::Error { round, message } => break (round, message),
            TableEvent::RoundResult { .. } => panic!("round 1 must not produce a result"),
            _ => {}
        }
    };
    assert_eq!(failure.0, 1);
    assert!(failure.1.contains("unreachable"));

    // Round 2 starts clean and settles
    wait_for_open(&mut spectator, 2).await;
    assert_eq!(manager.snapshot().await.wager_count, 0);
    manager
        .submit_wager("bob", BetPayload::new(vec![16, 17, 19, 20], 4))
        .await
        .expect("corner accepted");

    let result = loop {
        if let TableEvent::RoundResult {
            round,
            pocket,
            outcomes,
            total_payout,
        } = next_event(&mut spectator).await
        {
            break (round, pocket, outcomes, total_payout);
        }
    };
    assert_eq!(result.0, 2);
    assert_eq!(result.1, 17);
    assert_eq!(result.2.len(), 1);
    assert_eq!(result.2[0].client, "bob");
    assert!(result.2[0].won);
    assert_eq!(result.3, 36);

    wait_for_open(&mut spectator, 3).await;
    assert_eq!(settlement.calls.load(Ordering::SeqCst), 2);
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_bet_echoes_keep_submission_order() {
    let hub = Arc::new(BroadcastHub::new(64));
    let mut spectator = hub.register("spectator").await.expect("register");
    let manager = Arc::new(RoundManager::new(
        config(),
        hub,
        Arc::new(FlakySettlement {
            calls: AtomicU64::new(0),
        }),
    ));
    let handle = manager.spawn();
    wait_for_open(&mut spectator, 1).await;

    for (i, pocket) in [5i64, 9, 1, 36].iter().enumerate() {
        manager
            .submit_wager(&format!("p{}", i), BetPayload::new(vec![*pocket], 1))
            .await
            .expect("bet accepted");
    }

    let mut echoed = Vec::new();
    while echoed.len() < 4 {
        if let TableEvent::Bet { numbers, .. } = next_event(&mut spectator).await {
            echoed.push(numbers[0]);
        }
    }
    assert_eq!(echoed, vec![5, 9, 1, 36]);
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_slow_spectator_is_evicted_while_table_keeps_running() {
    // a cycle bursts at most three frames (result state, outcome, next open)
    let hub = Arc::new(BroadcastHub::new(4));
    let mut active = hub.register("active").await.expect("register");
    let stalled = hub.register("stalled").await.expect("register");
    let manager = Arc::new(RoundManager::new(
        config(),
        hub.clone(),
        Arc::new(FlakySettlement {
            calls: AtomicU64::new(0),
        }),
    ));
    let handle = manager.spawn();

    // the stalled client never reads; the active one keeps up
    wait_for_open(&mut active, 3).await;

    assert!(!hub.is_connected("stalled").await);
    assert!(hub.is_connected("active").await);
    assert!(stalled.closed.await.is_ok());
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_settlement_that_never_answers_times_out() {
    struct Hung;

    #[async_trait]
    impl SettlementService for Hung {
        async fn settle(&self, _request: SettlementRequest) -> Result<SettlementResponse, SettlementError> {
            std::future::pending().await
        }

        fn name(&self) -> &'static str {
            "hung"
        }
    }

    let hub = Arc::new(BroadcastHub::new(64));
    let mut spectator = hub.register("spectator").await.expect("register");
    let manager = Arc::new(RoundManager::new(config(), hub, Arc::new(Hung)));
    let handle = manager.spawn();

    let started = tokio::time::Instant::now();
    let round = loop {
        if let TableEvent::Error { round, message } = next_event(&mut spectator).await {
            assert!(message.contains("timed out"));
            break round;
        }
    };
    assert_eq!(round, 1);
    // open + pause + settlement timeout
    assert!(started.elapsed() >= Duration::from_millis(2_000 + 1_000 + 2_000));

    wait_for_open(&mut spectator, 2).await;
    handle.abort();
}
