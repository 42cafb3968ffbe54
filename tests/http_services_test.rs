//! Settlement and RNG service modes over HTTP

use roulette_table::{
    api::{create_app, AppState},
    config::{RandomConfig, ServerConfig},
    games::{BetPayload, LocalSettlementService, SettlementRequest, SettlementResponse, SettlementService},
    random::FairRandomSource,
};
use serde_json::Value;
use std::{net::SocketAddr, sync::Arc};

async fn serve(state: AppState) -> String {
    let app = create_app(Arc::new(state), &ServerConfig::default());
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server");
    });
    format!("http://{}", addr)
}

async fn settlement_service(allow_override: bool) -> String {
    let service = LocalSettlementService::new(FairRandomSource::seeded(11)).allow_override(allow_override);
    serve(AppState::for_settlement(Arc::new(service))).await
}

fn request(round: u64) -> SettlementRequest {
    let wagers = vec![
        BetPayload::new(vec![0], 5).into_wager("alice", 1_000).expect("straight"),
        BetPayload::new(vec![1, 2, 3], 3).into_wager("bob", 1_000).expect("street"),
    ];
    SettlementRequest::new(round, wagers)
}

#[tokio::test]
async fn test_settle_with_forced_pocket() {
    let base = settlement_service(true).await;

    let response: SettlementResponse = reqwest::Client::new()
        .post(format!("{}/settle", base))
        .json(&request(8).with_override(Some(2)))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");

    assert_eq!(response.round, 8);
    assert_eq!(response.pocket, 2);
    assert_eq!(response.total_staked, 8);
    assert_eq!(response.total_payout, 36);
    assert!(!response.outcomes[0].won);
    assert!(response.outcomes[1].won);
    assert_eq!(response.outcomes[1].payout, 36);
}

#[tokio::test]
async fn test_settle_refuses_override_when_not_allowed() {
    let base = settlement_service(false).await;

    let response = reqwest::Client::new()
        .post(format!("{}/settle", base))
        .json(&request(1).with_override(Some(0)))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_settle_reclassifies_claimed_bet_type() {
    let base = settlement_service(false).await;

    // two non-adjacent numbers claimed as a split
    let forged = serde_json::json!({
        "round": 3,
        "wagers": [{
            "bet": {"numbers": [1, 5], "bet_type": "Split"},
            "amount": 10,
            "submitter": "mallory"
        }]
    });
    let response = reqwest::Client::new()
        .post(format!("{}/settle", base))
        .json(&forged)
        .send()
        .await
        .expect("request");

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_rng_batches() {
    let base = serve(AppState::for_rng(FairRandomSource::seeded(5))).await;

    let body: Value = reqwest::get(format!("{}/rng?nums=16", base))
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(body["rngs"].as_array().map(|v| v.len()), Some(16));

    let body: Value = reqwest::get(format!("{}/rng", base))
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(body["rngs"].as_array().map(|v| v.len()), Some(1));

    let too_many = reqwest::get(format!("{}/rng?nums=70000", base))
        .await
        .expect("request");
    assert_eq!(too_many.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_routes_of_other_modes_are_not_found() {
    let base = serve(AppState::for_rng(FairRandomSource::seeded(5))).await;

    let state = reqwest::get(format!("{}/state", base)).await.expect("request");
    assert_eq!(state.status(), reqwest::StatusCode::NOT_FOUND);

    let health: Value = reqwest::get(format!("{}/health", base))
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(health["mode"], "rng");
    assert_eq!(health["status"], "Running");
}

#[tokio::test]
async fn test_table_draws_from_remote_rng_service() {
    let base = serve(AppState::for_rng(FairRandomSource::seeded(21))).await;

    // remote only: a failed fetch would surface instead of falling back
    let random = RandomConfig {
        remote_url: Some(base),
        local_fallback: false,
        block_size: 8,
        ..RandomConfig::default()
    };
    let service = LocalSettlementService::new(FairRandomSource::from_config(&random));

    for round in 1..=3 {
        let response = service.settle(request(round)).await.expect("remote draw");
        assert_eq!(response.round, round);
        assert!(response.pocket <= 36);
        assert_eq!(response.outcomes.len(), 2);
    }

    // the blocking HTTP client is released off the async runtime
    tokio::task::spawn_blocking(move || drop(service))
        .await
        .expect("drop service");
}
