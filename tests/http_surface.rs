//! Operator HTTP surface served over a real listener.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use alloy::consensus::Transaction as _;
use alloy::primitives::{Address, U256};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::watch;

use mempool_agent::http::X_REQUEST_ID;
use mempool_agent::issuer::WithdrawStrategy;
use mempool_agent::watcher::WatcherState;
use mempool_agent::{AgentContext, HttpServer, Shutdown};

mod common;
use common::{account_for, single_ledger_provider, test_config, test_wallet, MockLedger};

struct TestAgent {
    base: String,
    ledger: Arc<MockLedger>,
    shutdown: Shutdown,
    client: reqwest::Client,
}

fn context(ledger: &Arc<MockLedger>) -> AgentContext {
    let wallet = test_wallet();
    let account = account_for(&wallet, ledger);
    let (_, watcher_state) = watch::channel(WatcherState::Disconnected);
    AgentContext::new(
        Arc::new(test_config()),
        single_ledger_provider(ledger),
        account,
        wallet,
        watcher_state,
    )
}

impl TestAgent {
    async fn start() -> Self {
        let ledger = MockLedger::new();
        let ctx = context(&ledger);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        tokio::spawn(HttpServer::new(ctx).run(listener, shutdown.subscribe()));

        Self {
            base: format!("http://{}", addr),
            ledger,
            shutdown,
            client: reqwest::Client::new(),
        }
    }

    async fn withdraw(&self, label: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}/withdraw/{}", self.base, label))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    async fn status(&self) -> Value {
        let response = self
            .client
            .get(format!("{}/status", self.base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.unwrap()
    }
}

impl Drop for TestAgent {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

#[tokio::test]
async fn test_withdraw_returns_hash_and_nonce() {
    let agent = TestAgent::start().await;

    let (status, body) = agent
        .withdraw("standard-eoa", json!({ "amountInNativeUnits": "0.25" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["nonce"], 0);
    assert_eq!(body["strategy"], "standard-eoa");
    assert!(body["transactionHash"].as_str().unwrap().starts_with("0x"));

    let sent = agent.ledger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to(), Some(Address::repeat_byte(0x77)));
    assert_eq!(sent[0].value(), U256::from(250_000_000_000_000_000u64));
    assert_eq!(
        body["transactionHash"].as_str().unwrap(),
        sent[0].tx_hash().to_string()
    );
}

#[tokio::test]
async fn test_every_strategy_label_is_served() {
    let agent = TestAgent::start().await;

    for (i, strategy) in WithdrawStrategy::ALL.iter().enumerate() {
        let (status, body) = agent
            .withdraw(strategy.as_str(), json!({ "amountETH": "0.001" }))
            .await;
        assert_eq!(status, 200, "label {}", strategy);
        assert_eq!(body["strategy"], strategy.as_str());
        assert_eq!(body["nonce"], i as u64);
    }
    assert_eq!(agent.ledger.sent().len(), WithdrawStrategy::ALL.len());
}

#[tokio::test]
async fn test_unknown_label_is_not_found() {
    let agent = TestAgent::start().await;

    let (status, body) = agent
        .withdraw("teleport", json!({ "amountInNativeUnits": "1" }))
        .await;
    assert_eq!(status, 404);
    assert!(body["error"].as_str().unwrap().contains("teleport"));
    assert!(agent.ledger.sent().is_empty());
}

#[tokio::test]
async fn test_malformed_amounts_are_bad_requests() {
    let agent = TestAgent::start().await;

    for body in [
        json!({ "amountInNativeUnits": 0.5 }),
        json!({ "amountInNativeUnits": "-1" }),
        json!({ "amountInNativeUnits": "abc" }),
        json!({ "amountInNativeUnits": "0" }),
        json!({}),
    ] {
        let (status, response) = agent.withdraw("standard-eoa", body.clone()).await;
        assert_eq!(status, 400, "body {}", body);
        assert!(response["error"].is_string());
    }
    assert!(agent.ledger.sent().is_empty());
    assert_eq!(agent.status().await["nextNonce"], 0);
}

#[tokio::test]
async fn test_destination_override() {
    let agent = TestAgent::start().await;
    let destination = Address::repeat_byte(0x55);

    let (status, _) = agent
        .withdraw(
            "gnosis-safe",
            json!({ "amountInNativeUnits": "0.1", "destination": destination.to_string() }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(agent.ledger.sent()[0].to(), Some(destination));

    let (status, body) = agent
        .withdraw(
            "gnosis-safe",
            json!({ "amountInNativeUnits": "0.1", "destination": "0xnope" }),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("destination"));
}

#[tokio::test]
async fn test_rejected_submission_is_server_error() {
    let agent = TestAgent::start().await;
    agent.ledger.reject_sends_with(Some("insufficient funds for gas * price + value"));

    let (status, body) = agent
        .withdraw("standard-eoa", json!({ "amountInNativeUnits": "0.1" }))
        .await;
    assert_eq!(status, 500);
    assert!(body["error"].as_str().unwrap().contains("insufficient funds"));

    // The reserved nonce is burned.
    agent.ledger.reject_sends_with(None);
    let (status, body) = agent
        .withdraw("standard-eoa", json!({ "amountInNativeUnits": "0.1" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["nonce"], 1);
}

#[tokio::test]
async fn test_status_reports_account_and_pool() {
    let agent = TestAgent::start().await;

    let status = agent.status().await;
    assert_eq!(status["status"], "HUNTING");
    assert_eq!(status["walletBalance"], "1.000000000000000000");
    assert_eq!(status["nextNonce"], 0);
    assert_eq!(status["activeEndpoints"], 1);
    assert_eq!(status["endpointPoolSize"], 1);
    assert_eq!(status["degraded"], false);
    assert_eq!(status["watcher"], "disconnected");

    agent
        .withdraw("standard-eoa", json!({ "amountInNativeUnits": "0.1" }))
        .await;
    assert_eq!(agent.status().await["nextNonce"], 1);
}

#[tokio::test]
async fn test_status_degrades_when_ledger_is_down() {
    let agent = TestAgent::start().await;
    agent.ledger.set_down(true);

    let status = agent.status().await;
    assert_eq!(status["status"], "HUNTING");
    assert_eq!(status["walletBalance"], "0.000000000000000000");
    assert_eq!(status["degraded"], true);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let ledger = MockLedger::new();
    let router = HttpServer::new(context(&ledger)).router();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/status")
                .header(X_REQUEST_ID, "op-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[&X_REQUEST_ID], "op-123");

    let response = router
        .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
