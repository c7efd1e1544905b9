//! HTTP API E2E tests against a live server on an ephemeral port.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use e2e_tests::{owner, TestHarness};
use topicflow_extract::MockCompletionClient;
use topicflow_service::{serve_listener, AppState};
use topicflow_types::FlowSettings;

struct Server {
    base: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl Server {
    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap();
    }
}

async fn start(harness: &TestHarness) -> Server {
    let orchestrator =
        harness.orchestrator(Arc::new(MockCompletionClient::heuristic()), FlowSettings::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        serve_listener(listener, AppState::new(orchestrator), async {
            let _ = rx.await;
        })
        .await
        .unwrap();
    });

    Server {
        base,
        shutdown: Some(tx),
        handle,
    }
}

#[tokio::test]
async fn test_update_read_reset_over_http() {
    let harness = TestHarness::new();
    let alice = owner("alice");
    harness.say(&alice, &["Rust ownership and borrowing", "Graph layout spirals"]);
    let server = start(&harness).await;
    let client = reqwest::Client::new();

    let updated: Value = client
        .post(format!("{}/topic-flow/update?owner_id=alice", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["processed_count"], 2);
    assert_eq!(updated["mode"], "incremental");
    assert!(!updated["nodes"].as_array().unwrap().is_empty());

    let current: Value = client
        .get(format!("{}/topic-flow?owner_id=alice", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["nodes"], updated["nodes"]);
    assert_eq!(current["links"], updated["links"]);
    assert_eq!(current["stats"], updated["stats"]);

    let reset = client
        .post(format!("{}/topic-flow/reset?owner_id=alice", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(reset.status(), 200);

    let empty: Value = client
        .get(format!("{}/topic-flow?owner_id=alice", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(empty["nodes"], serde_json::json!([]));
    assert_eq!(empty["links"], serde_json::json!([]));

    server.stop().await;
}

#[tokio::test]
async fn test_bad_requests_are_rejected() {
    let harness = TestHarness::new();
    let server = start(&harness).await;
    let client = reqwest::Client::new();

    let missing = client
        .get(format!("{}/topic-flow", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 400);
    let body: Value = missing.json().await.unwrap();
    assert!(body["error"].as_str().is_some());

    let bad_mode = client
        .post(format!("{}/topic-flow/update?owner_id=alice&mode=sideways", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_mode.status(), 400);

    let health: Value = client
        .get(format!("{}/health", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    server.stop().await;
}
