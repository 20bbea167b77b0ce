//! Caller-facing API over a real socket
//!
//! Binds the server on an ephemeral port, talks to it with reqwest, then
//! shuts it down through the graceful-shutdown signal.

use query_orchestrator::server::{ApiServer, QueryResponse};
use query_orchestrator::testing::mocks::{registry_with_endpoints, KeywordClassifier};
use query_orchestrator::Orchestrator;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use test_helpers::{query_endpoint, start_worker};

#[tokio::test]
async fn test_query_over_http_then_graceful_shutdown() {
    let writer = start_worker("Polished text", 0.88).await;

    let orchestrator = Orchestrator::new(
        Arc::new(registry_with_endpoints(
            "http://127.0.0.1:9/query",
            &query_endpoint(&writer),
        )),
        Arc::new(KeywordClassifier::new().route("grammar", "content_writer")),
        Duration::from_secs(2),
    )
    .unwrap();
    let server = ApiServer::new(Arc::new(orchestrator), Duration::from_secs(5));

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let (addr, serving) = server
        .bind(([127, 0, 0, 1], 0).into(), async {
            let _ = shutdown_rx.await;
        })
        .unwrap();
    let handle = tokio::spawn(serving);

    let client = reqwest::Client::new();

    let reply: QueryResponse = client
        .post(format!("http://{addr}/query"))
        .json(&json!({"query": "Check my grammar please"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(reply.response.contains("Polished text"));

    let unroutable = client
        .post(format!("http://{addr}/query"))
        .json(&json!({"query": "???"}))
        .send()
        .await
        .unwrap();
    assert_eq!(unroutable.status(), reqwest::StatusCode::OK);

    let agents: Value = client
        .get(format!("http://{addr}/agents"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(agents["agents"].as_array().unwrap().len(), 2);

    let metrics: Value = client
        .get(format!("http://{addr}/metrics"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(metrics["queries"]["received"].as_u64().unwrap() >= 2);

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server should stop after shutdown signal")
        .unwrap();
}

#[tokio::test]
async fn test_bind_conflict_is_an_error() {
    let orchestrator = Orchestrator::new(
        Arc::new(registry_with_endpoints(
            "http://127.0.0.1:9/query",
            "http://127.0.0.1:9/query",
        )),
        Arc::new(KeywordClassifier::new()),
        Duration::from_secs(1),
    )
    .unwrap();
    let server = ApiServer::new(Arc::new(orchestrator), Duration::from_secs(1));

    let (addr, _serving) = server
        .bind(([127, 0, 0, 1], 0).into(), std::future::pending())
        .unwrap();

    let second = server.bind(addr, std::future::pending());
    assert!(second.is_err());
}
