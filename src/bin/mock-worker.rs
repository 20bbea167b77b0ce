//! Mock Worker - local stand-in for a worker agent
//!
//! Implements the worker HTTP contract (`POST /query`, `GET /capabilities`)
//! and answers every query with a canned echo, so the orchestrator can be
//! exercised end to end without real worker services.

use clap::Parser;
use query_orchestrator::dispatch::{CapabilityReport, WorkerReply};
use query_orchestrator::observability::init_default_logging;
use query_orchestrator::server::shutdown_signal;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use tracing::{error, info};
use warp::Filter;

/// Mock worker agent speaking the orchestrator's worker contract
#[derive(Parser, Debug)]
#[command(name = "mock-worker")]
#[command(about = "Serve a canned worker agent for local orchestrator runs")]
#[command(version)]
struct Args {
    /// Display name used in replies
    #[arg(long, default_value = "Mock Agent")]
    name: String,

    /// Declared capability (repeatable)
    #[arg(long = "capability", value_name = "TAG")]
    capabilities: Vec<String>,

    /// Confidence attached to every reply
    #[arg(long, default_value_t = 0.8)]
    confidence: f64,

    /// Listen host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Listen port
    #[arg(short, long, default_value_t = 8001)]
    port: u16,
}

#[derive(Debug, Deserialize)]
struct IncomingQuery {
    query: String,
}

fn canned_reply(args: &Args, query: &str) -> WorkerReply {
    let mut metadata = Map::new();
    metadata.insert("agent".to_string(), Value::String(args.name.clone()));
    metadata.insert("query_length".to_string(), json!(query.chars().count()));

    WorkerReply {
        result: format!("{} received your query: {query}", args.name),
        confidence: Some(args.confidence),
        metadata: Some(metadata),
    }
}

#[tokio::main]
async fn main() {
    init_default_logging();
    let args = Arc::new(Args::parse());

    let addr: SocketAddr = match format!("{}:{}", args.host, args.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid listen address {}:{}: {}", args.host, args.port, e);
            process::exit(1);
        }
    };

    let query_args = args.clone();
    let query_route = warp::path("query")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json::<IncomingQuery>())
        .map(move |incoming: IncomingQuery| {
            info!(agent = %query_args.name, query_len = incoming.query.len(), "Query received");
            warp::reply::json(&canned_reply(&query_args, &incoming.query))
        });

    let capability_args = args.clone();
    let capabilities_route = warp::path("capabilities")
        .and(warp::path::end())
        .and(warp::get())
        .map(move || {
            warp::reply::json(&CapabilityReport {
                capabilities: capability_args.capabilities.clone(),
                name: Some(capability_args.name.clone()),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            })
        });

    let routes = query_route.or(capabilities_route);

    match warp::serve(routes).try_bind_with_graceful_shutdown(addr, shutdown_signal()) {
        Ok((bound, server)) => {
            info!(address = %bound, agent = %args.name, "Mock worker listening");
            server.await;
        }
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            process::exit(1);
        }
    }
}
