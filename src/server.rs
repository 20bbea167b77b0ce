//! Caller-facing HTTP API
//!
//! Provides the query endpoint plus registry, capability, health, and
//! metrics endpoints. Routing and worker failures come back as 200 with
//! explanatory text; only oracle faults and deadline expiry use error codes.

use crate::dispatch::DiscoveryError;
use crate::error::OrchestratorError;
use crate::observability::metrics::metrics;
use crate::registry::AgentDescriptor;
use crate::workflow::Orchestrator;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Body of `POST /query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Successful `POST /query` reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
}

/// Error reply for every non-2xx status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Serialize)]
struct AgentListing<'a> {
    agents: Vec<&'a AgentDescriptor>,
}

#[derive(Debug, Serialize)]
struct CapabilityView {
    agent_id: String,
    name: Option<String>,
    version: Option<String>,
    declared: Vec<String>,
    configured: Vec<String>,
    undeclared_in_config: Vec<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    agents: usize,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct LivenessResponse {
    alive: bool,
    timestamp: String,
}

/// HTTP front end over a shared orchestrator
#[derive(Clone)]
pub struct ApiServer {
    orchestrator: Arc<Orchestrator>,
    request_timeout: Duration,
}

impl ApiServer {
    pub fn new(orchestrator: Arc<Orchestrator>, request_timeout: Duration) -> Self {
        Self {
            orchestrator,
            request_timeout,
        }
    }

    /// All routes with rejections mapped to JSON errors
    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
        let orchestrator = self.orchestrator.clone();
        let with_orchestrator = warp::any().map(move || orchestrator.clone());
        let request_timeout = self.request_timeout;

        // POST /query
        let query_route = warp::path("query")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::content_length_limit(MAX_BODY_BYTES))
            .and(warp::body::json::<QueryRequest>())
            .and(with_orchestrator.clone())
            .and_then(move |request: QueryRequest, orchestrator: Arc<Orchestrator>| {
                handle_query(request, orchestrator, request_timeout)
            });

        // GET /agents
        let agents_route = warp::path("agents")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_orchestrator.clone())
            .map(|orchestrator: Arc<Orchestrator>| {
                let listing = AgentListing {
                    agents: orchestrator.registry().iter().collect(),
                };
                warp::reply::json(&listing)
            });

        // GET /agents/{id}/capabilities
        let capabilities_route = warp::path!("agents" / String / "capabilities")
            .and(warp::get())
            .and(with_orchestrator.clone())
            .and_then(handle_capabilities);

        // GET /health
        let health_route = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_orchestrator)
            .map(|orchestrator: Arc<Orchestrator>| {
                warp::reply::json(&HealthResponse {
                    status: "healthy",
                    agents: orchestrator.registry().len(),
                    timestamp: chrono::Utc::now().to_rfc3339(),
                })
            });

        // GET /live
        let live_route = warp::path("live")
            .and(warp::path::end())
            .and(warp::get())
            .map(|| {
                warp::reply::json(&LivenessResponse {
                    alive: true,
                    timestamp: chrono::Utc::now().to_rfc3339(),
                })
            });

        // GET /metrics
        let metrics_route = warp::path("metrics")
            .and(warp::path::end())
            .and(warp::get())
            .map(|| warp::reply::json(&metrics().snapshot()));

        query_route
            .or(agents_route)
            .or(capabilities_route)
            .or(health_route)
            .or(live_route)
            .or(metrics_route)
            .with(
                warp::cors()
                    .allow_any_origin()
                    .allow_methods(vec!["GET", "POST"])
                    .allow_header("content-type"),
            )
            .recover(handle_rejection)
    }

    /// Bind the listener; the returned future serves until `shutdown` resolves
    pub fn bind<F>(
        &self,
        addr: SocketAddr,
        shutdown: F,
    ) -> Result<(SocketAddr, impl Future<Output = ()> + 'static), warp::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        warp::serve(self.routes()).try_bind_with_graceful_shutdown(addr, shutdown)
    }

    /// Bind and serve until `shutdown` resolves
    pub async fn serve<F>(self, addr: SocketAddr, shutdown: F) -> Result<(), warp::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (bound, server) = self.bind(addr, shutdown)?;

        info!(
            address = %bound,
            agents = self.orchestrator.registry().len(),
            "API server listening"
        );
        server.await;
        info!("API server stopped");

        Ok(())
    }
}

fn error_reply(
    status: StatusCode,
    detail: impl Into<String>,
) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&ErrorBody {
            detail: detail.into(),
        }),
        status,
    )
}

async fn handle_query(
    request: QueryRequest,
    orchestrator: Arc<Orchestrator>,
    request_timeout: Duration,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Infallible> {
    // Dropping the run future on expiry aborts in-flight oracle or worker calls
    let outcome = tokio::time::timeout(request_timeout, orchestrator.run(&request.query)).await;

    let reply = match outcome {
        Ok(Ok(response)) => warp::reply::with_status(
            warp::reply::json(&QueryResponse { response }),
            StatusCode::OK,
        ),
        Ok(Err(e)) => {
            warn!(error = %e, "Query failed with internal fault");
            error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error processing query: {}", e.public_message()),
            )
        }
        Err(_) => {
            let e = OrchestratorError::Timeout {
                seconds: request_timeout.as_secs(),
            };
            warn!(error = %e, "Query deadline expired");
            error_reply(StatusCode::GATEWAY_TIMEOUT, e.public_message())
        }
    };

    Ok(reply)
}

async fn handle_capabilities(
    agent_id: String,
    orchestrator: Arc<Orchestrator>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Infallible> {
    let Some(agent) = orchestrator.registry().get(&agent_id) else {
        return Ok(error_reply(
            StatusCode::NOT_FOUND,
            format!("Unknown agent: {agent_id}"),
        ));
    };

    let reply = match orchestrator.dispatcher().fetch_capabilities(agent).await {
        Ok(report) => {
            let undeclared_in_config = report
                .undeclared_in(&agent.capabilities)
                .into_iter()
                .map(str::to_string)
                .collect();
            warp::reply::with_status(
                warp::reply::json(&CapabilityView {
                    agent_id: agent.id.clone(),
                    name: report.name.clone(),
                    version: report.version.clone(),
                    declared: report.capabilities.clone(),
                    configured: agent.capabilities.clone(),
                    undeclared_in_config,
                }),
                StatusCode::OK,
            )
        }
        Err(e) => {
            warn!(agent_id = %agent.id, error = %e, "Capability discovery failed");
            let detail = match &e {
                DiscoveryError::Transport(_) => format!("Agent {} is unreachable: {e}", agent.id),
                _ => format!("Agent {} gave an invalid capability report: {e}", agent.id),
            };
            error_reply(StatusCode::BAD_GATEWAY, detail)
        }
    };

    Ok(reply)
}

async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {e}"))
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string())
    } else if rejection
        .find::<warp::reject::UnsupportedMediaType>()
        .is_some()
    {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected application/json".to_string(),
        )
    } else if let Some(e) = rejection.find::<warp::cors::CorsForbidden>() {
        (StatusCode::FORBIDDEN, e.to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        warn!(rejection = ?rejection, "Unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(error_reply(status, detail))
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::CLARIFICATION_MESSAGE;
    use crate::testing::mocks::{registry_with_endpoints, KeywordClassifier};
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn server_for(worker_uri: &str, classifier: KeywordClassifier) -> ApiServer {
        let registry = registry_with_endpoints(
            &format!("{worker_uri}/research/query"),
            &format!("{worker_uri}/writer/query"),
        );
        let orchestrator = Orchestrator::new(
            Arc::new(registry),
            Arc::new(classifier),
            Duration::from_secs(2),
        )
        .unwrap();
        ApiServer::new(Arc::new(orchestrator), Duration::from_secs(5))
    }

    fn body_json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_query_success() {
        let worker = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/writer/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": "Fixed paragraph",
                "confidence": 0.9
            })))
            .mount(&worker)
            .await;

        let server = server_for(
            &worker.uri(),
            KeywordClassifier::new().route("grammar", "content_writer"),
        );

        let resp = warp::test::request()
            .method("POST")
            .path("/query")
            .json(&json!({"query": "Please fix the grammar in this paragraph"}))
            .reply(&server.routes())
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp.body());
        assert!(body["response"].as_str().unwrap().contains("Fixed paragraph"));
    }

    #[tokio::test]
    async fn test_unroutable_query_is_still_200() {
        let server = server_for("http://127.0.0.1:9", KeywordClassifier::new());

        let resp = warp::test::request()
            .method("POST")
            .path("/query")
            .json(&json!({"query": "Something unclear"}))
            .reply(&server.routes())
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp.body())["response"], CLARIFICATION_MESSAGE);
    }

    #[tokio::test]
    async fn test_oracle_failure_is_500() {
        let server = server_for("http://127.0.0.1:9", KeywordClassifier::failing());

        let resp = warp::test::request()
            .method("POST")
            .path("/query")
            .json(&json!({"query": "anything"}))
            .reply(&server.routes())
            .await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body_json(resp.body())["detail"].as_str().unwrap().to_string();
        assert!(detail.starts_with("Error processing query:"));
    }

    #[tokio::test]
    async fn test_request_deadline_is_504() {
        let worker = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": "late"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&worker)
            .await;

        let registry = registry_with_endpoints(
            &format!("{}/research/query", worker.uri()),
            &format!("{}/writer/query", worker.uri()),
        );
        let orchestrator = Orchestrator::new(
            Arc::new(registry),
            Arc::new(KeywordClassifier::new().route("fact", "research_agent")),
            Duration::from_secs(10),
        )
        .unwrap();
        let server = ApiServer::new(Arc::new(orchestrator), Duration::from_millis(200));

        let resp = warp::test::request()
            .method("POST")
            .path("/query")
            .json(&json!({"query": "check this fact"}))
            .reply(&server.routes())
            .await;

        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let server = server_for("http://127.0.0.1:9", KeywordClassifier::new());

        let resp = warp::test::request()
            .method("POST")
            .path("/query")
            .header("content-type", "application/json")
            .body("{not json")
            .reply(&server.routes())
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp.body())["detail"].is_string());
    }

    #[tokio::test]
    async fn test_cross_origin_request_gets_cors_headers() {
        let server = server_for("http://127.0.0.1:9", KeywordClassifier::new());

        let resp = warp::test::request()
            .method("GET")
            .path("/health")
            .header("origin", "http://dashboard.local")
            .reply(&server.routes())
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "http://dashboard.local"
        );
    }

    #[tokio::test]
    async fn test_preflight_for_query_is_allowed() {
        let server = server_for("http://127.0.0.1:9", KeywordClassifier::new());

        let resp = warp::test::request()
            .method("OPTIONS")
            .path("/query")
            .header("origin", "http://dashboard.local")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .reply(&server.routes())
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("access-control-allow-methods"));
    }

    #[tokio::test]
    async fn test_forbidden_preflight_is_json_403() {
        let server = server_for("http://127.0.0.1:9", KeywordClassifier::new());

        let resp = warp::test::request()
            .method("OPTIONS")
            .path("/query")
            .header("origin", "http://dashboard.local")
            .header("access-control-request-method", "DELETE")
            .reply(&server.routes())
            .await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(body_json(resp.body())["detail"].is_string());
    }

    #[tokio::test]
    async fn test_list_agents() {
        let server = server_for("http://127.0.0.1:9", KeywordClassifier::new());

        let resp = warp::test::request()
            .method("GET")
            .path("/agents")
            .reply(&server.routes())
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp.body());
        let ids: Vec<&str> = body["agents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["research_agent", "content_writer"]);
    }

    #[tokio::test]
    async fn test_capabilities_unknown_agent_is_404() {
        let server = server_for("http://127.0.0.1:9", KeywordClassifier::new());

        let resp = warp::test::request()
            .method("GET")
            .path("/agents/ghost/capabilities")
            .reply(&server.routes())
            .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_capabilities_unreachable_worker_is_502() {
        let server = server_for("http://127.0.0.1:9", KeywordClassifier::new());

        let resp = warp::test::request()
            .method("GET")
            .path("/agents/research_agent/capabilities")
            .reply(&server.routes())
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_capabilities_report() {
        let worker = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/capabilities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "capabilities": ["editing", "translation"]
            })))
            .mount(&worker)
            .await;

        let server = server_for(&worker.uri(), KeywordClassifier::new());

        let resp = warp::test::request()
            .method("GET")
            .path("/agents/content_writer/capabilities")
            .reply(&server.routes())
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp.body());
        assert_eq!(body["agent_id"], "content_writer");
        assert_eq!(body["undeclared_in_config"], json!(["translation"]));
    }

    #[tokio::test]
    async fn test_health_live_and_metrics() {
        let server = server_for("http://127.0.0.1:9", KeywordClassifier::new());
        let routes = server.routes();

        let health = warp::test::request().path("/health").reply(&routes).await;
        assert_eq!(health.status(), StatusCode::OK);
        assert_eq!(body_json(health.body())["agents"], 2);

        let live = warp::test::request().path("/live").reply(&routes).await;
        assert_eq!(body_json(live.body())["alive"], true);

        let metrics = warp::test::request().path("/metrics").reply(&routes).await;
        assert_eq!(metrics.status(), StatusCode::OK);
        assert!(body_json(metrics.body())["queries"]["received"].is_number());
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let server = server_for("http://127.0.0.1:9", KeywordClassifier::new());

        let resp = warp::test::request()
            .path("/nope")
            .reply(&server.routes())
            .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
