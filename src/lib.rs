//! Query Orchestrator
//!
//! Routes a natural-language query to one of several worker services and
//! relays the worker's answer back to the caller.
//!
//! # Overview
//!
//! - A static [`AgentRegistry`] lists the workers, loaded once from TOML
//! - A [`Classifier`] asks an LLM oracle which worker fits the query
//! - The [`routing`] module parses the `AGENT_NAME:` / `REASON:` reply
//! - The [`dispatch`] module forwards the query over HTTP and normalizes the outcome
//! - The [`Orchestrator`] runs the ROUTE -> PROCESS -> END workflow per query
//! - The [`server`] module exposes everything over HTTP with `warp`
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use query_orchestrator::testing::mocks::{test_registry, KeywordClassifier};
//! use query_orchestrator::Orchestrator;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let classifier = KeywordClassifier::new().route("grammar", "content_writer");
//! let orchestrator = Orchestrator::new(
//!     Arc::new(test_registry()),
//!     Arc::new(classifier),
//!     Duration::from_secs(10),
//! )?;
//!
//! let answer = orchestrator.run("Please fix the grammar in this paragraph").await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod llm;
pub mod observability;
pub mod registry;
pub mod routing;
pub mod server;
pub mod testing;
pub mod workflow;

pub use classifier::{Classifier, LlmClassifier};
pub use config::{ConfigError, OrchestratorConfig};
pub use dispatch::{DispatchOutcome, DispatchResult, Dispatcher};
pub use error::{OrchestratorError, OrchestratorResult};
pub use registry::{AgentDescriptor, AgentRegistry};
pub use routing::{QueryRouter, RoutingDecision};
pub use server::ApiServer;
pub use workflow::{NextAction, Orchestrator, WorkflowState};
