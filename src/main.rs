//! Query Orchestrator - Main Entry Point
//!
//! Loads the TOML configuration, builds the classifier oracle and the agent
//! registry, then serves the HTTP API or runs a one-off command.

use clap::{Parser, Subcommand};
use query_orchestrator::config::OrchestratorConfig;
use query_orchestrator::dispatch::Dispatcher;
use query_orchestrator::llm::provider::LlmProvider;
use query_orchestrator::observability::init_logging_with_level;
use query_orchestrator::registry::AgentRegistry;
use query_orchestrator::server::{shutdown_signal, ApiServer};
use query_orchestrator::workflow::Orchestrator;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn, Level};

/// LLM-routed query orchestrator
#[derive(Parser)]
#[command(name = "orchestrator")]
#[command(about = "Routes queries to specialized worker agents using an LLM classifier")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Override server.host
        #[arg(long)]
        host: Option<String>,
        /// Override server.port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Route a single query and print the answer
    Query {
        /// Query text
        text: String,
    },
    /// List configured agents
    Agents {
        /// Ask each worker for its declared capabilities
        #[arg(long)]
        probe: bool,
    },
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => None,
        1 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    };
    init_logging_with_level(level);

    info!("Starting query orchestrator v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve { host, port } => run_server(config, host, port).await,
        Commands::Query { text } => run_query(config, &text).await,
        Commands::Agents { probe } => list_agents(config, probe).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<OrchestratorConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(OrchestratorConfig::load_from_file(path)?)
        }
        None => {
            let default_paths = ["orchestrator.toml", "config/orchestrator.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(OrchestratorConfig::load_from_file(&path)?);
                }
            }

            Err("No configuration file found. Provide one with -c/--config or create orchestrator.toml".into())
        }
    }
}

/// Provider factory for creating the classifier oracle from configuration
struct LlmProviderFactory;

impl LlmProviderFactory {
    fn create_provider(
        config: &OrchestratorConfig,
    ) -> Result<Arc<dyn LlmProvider>, Box<dyn std::error::Error>> {
        use query_orchestrator::llm::providers::{
            AnthropicConfig, AnthropicProvider, GeminiConfig, GeminiProvider, OpenAiConfig,
            OpenAiProvider,
        };

        let api_key = config.get_llm_api_key()?;
        let timeout = config.llm.timeout();
        let base_url = config.llm.base_url.clone();

        match config.llm.provider.as_str() {
            "gemini" => {
                let defaults = GeminiConfig::default();
                let provider = GeminiProvider::new(GeminiConfig {
                    api_key,
                    base_url: base_url.unwrap_or(defaults.base_url),
                    timeout,
                })?;
                Ok(Arc::new(provider))
            }
            "openai" => {
                let defaults = OpenAiConfig::default();
                let provider = OpenAiProvider::new(OpenAiConfig {
                    api_key,
                    base_url: base_url.unwrap_or(defaults.base_url),
                    timeout,
                })?;
                Ok(Arc::new(provider))
            }
            "anthropic" => {
                let defaults = AnthropicConfig::default();
                let provider = AnthropicProvider::new(AnthropicConfig {
                    api_key,
                    base_url: base_url.unwrap_or(defaults.base_url),
                    timeout,
                    ..defaults
                })?;
                Ok(Arc::new(provider))
            }
            provider => Err(format!("Unsupported LLM provider: {provider}").into()),
        }
    }
}

fn build_orchestrator(
    config: &OrchestratorConfig,
) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let provider = LlmProviderFactory::create_provider(config)?;
    info!(
        provider = provider.name(),
        model = %config.llm.model,
        agents = config.agents.len(),
        "Classifier oracle configured"
    );
    Ok(Orchestrator::from_config(config, provider)?)
}

async fn run_server(
    config: OrchestratorConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = Arc::new(build_orchestrator(&config)?);

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| format!("Invalid listen address {host}:{port}: {e}"))?;

    let server = ApiServer::new(orchestrator, config.server.request_timeout());
    server.serve(addr, shutdown_signal()).await?;

    info!("Application shutdown complete");
    Ok(())
}

async fn run_query(
    config: OrchestratorConfig,
    text: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = build_orchestrator(&config)?;

    let response = tokio::time::timeout(config.server.request_timeout(), orchestrator.run(text))
        .await
        .map_err(|_| {
            format!(
                "Query timed out after {}s",
                config.server.request_timeout_secs
            )
        })??;

    println!("{response}");
    Ok(())
}

async fn list_agents(
    config: OrchestratorConfig,
    probe: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = AgentRegistry::from_entries(&config.agents)?;
    let dispatcher = Dispatcher::new(config.dispatch.timeout())?;

    for agent in registry.iter() {
        println!("{} ({})", agent.id, agent.name);
        println!("  endpoint:     {}", agent.endpoint);
        println!("  description:  {}", agent.description);
        println!("  capabilities: {}", agent.capabilities.join(", "));

        if probe {
            match dispatcher.fetch_capabilities(agent).await {
                Ok(report) => {
                    println!("  declared:     {}", report.capabilities.join(", "));
                    let undeclared = report.undeclared_in(&agent.capabilities);
                    if !undeclared.is_empty() {
                        println!("  not in config: {}", undeclared.join(", "));
                    }
                }
                Err(e) => {
                    warn!(agent_id = %agent.id, error = %e, "Capability probe failed");
                    println!("  declared:     unavailable ({e})");
                }
            }
        }
    }

    Ok(())
}

fn handle_config_command(
    config: OrchestratorConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("{}", toml::to_string_pretty(&config)?);
    }

    info!(agents = config.agents.len(), "Configuration validation complete");
    Ok(())
}
