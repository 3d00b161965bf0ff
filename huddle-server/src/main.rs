use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use huddle::api::McpServer;
use huddle::config::ConfigOrigin;
use huddle::mcp::registry::CapabilityRegistry;
use huddle::mcp::types::Implementation;
use huddle::mcp::{McpHandler, SessionManager};

#[derive(Parser, Debug)]
#[command(name = "huddle-server")]
#[command(about = "Huddle MCP server")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "HUDDLE_CONFIG", default_value = "huddle.toml")]
    config: String,

    /// Host to bind to (overrides server.bind_addr)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides server.bind_addr)
    #[arg(short, long)]
    port: Option<u16>,
}

fn init_tracing(config: &huddle::config::ObservabilityConfig) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
    );
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| config.log_format.clone());

    let registry = tracing_subscriber::registry().with(filter);
    if format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Apply --host/--port on top of the configured bind address
fn resolve_bind_addr(bind_addr: &str, host: Option<String>, port: Option<u16>) -> String {
    let (cfg_host, cfg_port) = match bind_addr.rsplit_once(':') {
        Some((h, p)) => (h.to_string(), p.to_string()),
        None => (bind_addr.to_string(), "3000".to_string()),
    };
    let host = host.unwrap_or(cfg_host);
    let port = port.map(|p| p.to_string()).unwrap_or(cfg_port);
    format!("{}:{}", host, port)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load config
    let (mut config, origin) = huddle::Config::load_or_create(std::path::Path::new(&args.config))?;
    init_tracing(&config.observability);

    match origin {
        ConfigOrigin::File => {}
        ConfigOrigin::Created => tracing::info!("Wrote default config to {}", args.config),
        ConfigOrigin::Unsaved(e) => {
            tracing::warn!("Could not write default config to {}: {:#}", args.config, e)
        }
    }

    config.server.bind_addr = resolve_bind_addr(&config.server.bind_addr, args.host, args.port);
    tracing::info!("Config file: {}", args.config);

    let mut registry = CapabilityRegistry::new();
    huddle::catalog::register_default_catalog(&mut registry, &config.mcp.base_url)?;

    let handler = Arc::new(McpHandler::new(
        Arc::new(registry),
        Implementation::new(config.mcp.name.clone(), config.mcp.version.clone()),
        config.mcp.instructions.clone(),
    ));
    let sessions = Arc::new(SessionManager::new());

    let addr = config.server.bind_addr.clone();
    let mut server = McpServer::new(handler, sessions, config.server);
    if config.observability.metrics_enabled {
        server = server.with_metrics(huddle::metrics::install_recorder()?);
    }

    tracing::info!("Starting {} {} on {}", config.mcp.name, config.mcp.version, addr);
    server.serve(&addr).await?;

    tracing::info!("Server stopped");
    Ok(())
}
