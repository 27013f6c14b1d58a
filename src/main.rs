//! Agent conversation server.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                    AGENT SERVER                      │
//!                  │                                                      │
//!   Browser / CLI  │  ┌──────────┐   ┌──────────────┐   ┌─────────────┐   │
//!   ───────────────┼─▶│ realtime │──▶│ HTTP layers  │──▶│ /api routes │   │
//!        /ws       │  │  (/ws)   │   │ tokens, conv │   │ + SPA files │   │
//!                  │  └────┬─────┘   │ rate, perf,  │   └──────┬──────┘   │
//!                  │       │         │ cors         │          │          │
//!                  │       │         └──────────────┘          ▼          │
//!                  │       │                          ┌──────────────────┐ │
//!                  │       └─────────────────────────▶│ conversation     │ │
//!                  │                                  │ event streams    │ │
//!                  │                                  └──────────────────┘ │
//!                  │  config · observability · lifecycle                  │
//!                  └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use agent_server::config::{load_config, ServerConfig};
use agent_server::observability::{logging, metrics};
use agent_server::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "agent-server")]
#[command(about = "HTTP and realtime server for agent conversations", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener address
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the frontend build directory
    #[arg(long)]
    frontend_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }
    if let Some(dir) = args.frontend_dir {
        config.static_files.directory = dir;
    }

    logging::init_tracing(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "agent-server starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        frontend = %config.static_files.directory,
        rate_limit = config.rate_limit.enabled,
        compression = config.compression.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = HttpServer::bind(&config.listener).await?;
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
