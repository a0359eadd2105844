//! Bouncer gateway (v1)
//!
//! Sits between many internal clients and one rate-limited upstream API,
//! so the clients never have to coordinate among themselves.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │                     GATEWAY                      │
//!                       │                                                  │
//!   Relay call (JSON)   │  ┌─────────┐    ┌──────────────────────────┐    │
//!   ────────────────────┼─▶│  http   │───▶│       relay engine        │    │
//!                       │  │ server  │    │  gate → limiter → send    │    │
//!                       │  └─────────┘    │  classify → retry / stop  │    │
//!                       │       ▲         └────────────┬─────────────┘    │
//!   Relayed response    │       │                      ▼                   │
//!   ◀───────────────────┼───────┘              ┌──────────────┐           │
//!                       │                      │  transport   │◀──────────┼──── Upstream
//!                       │                      │ (+ETag cache)│───────────┼───▶  API
//!                       │                      └──────────────┘           │
//!                       │  ┌────────────────────────────────────────────┐ │
//!                       │  │ config · observability · lifecycle          │ │
//!                       │  └────────────────────────────────────────────┘ │
//!                       └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use bouncer_gateway::config::{load_config, validate_config, ConfigError, GatewayConfig};
use bouncer_gateway::lifecycle::{wait_for_signal, Shutdown};
use bouncer_gateway::observability::{logging, metrics};
use bouncer_gateway::{HttpServer, Version};

#[derive(Parser)]
#[command(name = "bouncer-gateway")]
#[command(about = "Forwarding gateway with global rate limiting and error budget protection", long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(long)]
    bind: Option<String>,

    /// Override rate_limit.requests_per_second
    #[arg(long)]
    rate: Option<u32>,
}

fn resolve_config(args: &Args) -> Result<GatewayConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    if let Some(bind) = &args.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(rate) = args.rate {
        config.rate_limit.requests_per_second = rate;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = %Version::built(), "bouncer-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        requests_per_second = config.rate_limit.requests_per_second,
        max_attempts = config.retries.max_attempts,
        error_threshold = config.error_budget.threshold,
        cache_enabled = config.cache.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
