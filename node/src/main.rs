// Copyright (c) 2026 Pacific DeFi Contributors. MIT License.
// See LICENSE for details.

//! # Pacific Vault Node
//!
//! Entry point for the `pacific-node` binary. Parses CLI arguments,
//! initializes logging and metrics, builds the vault from its configuration,
//! and serves the HTTP API.
//!
//! The binary supports four subcommands:
//!
//! - `serve`    — host the vault behind the JSON API and metrics endpoint
//! - `simulate` — replay a scenario file and print the resulting state
//! - `init`     — write a default configuration file
//! - `version`  — print build version information

mod api;
mod cli;
mod config;
mod logging;
mod metrics;
mod scenario;

use anyhow::{bail, Context, Result};
use clap::Parser;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::signal;

use cli::{Commands, PacificNodeCli};
use config::NodeConfig;
use logging::LogFormat;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PacificNodeCli::parse();

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Simulate(args) => simulate(args),
        Commands::Init(args) => init_config(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<NodeConfig> {
    match path {
        Some(path) => NodeConfig::load(path),
        None => Ok(NodeConfig::devnet()),
    }
}

/// Hosts the vault: API server, metrics endpoint, and the simulated clock.
async fn serve(args: cli::ServeArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(port) = args.api_port {
        config.api_port = port;
    }
    if let Some(port) = args.metrics_port {
        config.metrics_port = port;
    }
    if let Some(format) = args.log_format {
        config.log_format = format;
    }

    logging::init_logging(
        logging::SERVE_FILTER,
        LogFormat::from_str_lossy(&config.log_format),
    );

    tracing::info!(
        api_port = config.api_port,
        metrics_port = config.metrics_port,
        destinations = config.destinations.len(),
        "starting pacific-node"
    );

    // --- Vault ---
    let vault = Arc::new(RwLock::new(config.build_vault()?));

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);
    node_metrics.observe_vault(&vault.read());

    // --- Application state ---
    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        vault: Arc::clone(&vault),
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", config.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", config.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Simulated clock ---
    // Farms accrue rewards per tick; with no live chain the node drives the
    // clock itself. An interval of 0 leaves it to `POST /clock/advance`.
    let clock = (config.tick_interval_ms > 0).then(|| {
        let vault = Arc::clone(&vault);
        let period = std::time::Duration::from_millis(config.tick_interval_ms);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let tick = {
                    let mut vault = vault.write();
                    vault.adapter_mut().advance(1);
                    vault.adapter().now()
                };
                tracing::trace!(tick, "clock advanced");
            }
        })
    });

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    if let Some(clock) = clock {
        clock.abort();
    }
    tracing::info!("pacific-node stopped");
    Ok(())
}

/// Replays a scenario against a vault built from the config and prints the
/// report as JSON on stdout.
fn simulate(args: cli::SimulateArgs) -> Result<()> {
    logging::init_logging(logging::QUIET_FILTER, LogFormat::Pretty);

    let config = load_config(args.config.as_deref())?;
    let scenario = scenario::Scenario::load(&args.scenario)?;
    let mut vault = config.build_vault()?;

    let report = scenario::run(&mut vault, &scenario, args.strict)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Writes the devnet configuration to the requested path.
fn init_config(args: cli::InitArgs) -> Result<()> {
    logging::init_logging(logging::QUIET_FILTER, LogFormat::Pretty);

    if args.output.exists() && !args.force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            args.output.display()
        );
    }
    let config = NodeConfig::devnet();
    config.save(&args.output)?;
    tracing::info!(path = %args.output.display(), "configuration written");

    println!("Configuration written.");
    println!("  File         : {}", args.output.display());
    println!("  Fee          : {} / 1000", config.vault.fee_percent);
    println!("  Destinations : {}", config.destinations.len());
    println!("  API port     : {}", config.api_port);

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("pacific-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc        {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed, that branch never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
