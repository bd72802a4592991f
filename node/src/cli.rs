//! # CLI Interface
//!
//! Defines the command-line argument structure for `pacific-node` using
//! `clap` derive. Supports four subcommands: `serve`, `simulate`, `init`,
//! and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pacific vault node.
///
/// Hosts a vault backed by the simulated swap/stake adapter, serves its
/// JSON API, exposes Prometheus metrics, and replays operation scenarios.
#[derive(Parser, Debug)]
#[command(
    name = "pacific-node",
    about = "Pacific vault node",
    version,
    propagate_version = true
)]
pub struct PacificNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Pacific node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the vault's JSON API and metrics endpoint.
    Serve(ServeArgs),
    /// Replay a JSON scenario against a fresh vault and print the result.
    Simulate(SimulateArgs),
    /// Write a default configuration file.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `serve` subcommand.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Path to the node configuration file (JSON).
    ///
    /// When omitted, the built-in devnet configuration is used.
    #[arg(long, short = 'c', env = "PACIFIC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port for the JSON API. Overrides the config file.
    #[arg(long, env = "PACIFIC_API_PORT")]
    pub api_port: Option<u16>,

    /// Port for the Prometheus metrics endpoint. Overrides the config file.
    #[arg(long, env = "PACIFIC_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Log format: `pretty` or `json`. Overrides the config file.
    #[arg(long, env = "PACIFIC_LOG_FORMAT")]
    pub log_format: Option<String>,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Scenario file: a JSON object with a `steps` array.
    #[arg(long, short = 's')]
    pub scenario: PathBuf,

    /// Node configuration the vault is built from. Defaults to devnet.
    #[arg(long, short = 'c', env = "PACIFIC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Stop at the first rejected step and exit with an error.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Where to write the configuration file.
    #[arg(long, short = 'o', default_value = "pacific.json")]
    pub output: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}
