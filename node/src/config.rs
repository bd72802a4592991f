//! # Node Configuration
//!
//! The node is configured from a single JSON file: the vault's construction
//! parameters, the catalogue of simulated pools the adapter knows about, the
//! destinations to register at boot, and the listen ports. CLI flags and
//! environment variables override the ports.

use anyhow::{Context, Result};
use pacific_contracts::{NewDestination, SimulatedAdapter, SimulatedPool, Vault, VaultConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Default port for the JSON API.
pub const DEFAULT_API_PORT: u16 = 9841;

/// Default port for the Prometheus metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

/// Default interval between simulated clock ticks.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;

fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}

fn default_metrics_port() -> u16 {
    DEFAULT_METRICS_PORT
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Full node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Vault construction parameters.
    pub vault: VaultConfig,
    /// Pools the simulated adapter hosts.
    #[serde(default)]
    pub pools: Vec<SimulatedPool>,
    /// Destinations registered by the owner when the node boots, in order.
    #[serde(default)]
    pub destinations: Vec<NewDestination>,
    /// Port for the JSON API.
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Port for the Prometheus metrics endpoint.
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    /// Milliseconds between simulated clock ticks. `0` freezes the clock.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl NodeConfig {
    /// A local development setup: two pools, both registered, fee of 1%.
    pub fn devnet() -> Self {
        let owner = "0x63fc43d4874f314d3f519d9406415dc91c5b11ec";
        let pools = vec![
            SimulatedPool::new(
                "0x10ED43C718714eb63d5aA57B78B54704E256024E",
                "0x73feaa1eE314F8c655E354234017bE2193C9E24E",
                252,
                "0x0E09FaBB73Bd3Ade0a17ECC321fD13a19e81cE82",
            ),
            SimulatedPool::new(
                "0xcF0feBd3f17CEf5b47b0cD257aCf6025c5BFf3b7",
                "0x5c8D727b265DBAfaba67E050f2f739cAeEB4A6F9",
                3,
                "0x603c7f932ED1fc6575303D8Fb018fDCBb0f39a95",
            ),
        ];
        let destinations = pools.iter().map(SimulatedPool::registration).collect();

        Self {
            vault: VaultConfig::new(
                10,
                "0xe9e7CEA3DedcA5984780Bafc599bD69ADd087D56",
                "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c",
                owner,
            ),
            pools,
            destinations,
            api_port: DEFAULT_API_PORT,
            metrics_port: DEFAULT_METRICS_PORT,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            log_format: default_log_format(),
        }
    }

    /// Reads a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config
            .vault
            .validate()
            .with_context(|| format!("invalid vault section in {}", path.display()))?;
        Ok(config)
    }

    /// Writes the config as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Builds the vault and registers every boot-time destination as the
    /// configured owner. Registration events are logged and drained.
    pub fn build_vault(&self) -> Result<Vault<SimulatedAdapter>> {
        let adapter = SimulatedAdapter::with_pools(self.pools.iter().cloned());
        let mut vault =
            Vault::new(self.vault.clone(), adapter).context("failed to construct vault")?;
        let owner = self.vault.owner.clone();
        for destination in &self.destinations {
            vault
                .add_destination(&owner, destination.clone())
                .with_context(|| {
                    format!("failed to register destination {}", destination.router)
                })?;
        }
        for event in vault.drain_events() {
            info!(sequence = event.sequence, kind = ?event.kind, "boot event");
        }
        Ok(vault)
    }
}
