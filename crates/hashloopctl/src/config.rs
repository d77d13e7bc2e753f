//! TOML configuration for the `hashloop` CLI.
//!
//! A config file describes a ring and its nodes:
//!
//! ```toml
//! [ring]
//! replicas = 160
//! hasher = "crc32"
//!
//! [[nodes]]
//! name = "cache-a:11211"
//!
//! [[nodes]]
//! name = "cache-b:11211"
//! weight = 50
//!
//! [log]
//! level = "debug"
//! ```

use std::path::Path;

use anyhow::{Context, bail};
use hashloop::{Ring, RingConfig};
use serde::Deserialize;
use tracing::debug;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Ring construction parameters.
    pub ring: RingConfig,
    /// Nodes placed on the ring at startup.
    pub nodes: Vec<NodeEntry>,
    /// Logging configuration.
    pub log: LogSection,
}

/// One `[[nodes]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeEntry {
    /// Node identity.
    pub name: String,
    /// Share of the default replica count, in percent.
    pub weight: Option<usize>,
    /// Explicit replica count.
    pub replicas: Option<usize>,
}

impl NodeEntry {
    /// A node with the default replica count.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: None,
            replicas: None,
        }
    }
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("failed to read {}", p.display()))?;
                Self::from_toml(&content).with_context(|| format!("invalid config {}", p.display()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string.
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Use `replicas` as the per-node count, lowering the floor if needed.
    pub fn override_replicas(&mut self, replicas: usize) {
        self.ring.replicas = replicas;
        self.ring.min_replicas = self.ring.min_replicas.min(replicas);
    }

    /// Build a ring holding every configured node.
    pub fn build_ring(&self) -> anyhow::Result<Ring<String>> {
        let ring = Ring::with_config(&self.ring);

        for entry in &self.nodes {
            match (entry.weight, entry.replicas) {
                (Some(_), Some(_)) => {
                    bail!("node {}: set either weight or replicas, not both", entry.name)
                }
                (Some(weight), None) => ring.add_with_weight(entry.name.clone(), weight),
                (None, Some(replicas)) => ring.add_with_replicas(entry.name.clone(), replicas),
                (None, None) => ring.add(entry.name.clone()),
            }
        }

        debug!(
            nodes = ring.node_count(),
            positions = ring.position_count(),
            replicas = ring.replicas(),
            hasher = %self.ring.hasher,
            "built ring from config"
        );
        Ok(ring)
    }
}
