//! `hashloop`: inspect key placement on a consistent hashing ring.
//!
//! Builds a ring from a TOML config file and/or `--node` flags, then answers
//! placement questions about it.
//!
//! # Usage
//!
//! ```text
//! hashloop -n a -n b -n c get user:42           # owner of a key
//! hashloop -c ring.toml get-two user:42          # owner and failover
//! hashloop -c ring.toml get-n user:42 -k 3       # three distinct owners
//! hashloop -c ring.toml members                  # registered nodes
//! hashloop -c ring.toml distribution -s 100000   # load per node
//! hashloop -c ring.toml diff --remove b          # keys that would move
//! ```

mod config;
mod telemetry;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hashloop::{HashKind, Ring};
use tracing::info;

use config::{CliConfig, NodeEntry};

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "hashloop",
    version,
    about = "Consistent hashing ring placement inspector"
)]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Extra node to place on the ring. Can be specified multiple times.
    #[arg(short = 'n', long = "node", global = true)]
    nodes: Vec<String>,

    /// Override the default replica count per node. Values below the
    /// configured `min_replicas` also lower that floor.
    #[arg(short, long, global = true)]
    replicas: Option<usize>,

    /// Override the hash function (crc32, fnv1a, blake3).
    #[arg(long, global = true)]
    hasher: Option<HashKind>,

    /// Override the log level.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the node owning a key.
    Get {
        /// Key to place.
        key: String,
    },

    /// Show the node owning a key and its failover node.
    GetTwo {
        /// Key to place.
        key: String,
    },

    /// Show up to N distinct nodes for a key, in ring order.
    GetN {
        /// Key to place.
        key: String,

        /// Number of distinct nodes wanted.
        #[arg(short = 'k', long, default_value = "3")]
        count: usize,
    },

    /// List registered nodes with their replica counts.
    Members,

    /// Count how many sample keys each node owns.
    Distribution {
        /// Number of synthetic keys (`key-0`, `key-1`, ...).
        #[arg(short, long, default_value = "10000")]
        samples: u32,
    },

    /// Show how many sample keys move after a membership change.
    Diff {
        /// Nodes to remove in the new ring.
        #[arg(long)]
        remove: Vec<String>,

        /// Nodes to add in the new ring.
        #[arg(long)]
        add: Vec<String>,

        /// Number of synthetic keys (`key-0`, `key-1`, ...).
        #[arg(short, long, default_value = "10000")]
        samples: u32,
    },
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    // CLI args override config file values.
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    if let Some(replicas) = cli.replicas {
        config.override_replicas(replicas);
    }
    if let Some(hasher) = cli.hasher {
        config.ring.hasher = hasher;
    }
    config
        .nodes
        .extend(cli.nodes.into_iter().map(NodeEntry::plain));

    telemetry::init(&config.log.level);

    let ring = config.build_ring()?;
    info!(
        nodes = ring.node_count(),
        positions = ring.position_count(),
        "ring ready"
    );

    match cli.command {
        Commands::Get { key } => cmd_get(&ring, &key),
        Commands::GetTwo { key } => cmd_get_two(&ring, &key),
        Commands::GetN { key, count } => cmd_get_n(&ring, &key, count),
        Commands::Members => {
            cmd_members(&ring);
            Ok(())
        }
        Commands::Distribution { samples } => {
            cmd_distribution(&ring, samples);
            Ok(())
        }
        Commands::Diff {
            remove,
            add,
            samples,
        } => {
            cmd_diff(&ring, &remove, &add, samples);
            Ok(())
        }
    }
}

// -----------------------------------------------------------------------
// Commands
// -----------------------------------------------------------------------

fn cmd_get(ring: &Ring<String>, key: &str) -> Result<()> {
    let node = ring
        .get(key)
        .with_context(|| format!("cannot place {key:?}"))?;
    println!("{node}");
    Ok(())
}

fn cmd_get_two(ring: &Ring<String>, key: &str) -> Result<()> {
    let (primary, secondary) = ring
        .get_two(key)
        .with_context(|| format!("cannot place {key:?}"))?;
    println!("primary:   {primary}");
    match secondary {
        Some(node) => println!("secondary: {node}"),
        None => println!("secondary: (none)"),
    }
    Ok(())
}

fn cmd_get_n(ring: &Ring<String>, key: &str, count: usize) -> Result<()> {
    let nodes = ring
        .get_n(key, count)
        .with_context(|| format!("cannot place {key:?}"))?;
    for (i, node) in nodes.iter().enumerate() {
        println!("{i}: {node}");
    }
    Ok(())
}

fn cmd_members(ring: &Ring<String>) {
    println!("Ring members: {}", ring.node_count());
    for name in ring.members() {
        let replicas = ring.replicas_of(&name).unwrap_or(0);
        println!("  {name} ({replicas} replicas)");
    }
    println!("Positions: {}", ring.position_count());
}

fn cmd_distribution(ring: &Ring<String>, samples: u32) {
    let keys = sample_keys(samples);
    let counts = ring.distribution(&keys);
    let total = keys.len().max(1) as f64;

    println!("Distribution over {samples} keys:");
    for (name, count) in counts {
        let share = count as f64 / total * 100.0;
        println!("  {name:<24} {count:>8} ({share:5.1}%)");
    }
}

fn cmd_diff(ring: &Ring<String>, remove: &[String], add: &[String], samples: u32) {
    let next = ring.snapshot();
    for name in remove {
        next.remove(name);
    }
    for name in add {
        next.add(name.clone());
    }

    let keys = sample_keys(samples);
    let migrations = Ring::diff(ring, &next, &keys);
    let moved = migrations.len();
    let ratio = moved as f64 / keys.len().max(1) as f64 * 100.0;

    println!("Keys moved: {moved}/{samples} ({ratio:.1}%)");
    let mut flows = BTreeMap::<(String, String), usize>::new();
    for m in migrations {
        *flows.entry((m.from, m.to)).or_default() += 1;
    }
    for ((from, to), count) in flows {
        println!("  {from} -> {to}: {count}");
    }
}

fn sample_keys(count: u32) -> Vec<String> {
    (0..count).map(|i| format!("key-{i}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "hashloop", "get", "user:42", "-n", "a", "-n", "b", "--hasher", "blake3",
        ])
        .unwrap();
        assert_eq!(cli.nodes, vec!["a", "b"]);
        assert_eq!(cli.hasher, Some(HashKind::Blake3));
        assert!(matches!(cli.command, Commands::Get { ref key } if key == "user:42"));
    }

    #[test]
    fn test_cli_rejects_unknown_hasher() {
        let result = Cli::try_parse_from(["hashloop", "--hasher", "md5", "members"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_diff_args() {
        let cli = Cli::try_parse_from([
            "hashloop", "diff", "--remove", "b", "--add", "d", "--add", "e", "-s", "50",
        ])
        .unwrap();
        match cli.command {
            Commands::Diff {
                remove,
                add,
                samples,
            } => {
                assert_eq!(remove, vec!["b"]);
                assert_eq!(add, vec!["d", "e"]);
                assert_eq!(samples, 50);
            }
            _ => panic!("expected diff"),
        }
    }

    #[test]
    fn test_get_on_empty_ring_reports_error() {
        let ring = CliConfig::default().build_ring().unwrap();
        let err = cmd_get(&ring, "k").unwrap_err();
        assert!(format!("{err:#}").contains("empty ring"));
    }
}
