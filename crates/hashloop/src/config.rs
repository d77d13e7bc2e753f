//! Ring construction parameters.

use serde::Deserialize;

use crate::hash::HashKind;

/// Replica floor applied by [`Ring::new`](crate::Ring::new).
///
/// Fewer virtual nodes than this gives visibly uneven key distribution.
pub const MIN_REPLICAS: usize = 100;

/// Default replicas per node.
pub const DEFAULT_REPLICAS: usize = MIN_REPLICAS;

/// Weight that maps to the full default replica count.
pub const TOP_WEIGHT: usize = 100;

/// Configuration for a [`Ring`](crate::Ring).
///
/// Deserializes from a table such as:
///
/// ```toml
/// replicas = 160
/// min_replicas = 100
/// hasher = "crc32"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Default number of virtual nodes per node. Also the upper bound for
    /// per-node replica counts.
    pub replicas: usize,
    /// Floor that `replicas` is raised to.
    pub min_replicas: usize,
    /// Built-in hash function used for placement and lookups.
    pub hasher: HashKind,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            replicas: DEFAULT_REPLICAS,
            min_replicas: MIN_REPLICAS,
            hasher: HashKind::default(),
        }
    }
}

impl RingConfig {
    /// A config with exactly `replicas` virtual nodes per node, no floor.
    pub fn fixed(replicas: usize) -> Self {
        Self {
            replicas,
            min_replicas: 0,
            hasher: HashKind::default(),
        }
    }

    /// Use `hasher` for placement.
    pub fn with_hasher(mut self, hasher: HashKind) -> Self {
        self.hasher = hasher;
        self
    }

    /// Replica count after applying the floor.
    pub fn effective_replicas(&self) -> usize {
        self.replicas.max(self.min_replicas)
    }
}
