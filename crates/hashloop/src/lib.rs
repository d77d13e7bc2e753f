//! Consistent hashing ring for routing keys to a changing set of nodes.
//!
//! This crate implements a consistent hash ring that maps arbitrary keys to
//! backend nodes (cache shards, servers, partitions). Adding or removing a
//! node only remaps the keys that node owned; everything else stays put.
//!
//! The ring uses virtual nodes (replicas): each node gets multiple positions
//! on the ring, determined by `hash(replica_index ++ node_key)`. More
//! replicas per node = more uniform distribution. Nodes can be weighted as a
//! percentage of the default replica allocation.
//!
//! - [`Ring`]: the ring itself, safe to share between threads.
//! - [`NodeKey`]: how a node value turns into its stable identity string.
//! - [`RingHasher`] / [`HashKind`]: pluggable hash functions.
//! - [`RingConfig`]: serde-friendly construction parameters.

mod config;
mod error;
mod hash;
mod node;
mod ring;


pub use config::{DEFAULT_REPLICAS, MIN_REPLICAS, RingConfig, TOP_WEIGHT};
pub use error::{ConfigError, RingError};
pub use hash::{Blake3, Crc32, Fnv1a, HashKind, RingHasher};
pub use node::{ByDebug, ByDisplay, NodeKey};
pub use ring::{Migration, Ring};
