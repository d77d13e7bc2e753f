//! Error types for ring lookups and configuration.

/// Errors returned by ring lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    /// The ring has no nodes, so no key can be placed.
    #[error("empty ring")]
    EmptyRing,
}

/// Errors produced while interpreting ring configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The hash function name is not one of the built-in kinds.
    #[error("unknown hash function: {0} (expected crc32, fnv1a or blake3)")]
    UnknownHasher(String),
}
