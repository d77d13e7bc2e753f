//! Pluggable hash functions for ring placement.
//!
//! A [`RingHasher`] turns an arbitrary byte string into a position on the
//! `u64` circle. It must be deterministic: the same bytes always land on the
//! same position, otherwise lookups and removals stop matching insertions.
//! Swapping the hasher of a populated ring relocates every key.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::ConfigError;

/// A hash function mapping bytes to a ring position.
pub trait RingHasher: Send + Sync {
    /// Hash `data` to a position on the ring.
    fn hash(&self, data: &[u8]) -> u64;
}

impl<F> RingHasher for F
where
    F: Fn(&[u8]) -> u64 + Send + Sync,
{
    fn hash(&self, data: &[u8]) -> u64 {
        self(data)
    }
}

/// CRC-32 (IEEE) widened to `u64`. The default hasher.
///
/// Widening keeps the ordering of the 32-bit values, so ring layouts match
/// those of any other CRC-32 based ring using the same replica keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32;

impl RingHasher for Crc32 {
    fn hash(&self, data: &[u8]) -> u64 {
        u64::from(crc32fast::hash(data))
    }
}

/// 32-bit FNV-1a widened to `u64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fnv1a;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

impl RingHasher for Fnv1a {
    fn hash(&self, data: &[u8]) -> u64 {
        let mut h = FNV_OFFSET_BASIS;
        for byte in data {
            h ^= u32::from(*byte);
            h = h.wrapping_mul(FNV_PRIME);
        }
        u64::from(h)
    }
}

/// BLAKE3 truncated to its first 8 bytes (little-endian).
///
/// Uses the full 64-bit circle, so collisions between replicas are far
/// rarer than with the 32-bit hashers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3;

impl RingHasher for Blake3 {
    fn hash(&self, data: &[u8]) -> u64 {
        let hash = blake3::hash(data);
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }
}

/// Built-in hash function selector, as written in configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashKind {
    /// [`Crc32`].
    #[default]
    Crc32,
    /// [`Fnv1a`].
    Fnv1a,
    /// [`Blake3`].
    Blake3,
}

impl HashKind {
    /// Instantiate the hasher this kind names.
    pub fn hasher(self) -> Arc<dyn RingHasher> {
        match self {
            Self::Crc32 => Arc::new(Crc32),
            Self::Fnv1a => Arc::new(Fnv1a),
            Self::Blake3 => Arc::new(Blake3),
        }
    }
}

impl fmt::Display for HashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Crc32 => "crc32",
            Self::Fnv1a => "fnv1a",
            Self::Blake3 => "blake3",
        };
        f.write_str(name)
    }
}

impl FromStr for HashKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crc32" => Ok(Self::Crc32),
            "fnv1a" | "fnv" => Ok(Self::Fnv1a),
            "blake3" => Ok(Self::Blake3),
            _ => Err(ConfigError::UnknownHasher(s.to_string())),
        }
    }
}
