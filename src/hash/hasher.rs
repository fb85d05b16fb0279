//! Key hashing
//!
//! The algorithm and seed are recorded in the index header so readers
//! hash exactly as the builder did.

use std::fmt;

use serde::Serialize;
use xxhash_rust::{xxh3::xxh3_64_with_seed, xxh32::xxh32};

/// Hash function used to place keys in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HashAlgorithm {
    /// 64-bit XXH3
    #[serde(rename = "xxh3_64")]
    Xxh3,
    /// 32-bit XXH32, seeded with the low 32 bits of the seed
    #[serde(rename = "xxh32")]
    Xxh32,
}

impl HashAlgorithm {
    /// On-disk identifier
    pub fn id(self) -> u32 {
        match self {
            HashAlgorithm::Xxh3 => 1,
            HashAlgorithm::Xxh32 => 2,
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(HashAlgorithm::Xxh3),
            2 => Some(HashAlgorithm::Xxh32),
            _ => None,
        }
    }

    /// Hash `key` with `seed`
    #[inline]
    pub fn hash(self, key: &[u8], seed: u64) -> u64 {
        match self {
            HashAlgorithm::Xxh3 => xxh3_64_with_seed(key, seed),
            HashAlgorithm::Xxh32 => xxh32(key, seed as u32) as u64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Xxh3 => f.write_str("xxh3-64"),
            HashAlgorithm::Xxh32 => f.write_str("xxh32"),
        }
    }
}
