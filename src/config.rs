//! Configuration for hashlog
//!
//! Centralized configuration with sensible defaults.

use std::path::{Path, PathBuf};

use crate::hash::{HashAlgorithm, IndexOptions};

/// Main configuration for tools built on hashlog (CLI, builders)
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Read Configuration
    // -------------------------------------------------------------------------
    /// Max bytes pulled per `value_chunk` call when streaming a value out
    pub value_chunk_size: usize,

    // -------------------------------------------------------------------------
    // File Naming
    // -------------------------------------------------------------------------
    /// Extension (without dot) an index file must carry
    pub index_extension: String,

    /// Extension (without dot) of the log paired with an index
    pub log_extension: String,

    // -------------------------------------------------------------------------
    // Index Build Configuration
    // -------------------------------------------------------------------------
    /// Options used when building an index from a log
    pub index: IndexOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            value_chunk_size: 64 * 1024, // 64 KB
            index_extension: "hli".to_string(),
            log_extension: "hll".to_string(),
            index: IndexOptions::default(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Derive the log path paired with an index path.
    ///
    /// "data/users.hli" → Some("data/users.hll"); None if the index path
    /// does not end with the configured index extension.
    pub fn log_path_for(&self, index_path: &Path) -> Option<PathBuf> {
        Self::swap_extension(index_path, &self.index_extension, &self.log_extension)
    }

    /// Derive the index path paired with a log path (reverse of `log_path_for`)
    pub fn index_path_for(&self, log_path: &Path) -> Option<PathBuf> {
        Self::swap_extension(log_path, &self.log_extension, &self.index_extension)
    }

    fn swap_extension(path: &Path, from: &str, to: &str) -> Option<PathBuf> {
        let ext = path.extension()?;
        if ext != from {
            return None;
        }
        // "dir/.hli" has no stem to pair with
        path.file_stem()?;
        Some(path.with_extension(to))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the chunk size used when streaming values
    pub fn value_chunk_size(mut self, size: usize) -> Self {
        self.config.value_chunk_size = size;
        self
    }

    /// Set the index file extension (without dot)
    pub fn index_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.index_extension = ext.into();
        self
    }

    /// Set the log file extension (without dot)
    pub fn log_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.log_extension = ext.into();
        self
    }

    /// Set the hash algorithm recorded in newly built indexes
    pub fn hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.config.index.hash_algorithm = algorithm;
        self
    }

    /// Set the hash seed recorded in newly built indexes
    pub fn hash_seed(mut self, seed: u64) -> Self {
        self.config.index.hash_seed = seed;
        self
    }

    /// Set the slot size (8 or 16 bytes) for newly built indexes
    pub fn slot_size(mut self, size: u32) -> Self {
        self.config.index.slot_size = size;
        self
    }

    /// Set the target load factor for newly built indexes
    pub fn load_factor(mut self, factor: f64) -> Self {
        self.config.index.load_factor = factor;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
