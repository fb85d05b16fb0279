//! Index Builder
//!
//! Builds an index file from a finished log: replays the log with
//! last-write-wins semantics, sizes the table for the target load factor
//! and places keys by linear probing.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{HashlogError, Result};
use crate::log::{EntryType, IterState, LogReader};

use super::slot::Slot;
use super::{HashAlgorithm, HashHeader, HASH_VERSION, SLOT_SIZE_COMPACT, SLOT_SIZE_WIDE};

/// Parameters recorded in a newly built index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexOptions {
    pub hash_algorithm: HashAlgorithm,
    pub hash_seed: u64,
    /// 8 (u32 fingerprint/offset) or 16 (u64 fingerprint/offset)
    pub slot_size: u32,
    /// Target fraction of occupied slots, in (0, 1]
    pub load_factor: f64,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::Xxh3,
            hash_seed: 0,
            slot_size: SLOT_SIZE_WIDE,
            load_factor: 0.7,
        }
    }
}

/// Builds index files from logs
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    options: IndexOptions,
}

impl IndexBuilder {
    pub fn new(options: IndexOptions) -> Self {
        Self { options }
    }

    /// Build an index for the log at `log_path`, writing it to `index_path`
    pub fn build(&self, log_path: impl AsRef<Path>, index_path: impl AsRef<Path>) -> Result<HashHeader> {
        let log = LogReader::open(log_path)?;
        self.build_from_reader(&log, index_path)
    }

    /// Build an index for an already open log
    pub fn build_from_reader(&self, log: &LogReader, index_path: impl AsRef<Path>) -> Result<HashHeader> {
        self.validate_options(log)?;

        let live = Self::live_entries(log)?;
        let (slots, max_displacement) = self.place(&live);

        let header = HashHeader {
            version: HASH_VERSION,
            hash_algorithm: self.options.hash_algorithm,
            hash_seed: self.options.hash_seed,
            slot_count: slots.len() as u64,
            slot_size: self.options.slot_size,
            live_entries: live.len() as u64,
            max_displacement,
            log_data_size: log.data_size(),
        };

        let index_path = index_path.as_ref();
        Self::write(index_path, &header, &slots)?;

        info!(
            index = %index_path.display(),
            log = %log.path().display(),
            live = header.live_entries,
            slots = header.slot_count,
            max_displacement,
            "built index"
        );

        Ok(header)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn validate_options(&self, log: &LogReader) -> Result<()> {
        let o = &self.options;
        if o.slot_size != SLOT_SIZE_COMPACT && o.slot_size != SLOT_SIZE_WIDE {
            return Err(HashlogError::usage(format!(
                "slot size must be {} or {}, got {}",
                SLOT_SIZE_COMPACT, SLOT_SIZE_WIDE, o.slot_size
            )));
        }
        if !(o.load_factor > 0.0 && o.load_factor <= 1.0) {
            return Err(HashlogError::usage(format!(
                "load factor must be in (0, 1], got {}",
                o.load_factor
            )));
        }
        if o.slot_size == SLOT_SIZE_COMPACT && log.header().data_end() > u32::MAX as u64 {
            return Err(HashlogError::usage(format!(
                "{}: log offsets exceed u32, use {}-byte slots",
                log.path().display(),
                SLOT_SIZE_WIDE
            )));
        }
        Ok(())
    }

    /// Replay the log: each key maps to the offset of its last PUT, a later
    /// DELETE removes it. Returned in order of first appearance.
    fn live_entries(log: &LogReader) -> Result<Vec<(&[u8], u64)>> {
        let mut latest: HashMap<&[u8], Option<u64>> = HashMap::new();
        let mut order: Vec<&[u8]> = Vec::new();

        let mut iter = log.iter();
        while iter.advance()? == IterState::Active {
            let Some(entry) = iter.entry().copied() else {
                break;
            };
            let key = iter.key()?;
            let offset = match entry.entry_type {
                EntryType::Put => Some(entry.offset),
                EntryType::Delete => None,
            };
            if latest.insert(key, offset).is_none() {
                order.push(key);
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|key| latest.get(key).copied().flatten().map(|off| (key, off)))
            .collect())
    }

    /// Linear-probe every live key into a fresh table.
    /// Returns the slots and the largest displacement used.
    fn place(&self, live: &[(&[u8], u64)]) -> (Vec<Slot>, u64) {
        let wanted = (live.len() as f64 / self.options.load_factor).ceil() as u64;
        let slot_count = wanted.max(live.len() as u64).max(1);

        let mut slots = vec![Slot::EMPTY; slot_count as usize];
        let mut max_displacement = 0u64;

        for &(key, offset) in live {
            let hash = self.options.hash_algorithm.hash(key, self.options.hash_seed);
            let fingerprint = if self.options.slot_size == SLOT_SIZE_COMPACT {
                hash & u32::MAX as u64
            } else {
                hash
            };

            let mut index = hash % slot_count;
            let mut displacement = 0u64;
            while !slots[index as usize].is_empty() {
                index = (index + 1) % slot_count;
                displacement += 1;
            }
            slots[index as usize] = Slot { fingerprint, offset };
            max_displacement = max_displacement.max(displacement);
        }

        debug!(slot_count, max_displacement, "placed keys");
        (slots, max_displacement)
    }

    fn write(path: &Path, header: &HashHeader, slots: &[Slot]) -> Result<()> {
        let file: File = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(&header.encode())?;
        let mut buf = Vec::with_capacity(header.slot_size as usize);
        for slot in slots {
            buf.clear();
            slot.encode(header.slot_size, &mut buf);
            writer.write_all(&buf)?;
        }

        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }
}
