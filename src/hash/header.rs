//! Hash Header
//!
//! Fixed-size metadata at offset 0 of every index file.

use std::fmt;
use std::path::Path;

use bytes::{Buf, BufMut};
use serde::Serialize;

use crate::error::{HashlogError, Result};
use crate::header::{HeaderLayout, MAGIC_LEN};

use super::{
    HashAlgorithm, HASH_HEADER_CRC_OFFSET, HASH_HEADER_SIZE, HASH_MAGIC, HASH_VERSION,
    SLOT_SIZE_COMPACT, SLOT_SIZE_WIDE,
};

pub(crate) const HASH_LAYOUT: HeaderLayout = HeaderLayout {
    kind: "index file",
    magic: HASH_MAGIC,
    size: HASH_HEADER_SIZE as usize,
    crc_offset: HASH_HEADER_CRC_OFFSET,
    max_version: HASH_VERSION,
};

/// Parsed index file header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashHeader {
    pub version: u32,
    pub hash_algorithm: HashAlgorithm,
    pub hash_seed: u64,
    pub slot_count: u64,
    /// Bytes per slot: 8 or 16
    pub slot_size: u32,
    /// Number of occupied slots
    pub live_entries: u64,
    /// Furthest any key sits from its primary slot
    pub max_displacement: u64,
    /// `data_size` of the log this index was built from
    pub log_data_size: u64,
}

impl HashHeader {
    /// Decode and validate a header region read from `path`
    pub(crate) fn decode(bytes: &[u8], path: &Path) -> Result<Self> {
        let version = HASH_LAYOUT.validate(bytes, path)?;

        // Skip magic + version, already checked
        let mut buf = &bytes[MAGIC_LEN + 4..HASH_HEADER_CRC_OFFSET];
        let algorithm_id = buf.get_u32_le();
        let hash_seed = buf.get_u64_le();
        let slot_count = buf.get_u64_le();
        let slot_size = buf.get_u32_le();
        let _reserved = buf.get_u32_le();
        let live_entries = buf.get_u64_le();
        let max_displacement = buf.get_u64_le();
        let log_data_size = buf.get_u64_le();

        let malformed = |msg: String| HashlogError::malformed(format!("{}: {}", path.display(), msg));

        let hash_algorithm = HashAlgorithm::from_id(algorithm_id)
            .ok_or_else(|| malformed(format!("unknown hash algorithm id {}", algorithm_id)))?;

        if slot_size != SLOT_SIZE_COMPACT && slot_size != SLOT_SIZE_WIDE {
            return Err(malformed(format!("unsupported slot size {}", slot_size)));
        }

        if live_entries > slot_count {
            return Err(malformed(format!(
                "{} live entries do not fit in {} slots",
                live_entries, slot_count
            )));
        }

        if slot_count > 0 && max_displacement >= slot_count {
            return Err(malformed(format!(
                "max displacement {} not below slot count {}",
                max_displacement, slot_count
            )));
        }

        let header = Self {
            version,
            hash_algorithm,
            hash_seed,
            slot_count,
            slot_size,
            live_entries,
            max_displacement,
            log_data_size,
        };

        if header.file_size().is_none() {
            return Err(malformed(format!(
                "slot table of {} x {} bytes overflows",
                slot_count, slot_size
            )));
        }

        Ok(header)
    }

    /// Encode to the on-disk layout, checksum included
    pub fn encode(&self) -> [u8; HASH_HEADER_SIZE as usize] {
        let mut out = [0u8; HASH_HEADER_SIZE as usize];
        {
            let mut buf = &mut out[..];
            buf.put_slice(HASH_MAGIC);
            buf.put_u32_le(self.version);
            buf.put_u32_le(self.hash_algorithm.id());
            buf.put_u64_le(self.hash_seed);
            buf.put_u64_le(self.slot_count);
            buf.put_u32_le(self.slot_size);
            buf.put_u32_le(0);
            buf.put_u64_le(self.live_entries);
            buf.put_u64_le(self.max_displacement);
            buf.put_u64_le(self.log_data_size);
        }
        let crc = crc32fast::hash(&out[..HASH_HEADER_CRC_OFFSET]);
        out[HASH_HEADER_CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());
        out
    }

    /// Byte length of the slot table
    pub fn table_size(&self) -> Option<u64> {
        self.slot_count.checked_mul(self.slot_size as u64)
    }

    /// Exact length an index file with this header must have
    pub fn file_size(&self) -> Option<u64> {
        self.table_size()?.checked_add(HASH_HEADER_SIZE)
    }

    /// Hash a key with this index's algorithm and seed
    #[inline]
    pub fn hash_key(&self, key: &[u8]) -> u64 {
        self.hash_algorithm.hash(key, self.hash_seed)
    }

    /// Part of a hash stored in a slot
    #[inline]
    pub fn fingerprint(&self, hash: u64) -> u64 {
        if self.slot_size == SLOT_SIZE_COMPACT {
            hash & u32::MAX as u64
        } else {
            hash
        }
    }

    /// Fraction of slots occupied
    pub fn load_factor(&self) -> f64 {
        if self.slot_count == 0 {
            0.0
        } else {
            self.live_entries as f64 / self.slot_count as f64
        }
    }
}

impl fmt::Display for HashHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Index file version {}", self.version)?;
        writeln!(f, "Hash algorithm: {}", self.hash_algorithm)?;
        writeln!(f, "Hash seed: {:#018x}", self.hash_seed)?;
        writeln!(f, "Slot count: {}", self.slot_count)?;
        writeln!(f, "Slot size: {}", self.slot_size)?;
        writeln!(f, "Live entries: {}", self.live_entries)?;
        writeln!(f, "Load factor: {:.3}", self.load_factor())?;
        writeln!(f, "Max displacement: {}", self.max_displacement)?;
        writeln!(f, "Log data size: {}", self.log_data_size)
    }
}
