//! Log Header
//!
//! Fixed-size metadata at offset 0 of every log file.

use std::fmt;
use std::path::Path;

use bytes::{Buf, BufMut};
use serde::Serialize;

use crate::error::{HashlogError, Result};
use crate::header::{HeaderLayout, MAGIC_LEN};

use super::{
    FLAG_SUPPORTS_DELETION, LOG_HEADER_CRC_OFFSET, LOG_HEADER_SIZE, LOG_MAGIC, LOG_VERSION,
};

pub(crate) const LOG_LAYOUT: HeaderLayout = HeaderLayout {
    kind: "log file",
    magic: LOG_MAGIC,
    size: LOG_HEADER_SIZE as usize,
    crc_offset: LOG_HEADER_CRC_OFFSET,
    max_version: LOG_VERSION,
};

/// Parsed log file header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogHeader {
    /// Format version
    pub version: u32,
    /// Creation time (unix millis)
    pub created_at: u64,
    /// Longest key in the data region
    pub max_key_len: u64,
    /// Longest value in the data region
    pub max_value_len: u64,
    /// Number of entries (PUTs + DELETEs) in the data region
    pub max_entry_count: u64,
    /// Bytes of entry data following the header
    pub data_size: u64,
    /// Whether DELETE entries may appear
    pub supports_deletion: bool,
}

impl LogHeader {
    /// Decode and validate a header region read from `path`
    pub(crate) fn decode(bytes: &[u8], path: &Path) -> Result<Self> {
        let version = LOG_LAYOUT.validate(bytes, path)?;

        // Skip magic + version, already checked
        let mut buf = &bytes[MAGIC_LEN + 4..LOG_HEADER_CRC_OFFSET];
        let created_at = buf.get_u64_le();
        let max_key_len = buf.get_u64_le();
        let max_value_len = buf.get_u64_le();
        let max_entry_count = buf.get_u64_le();
        let data_size = buf.get_u64_le();
        let flags = buf.get_u8();

        if flags & !FLAG_SUPPORTS_DELETION != 0 {
            return Err(HashlogError::malformed(format!(
                "{}: unknown log header flags {:#04x}",
                path.display(),
                flags
            )));
        }

        if data_size.checked_add(LOG_HEADER_SIZE).is_none() {
            return Err(HashlogError::malformed(format!(
                "{}: data size {} overflows",
                path.display(),
                data_size
            )));
        }

        Ok(Self {
            version,
            created_at,
            max_key_len,
            max_value_len,
            max_entry_count,
            data_size,
            supports_deletion: flags & FLAG_SUPPORTS_DELETION != 0,
        })
    }

    /// Encode to the on-disk layout, checksum included
    pub fn encode(&self) -> [u8; LOG_HEADER_SIZE as usize] {
        let mut out = [0u8; LOG_HEADER_SIZE as usize];
        {
            let mut buf = &mut out[..];
            buf.put_slice(LOG_MAGIC);
            buf.put_u32_le(self.version);
            buf.put_u64_le(self.created_at);
            buf.put_u64_le(self.max_key_len);
            buf.put_u64_le(self.max_value_len);
            buf.put_u64_le(self.max_entry_count);
            buf.put_u64_le(self.data_size);
            buf.put_u8(if self.supports_deletion {
                FLAG_SUPPORTS_DELETION
            } else {
                0
            });
        }
        let crc = crc32fast::hash(&out[..LOG_HEADER_CRC_OFFSET]);
        out[LOG_HEADER_CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());
        out
    }

    /// File offset of the first entry
    pub fn data_start(&self) -> u64 {
        LOG_HEADER_SIZE
    }

    /// File offset one past the last entry
    pub fn data_end(&self) -> u64 {
        LOG_HEADER_SIZE + self.data_size
    }
}

impl Default for LogHeader {
    fn default() -> Self {
        Self {
            version: LOG_VERSION,
            created_at: 0,
            max_key_len: 0,
            max_value_len: 0,
            max_entry_count: 0,
            data_size: 0,
            supports_deletion: true,
        }
    }
}

impl fmt::Display for LogHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Log file version {}", self.version)?;
        writeln!(f, "Created at: {} (unix millis)", self.created_at)?;
        writeln!(f, "Max key length: {}", self.max_key_len)?;
        writeln!(f, "Max value length: {}", self.max_value_len)?;
        writeln!(f, "Entry count: {}", self.max_entry_count)?;
        writeln!(f, "Data size: {}", self.data_size)?;
        writeln!(f, "Supports deletion: {}", self.supports_deletion)
    }
}
