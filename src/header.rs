//! Header validators
//!
//! Shared header parsing for both file kinds. Each loader opens the file,
//! reads only the fixed-size header region, checks it and drops the handle.
//! Used by `LogReader::open` / `HashReader::open` and by diagnostic tools
//! such as `hashlog info`.
//!
//! Checks run in a fixed order so the reported error names the first thing
//! wrong with the file:
//! 1. too short for the magic      → `Malformed`
//! 2. magic mismatch               → `WrongFileType`
//! 3. too short for the header     → `Malformed`
//! 4. checksum mismatch            → `Malformed`
//! 5. version 0 / newer than known → `UnsupportedVersion`

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::error::{HashlogError, Result};
use crate::hash::HashHeader;
use crate::log::LogHeader;

/// Length of the magic that starts both header kinds
pub(crate) const MAGIC_LEN: usize = 8;

/// Static description of one header kind
pub(crate) struct HeaderLayout {
    /// Human name used in errors ("log file", "index file")
    pub kind: &'static str,
    pub magic: &'static [u8; MAGIC_LEN],
    pub size: usize,
    /// Checksum is a u32 stored at this offset, covering bytes before it
    pub crc_offset: usize,
    pub max_version: u32,
}

impl HeaderLayout {
    /// Validate the common prefix of a header region.
    ///
    /// `bytes` may be shorter than the header (truncated file) and is
    /// checked for that. Returns the version on success.
    pub(crate) fn validate(&self, bytes: &[u8], path: &Path) -> Result<u32> {
        if bytes.len() < MAGIC_LEN {
            return Err(HashlogError::malformed(format!(
                "{}: {} bytes is too short for a {} header",
                path.display(),
                bytes.len(),
                self.kind
            )));
        }

        if &bytes[..MAGIC_LEN] != self.magic {
            return Err(HashlogError::WrongFileType {
                expected: self.kind,
                path: path.display().to_string(),
            });
        }

        if bytes.len() < self.size {
            return Err(HashlogError::malformed(format!(
                "{}: truncated {} header: expected {} bytes, got {}",
                path.display(),
                self.kind,
                self.size,
                bytes.len()
            )));
        }

        let stored_crc = u32::from_le_bytes([
            bytes[self.crc_offset],
            bytes[self.crc_offset + 1],
            bytes[self.crc_offset + 2],
            bytes[self.crc_offset + 3],
        ]);
        let computed_crc = crc32fast::hash(&bytes[..self.crc_offset]);
        if stored_crc != computed_crc {
            return Err(HashlogError::malformed(format!(
                "{}: {} header checksum mismatch (stored {:#010x}, computed {:#010x})",
                path.display(),
                self.kind,
                stored_crc,
                computed_crc
            )));
        }

        let version = u32::from_le_bytes([
            bytes[MAGIC_LEN],
            bytes[MAGIC_LEN + 1],
            bytes[MAGIC_LEN + 2],
            bytes[MAGIC_LEN + 3],
        ]);
        if version == 0 || version > self.max_version {
            return Err(HashlogError::UnsupportedVersion {
                found: version,
                supported: self.max_version,
            });
        }

        Ok(version)
    }
}

/// Read at most `size` bytes from the start of the file
pub(crate) fn read_header_region(path: &Path, size: usize) -> Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut bytes = Vec::with_capacity(size);
    file.take(size as u64).read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Load and validate the header of a log file
pub fn load_log_header(path: impl AsRef<Path>) -> Result<LogHeader> {
    let path = path.as_ref();
    let bytes = read_header_region(path, crate::log::LOG_HEADER_SIZE as usize)?;
    LogHeader::decode(&bytes, path)
}

/// Load and validate the header of an index file
pub fn load_hash_header(path: impl AsRef<Path>) -> Result<HashHeader> {
    let path = path.as_ref();
    let bytes = read_header_region(path, crate::hash::HASH_HEADER_SIZE as usize)?;
    HashHeader::decode(&bytes, path)
}

// =============================================================================
// Dual Detection
// =============================================================================

/// Header of a file whose kind was detected by trying both parsers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileHeader {
    Log(LogHeader),
    Index(HashHeader),
}

impl fmt::Display for FileHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileHeader::Log(h) => fmt::Display::fmt(h, f),
            FileHeader::Index(h) => fmt::Display::fmt(h, f),
        }
    }
}

/// A file that is neither a log nor an index, with both parse failures
#[derive(Debug, Error)]
#[error("neither a log file ({log_error}) nor an index file ({index_error})")]
pub struct DetectError {
    pub log_error: HashlogError,
    pub index_error: HashlogError,
}

/// Parse a file as a log, falling back to an index
pub fn detect_header(path: impl AsRef<Path>) -> std::result::Result<FileHeader, DetectError> {
    let path = path.as_ref();
    let log_error = match load_log_header(path) {
        Ok(header) => return Ok(FileHeader::Log(header)),
        Err(e) => e,
    };
    match load_hash_header(path) {
        Ok(header) => Ok(FileHeader::Index(header)),
        Err(index_error) => Err(DetectError {
            log_error,
            index_error,
        }),
    }
}
