//! Log Reader
//!
//! Opens a log file, validates its header and memory-maps the whole file
//! for zero-copy entry access. The mapping is read-only and immutable, so a
//! single reader (usually behind an `Arc`) serves any number of iterators on
//! any number of threads.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::debug;

use crate::error::{HashlogError, Result};

use super::entry::EntryHeader;
use super::iterator::{Entries, LogIterator};
use super::{LogHeader, LOG_HEADER_SIZE};

/// Read handle over one log file
pub struct LogReader {
    path: PathBuf,
    header: LogHeader,
    mmap: Mmap,
}

impl std::fmt::Debug for LogReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogReader")
            .field("path", &self.path)
            .field("header", &self.header)
            .finish()
    }
}

impl LogReader {
    /// Open a log file for reading
    ///
    /// Fails with `Malformed` if the file is shorter than the data region its
    /// header declares.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let mut header_bytes = Vec::with_capacity(LOG_HEADER_SIZE as usize);
        (&file)
            .take(LOG_HEADER_SIZE)
            .read_to_end(&mut header_bytes)?;
        let header = LogHeader::decode(&header_bytes, path)?;

        let file_len = file.metadata()?.len();
        if file_len < header.data_end() {
            return Err(HashlogError::malformed(format!(
                "{}: file is {} bytes but header declares data up to {}",
                path.display(),
                file_len,
                header.data_end()
            )));
        }

        // SAFETY: log files are immutable once written; the map is read-only
        // and every slice taken from it is bounds-checked against data_end.
        let mmap = unsafe { Mmap::map(&file)? };

        debug!(
            path = %path.display(),
            entries = header.max_entry_count,
            data_size = header.data_size,
            "opened log"
        );

        Ok(Self {
            path: path.to_path_buf(),
            header,
            mmap,
        })
    }

    /// Parsed header
    pub fn header(&self) -> &LogHeader {
        &self.header
    }

    /// Path this reader was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes of entry data (excludes header and trailing padding)
    pub fn data_size(&self) -> u64 {
        self.header.data_size
    }

    pub fn max_key_len(&self) -> u64 {
        self.header.max_key_len
    }

    pub fn max_value_len(&self) -> u64 {
        self.header.max_value_len
    }

    /// Create a fresh iterator over this log, in `New` state
    pub fn iter(&self) -> LogIterator<'_> {
        LogIterator::new(self)
    }

    /// Scan every entry in append order
    pub fn entries(&self) -> Entries<'_> {
        Entries::new(self)
    }

    /// Release the mapping. Iterators borrowing the reader must be gone.
    pub fn close(self) {
        debug!(path = %self.path.display(), "closed log");
    }

    /// Whole mapped file
    pub(crate) fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    /// Decode the entry framing at `offset`
    pub(crate) fn decode_entry(&self, offset: u64) -> Result<EntryHeader> {
        EntryHeader::decode(&self.mmap, offset, &self.header)
    }
}
