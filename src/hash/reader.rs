//! Hash Reader
//!
//! Composes an index file with the log it was built from: hashes a key,
//! probes the slot table and positions a `LogIterator` at the matching
//! entry. Lookups never mutate the index or the log.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use tracing::{debug, trace, warn};

use crate::error::{HashlogError, Result};
use crate::log::{EntryType, IterState, LogIterator, LogReader};

use super::slot::SlotTable;
use super::{HashHeader, HASH_HEADER_SIZE};

/// Chunk size used when `get_value` copies a value out
const COPY_CHUNK_SIZE: usize = 1 << 20;

/// Reader over one index file and its paired log
pub struct HashReader {
    path: PathBuf,
    header: HashHeader,
    /// Whole index file; slots start at HASH_HEADER_SIZE
    mmap: Mmap,
    /// Shared so several indexes over one log can reuse a single mapping
    log: Arc<LogReader>,
}

impl std::fmt::Debug for HashReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashReader")
            .field("path", &self.path)
            .field("header", &self.header)
            .field("log", &self.log.path())
            .finish()
    }
}

impl HashReader {
    /// Open an index and its log; the reader owns the log reader
    pub fn open(index_path: impl AsRef<Path>, log_path: impl AsRef<Path>) -> Result<Self> {
        let log = LogReader::open(log_path)?;
        Self::with_log_reader(index_path, Arc::new(log))
    }

    /// Open an index against an already open, possibly shared, log reader
    ///
    /// Fails with `IndexLogMismatch` if the index was built from a log with a
    /// different data size.
    pub fn with_log_reader(index_path: impl AsRef<Path>, log: Arc<LogReader>) -> Result<Self> {
        let path = index_path.as_ref();
        let file = File::open(path)?;

        let mut header_bytes = Vec::with_capacity(HASH_HEADER_SIZE as usize);
        (&file)
            .take(HASH_HEADER_SIZE)
            .read_to_end(&mut header_bytes)?;
        let header = HashHeader::decode(&header_bytes, path)?;

        // decode() guarantees file_size() does not overflow
        let expected_len = header.file_size().unwrap_or(u64::MAX);
        let file_len = file.metadata()?.len();
        if file_len != expected_len {
            return Err(HashlogError::malformed(format!(
                "{}: index is {} bytes, header describes {} slots of {} bytes ({} total)",
                path.display(),
                file_len,
                header.slot_count,
                header.slot_size,
                expected_len
            )));
        }

        if header.log_data_size != log.data_size() {
            return Err(HashlogError::IndexLogMismatch(format!(
                "{} was built for a log with {} data bytes, {} has {}",
                path.display(),
                header.log_data_size,
                log.path().display(),
                log.data_size()
            )));
        }

        // SAFETY: index files are immutable once built; the map is read-only
        // and slot access goes through SlotTable bounds checks.
        let mmap = unsafe { Mmap::map(&file)? };

        debug!(
            path = %path.display(),
            log = %log.path().display(),
            slots = header.slot_count,
            live = header.live_entries,
            max_displacement = header.max_displacement,
            "opened index"
        );

        Ok(Self {
            path: path.to_path_buf(),
            header,
            mmap,
            log,
        })
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Look up `key`, positioning `iter` at its entry.
    ///
    /// `iter` must come from this reader's log and be `New` or `Active`.
    /// Afterwards it is `Active` at the PUT holding the key's current value,
    /// or `Invalid` if the key is absent or deleted. A miss is not an error.
    pub fn get(&self, key: &[u8], iter: &mut LogIterator<'_>) -> Result<()> {
        if !iter.is_bound_to(&self.log) {
            return Err(HashlogError::usage(
                "iterator was created from a different log reader",
            ));
        }
        iter.require_positionable("get")?;

        let table = self.slots();
        if table.len() == 0 {
            iter.invalidate();
            return Ok(());
        }

        let hash = self.header.hash_key(key);
        let fingerprint = self.header.fingerprint(hash);
        let primary = hash % table.len();

        for (displacement, index) in table
            .probe_sequence(primary, self.header.max_displacement)
            .enumerate()
        {
            let slot = table.get(index).ok_or_else(|| {
                HashlogError::malformed(format!("slot {} out of range", index))
            })?;

            if slot.is_empty() || slot.fingerprint != fingerprint {
                continue;
            }
            trace!(slot = index, displacement, offset = slot.offset, "fingerprint match");

            let entry = match self.log.decode_entry(slot.offset) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(
                        index = %self.path.display(),
                        slot = index,
                        offset = slot.offset,
                        error = %e,
                        "slot points at an undecodable log entry"
                    );
                    iter.invalidate();
                    return Err(e);
                }
            };

            // Fingerprints collide; only the stored key bytes are authoritative
            if entry.key(self.log.bytes()) != key {
                continue;
            }

            match entry.entry_type {
                EntryType::Put => iter.activate(entry),
                EntryType::Delete => iter.invalidate(),
            }
            return Ok(());
        }

        iter.invalidate();
        Ok(())
    }

    /// Look up `key` with a fresh iterator; `None` on a miss
    pub fn lookup(&self, key: &[u8]) -> Result<Option<LogIterator<'_>>> {
        let mut iter = self.log.iter();
        self.get(key, &mut iter)?;
        if iter.state() == IterState::Active {
            Ok(Some(iter))
        } else {
            Ok(None)
        }
    }

    /// Copy the current value of `key` into memory; `None` on a miss
    pub fn get_value(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let Some(mut iter) = self.lookup(key)? else {
            return Ok(None);
        };
        let mut value = Vec::with_capacity(iter.value_len().unwrap_or(0) as usize);
        for chunk in iter.value_chunks(COPY_CHUNK_SIZE) {
            value.extend_from_slice(chunk?);
        }
        Ok(Some(value))
    }

    /// Advance `iter` to the next log entry that the index still points to.
    ///
    /// Skips overwritten PUTs and DELETEs, so a scan with this visits each
    /// live key exactly once, in log order.
    pub fn next_live(&self, iter: &mut LogIterator<'_>) -> Result<IterState> {
        if !iter.is_bound_to(&self.log) {
            return Err(HashlogError::usage(
                "iterator was created from a different log reader",
            ));
        }
        loop {
            if iter.advance()? != IterState::Active {
                return Ok(iter.state());
            }
            let Some(entry) = iter.entry().copied() else {
                return Ok(iter.state());
            };
            if entry.entry_type == EntryType::Put
                && self.slot_points_to(entry.key(self.log.bytes()), entry.offset)
            {
                return Ok(IterState::Active);
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn header(&self) -> &HashHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The log this index reads from
    pub fn log_reader(&self) -> &LogReader {
        &self.log
    }

    /// Another handle on the shared log reader
    pub fn shared_log_reader(&self) -> Arc<LogReader> {
        Arc::clone(&self.log)
    }

    pub fn live_entries(&self) -> u64 {
        self.header.live_entries
    }

    pub fn slot_count(&self) -> u64 {
        self.header.slot_count
    }

    /// Release the index mapping and this reader's share of the log
    pub fn close(self) {
        debug!(path = %self.path.display(), "closed index");
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn slots(&self) -> SlotTable<'_> {
        SlotTable::new(
            &self.mmap[HASH_HEADER_SIZE as usize..],
            self.header.slot_count,
            self.header.slot_size,
        )
    }

    /// Whether some slot on `key`'s probe path holds `offset`
    fn slot_points_to(&self, key: &[u8], offset: u64) -> bool {
        let table = self.slots();
        if table.len() == 0 {
            return false;
        }
        let hash = self.header.hash_key(key);
        let fingerprint = self.header.fingerprint(hash);
        table
            .probe_sequence(hash % table.len(), self.header.max_displacement)
            .filter_map(|index| table.get(index))
            .any(|slot| slot.fingerprint == fingerprint && slot.offset == offset)
    }
}
