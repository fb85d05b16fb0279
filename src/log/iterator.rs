//! Log Iterator
//!
//! Stateful cursor over one log file.
//!
//! ## States
//! ```text
//!          seek_to / advance
//!   New ─────────────────────▶ Active ──advance past last entry──▶ Closed
//!    │                           │
//!    │ decode failure / miss     │ decode failure / miss
//!    └──────────▶ Invalid ◀──────┘
//! ```
//! `Closed` and `Invalid` are terminal: positioning calls from them fail
//! with `InvalidUsage` and a new iterator must be created. `close()` is
//! allowed from every state.
//!
//! Key and value bytes are handed out as slices of the reader's mapping,
//! so they outlive the iterator itself.

use crate::error::{HashlogError, Result};

use super::entry::{EntryHeader, EntryType};
use super::LogReader;

/// Lifecycle state of a [`LogIterator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterState {
    /// Created, not yet positioned
    New,
    /// Positioned at an entry, readable
    Active,
    /// Exhausted or explicitly closed
    Closed,
    /// Miss or decode failure
    Invalid,
}

/// Cursor over the entries of a [`LogReader`]. Not `Sync`-shared: each
/// thread creates its own.
#[derive(Debug)]
pub struct LogIterator<'a> {
    reader: &'a LogReader,
    state: IterState,
    entry: Option<EntryHeader>,
    /// Key bytes already handed out by `key_chunk`
    key_pos: u64,
    /// Value bytes already handed out by `value_chunk`
    value_pos: u64,
}

impl<'a> LogIterator<'a> {
    /// Create an iterator bound to `reader`, in `New` state. No I/O.
    pub fn new(reader: &'a LogReader) -> Self {
        Self {
            reader,
            state: IterState::New,
            entry: None,
            key_pos: 0,
            value_pos: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> IterState {
        self.state
    }

    /// Reader this iterator is bound to
    pub fn reader(&self) -> &'a LogReader {
        self.reader
    }

    // =========================================================================
    // Positioning
    // =========================================================================

    /// Position at the entry starting at byte offset `position`.
    ///
    /// Seeking exactly to the end of the data region closes the iterator.
    /// A position that does not decode as an entry leaves it `Invalid` and
    /// returns the decode error.
    pub fn seek_to(&mut self, position: u64) -> Result<IterState> {
        self.require_positionable("seek_to")?;
        self.position_at(position)
    }

    /// Move to the entry following the current one (or the first entry when
    /// `New`). Reaching the end of the data region closes the iterator.
    pub fn advance(&mut self) -> Result<IterState> {
        self.require_positionable("advance")?;
        let next = match self.entry {
            Some(entry) => entry.end_offset,
            None => self.reader.header().data_start(),
        };
        self.position_at(next)
    }

    /// Advance `count` entries, stopping early if the iterator leaves `Active`
    pub fn skip(&mut self, count: u64) -> Result<IterState> {
        for _ in 0..count {
            if self.advance()? != IterState::Active {
                break;
            }
        }
        Ok(self.state)
    }

    /// Rewind key and value progress to the start of the current entry
    pub fn reset(&mut self) -> Result<()> {
        self.require_active("reset")?;
        self.key_pos = 0;
        self.value_pos = 0;
        Ok(())
    }

    /// Release the entry and move to `Closed`. Safe from any state, any
    /// number of times.
    pub fn close(&mut self) {
        self.state = IterState::Closed;
        self.entry = None;
        self.key_pos = 0;
        self.value_pos = 0;
    }

    // =========================================================================
    // Current Entry
    // =========================================================================

    /// Framing of the current entry, if `Active`
    pub fn entry(&self) -> Option<&EntryHeader> {
        self.active_entry()
    }

    pub fn entry_type(&self) -> Option<EntryType> {
        self.active_entry().map(|e| e.entry_type)
    }

    pub fn key_len(&self) -> Option<u64> {
        self.active_entry().map(|e| e.key_len)
    }

    pub fn value_len(&self) -> Option<u64> {
        self.active_entry().map(|e| e.value_len)
    }

    /// File offset of the current entry
    pub fn position(&self) -> Option<u64> {
        self.active_entry().map(|e| e.offset)
    }

    /// The whole key of the current entry (does not touch chunk progress)
    pub fn key(&self) -> Result<&'a [u8]> {
        let reader: &'a LogReader = self.reader;
        let entry = self.require_active("key")?;
        Ok(entry.key(reader.bytes()))
    }

    /// Next piece of the current key, at most `max_chunk_size` bytes.
    /// Returns an empty slice once the key is consumed.
    pub fn key_chunk(&mut self, max_chunk_size: usize) -> Result<&'a [u8]> {
        let reader: &'a LogReader = self.reader;
        let entry = *self.require_active("key_chunk")?;
        Self::next_chunk(entry.key(reader.bytes()), &mut self.key_pos, max_chunk_size)
    }

    /// Next piece of the current value, at most `max_chunk_size` bytes.
    ///
    /// Returns an empty slice once the value is consumed, and keeps
    /// returning empty slices on further calls for this entry. A DELETE
    /// has an empty value.
    pub fn value_chunk(&mut self, max_chunk_size: usize) -> Result<&'a [u8]> {
        let reader: &'a LogReader = self.reader;
        let entry = *self.require_active("value_chunk")?;
        Self::next_chunk(entry.value(reader.bytes()), &mut self.value_pos, max_chunk_size)
    }

    /// Remaining value of the current entry as a sequence of chunks of at
    /// most `max_chunk_size` bytes. The sequence ends where `value_chunk`
    /// would return its empty terminator.
    pub fn value_chunks<'it>(&'it mut self, max_chunk_size: usize) -> ValueChunks<'it, 'a> {
        ValueChunks {
            iter: self,
            max_chunk_size,
            done: false,
        }
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn next_chunk<'b>(bytes: &'b [u8], pos: &mut u64, max_chunk_size: usize) -> Result<&'b [u8]> {
        if max_chunk_size == 0 {
            return Err(HashlogError::usage("max_chunk_size must be greater than 0"));
        }
        let start = *pos as usize;
        let len = (bytes.len() - start).min(max_chunk_size);
        *pos += len as u64;
        Ok(&bytes[start..start + len])
    }

    fn position_at(&mut self, position: u64) -> Result<IterState> {
        self.key_pos = 0;
        self.value_pos = 0;

        if position == self.reader.header().data_end() {
            self.entry = None;
            self.state = IterState::Closed;
            return Ok(self.state);
        }

        match self.reader.decode_entry(position) {
            Ok(entry) => {
                self.activate(entry);
                Ok(self.state)
            }
            Err(e) => {
                self.invalidate();
                Err(e)
            }
        }
    }

    /// Make `entry` current. Used by lookups that decoded it already.
    pub(crate) fn activate(&mut self, entry: EntryHeader) {
        self.entry = Some(entry);
        self.state = IterState::Active;
        self.key_pos = 0;
        self.value_pos = 0;
    }

    /// Move to `Invalid` (lookup miss or decode failure)
    pub(crate) fn invalidate(&mut self) {
        self.entry = None;
        self.state = IterState::Invalid;
    }

    /// Whether this iterator was created from `reader`
    pub(crate) fn is_bound_to(&self, reader: &LogReader) -> bool {
        std::ptr::eq(self.reader, reader)
    }

    pub(crate) fn require_positionable(&self, op: &str) -> Result<()> {
        match self.state {
            IterState::New | IterState::Active => Ok(()),
            state => Err(HashlogError::usage(format!(
                "{} called on iterator in {:?} state",
                op, state
            ))),
        }
    }

    fn require_active(&self, op: &str) -> Result<&EntryHeader> {
        match (self.state, self.entry.as_ref()) {
            (IterState::Active, Some(entry)) => Ok(entry),
            (state, _) => Err(HashlogError::usage(format!(
                "{} called on iterator in {:?} state",
                op, state
            ))),
        }
    }

    fn active_entry(&self) -> Option<&EntryHeader> {
        match self.state {
            IterState::Active => self.entry.as_ref(),
            _ => None,
        }
    }
}

/// Lazy, non-restartable sequence of value chunks. See
/// [`LogIterator::value_chunks`].
pub struct ValueChunks<'it, 'a> {
    iter: &'it mut LogIterator<'a>,
    max_chunk_size: usize,
    done: bool,
}

impl<'it, 'a> Iterator for ValueChunks<'it, 'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.iter.value_chunk(self.max_chunk_size) {
            Ok(chunk) if chunk.is_empty() => {
                self.done = true;
                None
            }
            Ok(chunk) => Some(Ok(chunk)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// =============================================================================
// Full Scan
// =============================================================================

/// Sequential scan over every entry in append order
///
/// Yields `(key, Some(value))` for PUT and `(key, None)` for DELETE.
pub struct Entries<'a> {
    iter: LogIterator<'a>,
}

impl<'a> Entries<'a> {
    pub(crate) fn new(reader: &'a LogReader) -> Self {
        Self {
            iter: LogIterator::new(reader),
        }
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<(&'a [u8], Option<&'a [u8]>)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.iter.state() {
            IterState::New | IterState::Active => {}
            IterState::Closed | IterState::Invalid => return None,
        }

        match self.iter.advance() {
            Ok(IterState::Active) => {}
            Ok(_) => return None,
            Err(e) => return Some(Err(e)),
        }

        let file = self.iter.reader().bytes();
        let entry = self.iter.entry.as_ref()?;
        let key = entry.key(file);
        let value = match entry.entry_type {
            EntryType::Put => Some(entry.value(file)),
            EntryType::Delete => None,
        };
        Some(Ok((key, value)))
    }
}
