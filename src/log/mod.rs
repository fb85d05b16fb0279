//! Log Module
//!
//! Append-only log of PUT/DELETE entries - the source of truth for key history.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (60 bytes)                                       │
//! │   Magic: "HLOGDATA" (8) | Version: u32 (4)              │
//! │   CreatedAt: u64 (8) | MaxKeyLen: u64 (8)               │
//! │   MaxValueLen: u64 (8) | MaxEntryCount: u64 (8)         │
//! │   DataSize: u64 (8) | Flags: u8 (1) | Reserved (3)      │
//! │   HeaderCRC: u32 (4)                                    │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data (DataSize bytes)                                   │
//! │   [Tag: u8][KeyLen: varint][ValLen: varint][Key][Value] │
//! │   ... repeated for each entry, in append order ...      │
//! │   (Tag 0 = DELETE: no ValLen, no Value)                 │
//! ├─────────────────────────────────────────────────────────┤
//! │ Trailing padding (optional, ignored)                    │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod entry;
mod header;
mod iterator;
mod reader;
mod writer;

pub use entry::{EntryHeader, EntryType};
pub use header::LogHeader;
pub use iterator::{Entries, IterState, LogIterator, ValueChunks};
pub use reader::LogReader;
pub use writer::{LogWriter, LogWriterOptions};

// =============================================================================
// Shared Constants (used by header, reader, iterator, writer)
// =============================================================================

/// Magic bytes identifying a hashlog log file
pub(crate) const LOG_MAGIC: &[u8; 8] = b"HLOGDATA";

/// Current log format version
pub(crate) const LOG_VERSION: u32 = 1;

/// Header size: see the layout above
pub const LOG_HEADER_SIZE: u64 = 60;

/// Bytes covered by the header checksum (everything before it)
pub(crate) const LOG_HEADER_CRC_OFFSET: usize = 56;

/// Header flag: the log may contain DELETE entries
pub(crate) const FLAG_SUPPORTS_DELETION: u8 = 0b0000_0001;

/// Entry tag for a DELETE
pub(crate) const TAG_DELETE: u8 = 0;

/// Entry tag for a PUT
pub(crate) const TAG_PUT: u8 = 1;
