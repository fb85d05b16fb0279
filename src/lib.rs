//! # hashlog
//!
//! A read-optimized, immutable key-value store built from two files:
//! - an append-only **log** of PUT/DELETE entries
//! - a static **hash index** mapping keys to entry offsets in the log
//!
//! Datasets are written once (batch) and then served with point lookups
//! and full scans over read-only memory maps. Values of any size are
//! streamed out in bounded chunks.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                HashReader::get(key, &mut iter)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ hash → primary slot → probe ≤ max displacement
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │              Slot table (mmap'd index file)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ fingerprint match → log offset
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │   LogReader (mmap'd log file) ◀── LogIterator (cursor)       │
//! │                                  key compare, value_chunk    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use hashlog::{HashReader, IterState};
//!
//! # fn main() -> hashlog::Result<()> {
//! let reader = HashReader::open("users.hli", "users.hll")?;
//! let mut iter = reader.log_reader().iter();
//! reader.get(b"alice", &mut iter)?;
//! if iter.state() == IterState::Active {
//!     loop {
//!         let chunk = iter.value_chunk(64 * 1024)?;
//!         if chunk.is_empty() {
//!             break;
//!         }
//!         // consume chunk
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod header;

pub mod hash;
pub mod log;
pub mod varint;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use error::{ErrorKind, HashlogError, Result};
pub use hash::{HashAlgorithm, HashHeader, HashReader, IndexBuilder, IndexOptions};
pub use header::{detect_header, load_hash_header, load_log_header, DetectError, FileHeader};
pub use log::{
    EntryType, IterState, LogHeader, LogIterator, LogReader, LogWriter, LogWriterOptions,
};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of hashlog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
