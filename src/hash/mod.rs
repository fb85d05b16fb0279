//! Hash Index Module
//!
//! Static open-addressing hash table mapping keys to entry offsets in a log.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (68 bytes)                                       │
//! │   Magic: "HLOGHIDX" (8) | Version: u32 (4)              │
//! │   HashAlgorithm: u32 (4) | HashSeed: u64 (8)            │
//! │   SlotCount: u64 (8) | SlotSize: u32 (4) | Reserved (4) │
//! │   LiveEntries: u64 (8) | MaxDisplacement: u64 (8)       │
//! │   LogDataSize: u64 (8) | HeaderCRC: u32 (4)             │
//! ├─────────────────────────────────────────────────────────┤
//! │ Slots (SlotCount × SlotSize bytes)                      │
//! │   [Fingerprint][LogOffset]   (u64/u64 or u32/u32)       │
//! │   LogOffset = 0 means empty                             │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lookup
//! A key hashes to `primary = hash % slot_count`. The builder places each
//! key at the first free slot probing forward from `primary` (wrapping) and
//! records the largest distance it had to go, so a lookup never inspects
//! more than `max_displacement + 1` slots.

mod builder;
mod hasher;
mod header;
mod reader;
mod slot;

pub use builder::{IndexBuilder, IndexOptions};
pub use hasher::HashAlgorithm;
pub use header::HashHeader;
pub use reader::HashReader;
pub use slot::Slot;

// =============================================================================
// Shared Constants (used by header, slot, reader, builder)
// =============================================================================

/// Magic bytes identifying a hashlog index file
pub(crate) const HASH_MAGIC: &[u8; 8] = b"HLOGHIDX";

/// Current index format version
pub(crate) const HASH_VERSION: u32 = 1;

/// Header size: see the layout above
pub const HASH_HEADER_SIZE: u64 = 68;

/// Bytes covered by the header checksum (everything before it)
pub(crate) const HASH_HEADER_CRC_OFFSET: usize = 64;

/// Slot with u32 fingerprint and u32 offset
pub const SLOT_SIZE_COMPACT: u32 = 8;

/// Slot with u64 fingerprint and u64 offset
pub const SLOT_SIZE_WIDE: u32 = 16;
