//! Slot table
//!
//! Read-only view of the slot array that follows the index header,
//! addressed by slot number. Every access is checked against the slot
//! count validated at open.

use bytes::BufMut;

use super::SLOT_SIZE_COMPACT;

/// One decoded slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slot {
    /// Hash bits kept to reject most non-matching probes
    pub fingerprint: u64,
    /// File offset of the entry in the log; 0 = empty
    pub offset: u64,
}

impl Slot {
    pub const EMPTY: Slot = Slot {
        fingerprint: 0,
        offset: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.offset == 0
    }

    /// Append this slot in the given slot width
    pub fn encode(&self, slot_size: u32, buf: &mut impl BufMut) {
        if slot_size == SLOT_SIZE_COMPACT {
            buf.put_u32_le(self.fingerprint as u32);
            buf.put_u32_le(self.offset as u32);
        } else {
            buf.put_u64_le(self.fingerprint);
            buf.put_u64_le(self.offset);
        }
    }
}

/// Borrowed slot array
#[derive(Debug, Clone, Copy)]
pub(crate) struct SlotTable<'a> {
    bytes: &'a [u8],
    slot_count: u64,
    slot_size: u32,
}

impl<'a> SlotTable<'a> {
    /// `bytes` must hold exactly `slot_count * slot_size` bytes
    pub(crate) fn new(bytes: &'a [u8], slot_count: u64, slot_size: u32) -> Self {
        debug_assert_eq!(bytes.len() as u64, slot_count * slot_size as u64);
        Self {
            bytes,
            slot_count,
            slot_size,
        }
    }

    pub(crate) fn len(&self) -> u64 {
        self.slot_count
    }

    /// Slot at `index`, or None if out of range
    pub(crate) fn get(&self, index: u64) -> Option<Slot> {
        if index >= self.slot_count {
            return None;
        }
        let size = self.slot_size as usize;
        let start = index as usize * size;
        let raw = self.bytes.get(start..start + size)?;

        let slot = if self.slot_size == SLOT_SIZE_COMPACT {
            Slot {
                fingerprint: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as u64,
                offset: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]) as u64,
            }
        } else {
            let mut fp = [0u8; 8];
            let mut off = [0u8; 8];
            fp.copy_from_slice(&raw[..8]);
            off.copy_from_slice(&raw[8..16]);
            Slot {
                fingerprint: u64::from_le_bytes(fp),
                offset: u64::from_le_bytes(off),
            }
        };
        Some(slot)
    }

    /// Slot numbers probed for a key whose primary slot is `primary`.
    /// Empty for a table with no slots.
    pub(crate) fn probe_sequence(&self, primary: u64, max_displacement: u64) -> impl Iterator<Item = u64> {
        let count = self.slot_count;
        let probes = if count == 0 {
            0
        } else {
            max_displacement.saturating_add(1)
        };
        (0..probes).map(move |d| (primary + d) % count)
    }
}
