//! Log entry decoding
//!
//! An entry is decoded from its start offset into an `EntryHeader` that
//! records where its key and value live; the payload itself stays in the map.

use serde::Serialize;

use crate::error::{HashlogError, Result};
use crate::varint;

use super::{LogHeader, TAG_DELETE, TAG_PUT};

/// Kind of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryType {
    /// Key/value pair
    Put,
    /// Key removed as of this point in the log
    Delete,
}

/// Decoded framing of one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub entry_type: EntryType,
    /// File offset of the entry's tag byte
    pub offset: u64,
    pub key_len: u64,
    /// Always 0 for DELETE
    pub value_len: u64,
    /// File offset of the first key byte
    pub key_offset: u64,
    /// File offset of the first value byte
    pub value_offset: u64,
    /// File offset one past the entry (start of the next one)
    pub end_offset: u64,
}

impl EntryHeader {
    /// Decode the entry starting at `offset`.
    ///
    /// `file` is the whole mapped log; every bound is checked against the
    /// header's data region, not the file length.
    pub(crate) fn decode(file: &[u8], offset: u64, header: &LogHeader) -> Result<Self> {
        let data_start = header.data_start();
        let data_end = header.data_end();

        if offset < data_start || offset >= data_end {
            return Err(HashlogError::malformed(format!(
                "entry offset {} outside data region [{}, {})",
                offset, data_start, data_end
            )));
        }

        // data_end <= file.len() is checked when the reader opens
        let region = &file[offset as usize..data_end as usize];
        let tag = region[0];
        let mut pos = 1usize;

        let entry_type = match tag {
            TAG_PUT => EntryType::Put,
            TAG_DELETE => EntryType::Delete,
            other => {
                return Err(HashlogError::malformed(format!(
                    "unknown entry tag {} at offset {}",
                    other, offset
                )))
            }
        };

        if entry_type == EntryType::Delete && !header.supports_deletion {
            return Err(HashlogError::malformed(format!(
                "DELETE entry at offset {} in a log without deletion support",
                offset
            )));
        }

        let (key_len, used) = varint::decode(&region[pos..])?;
        pos += used;

        let value_len = match entry_type {
            EntryType::Put => {
                let (len, used) = varint::decode(&region[pos..])?;
                pos += used;
                len
            }
            EntryType::Delete => 0,
        };

        if key_len > header.max_key_len {
            return Err(HashlogError::malformed(format!(
                "key length {} at offset {} exceeds header max {}",
                key_len, offset, header.max_key_len
            )));
        }
        if value_len > header.max_value_len {
            return Err(HashlogError::malformed(format!(
                "value length {} at offset {} exceeds header max {}",
                value_len, offset, header.max_value_len
            )));
        }

        let key_offset = offset + pos as u64;
        let value_offset = key_offset
            .checked_add(key_len)
            .ok_or_else(|| HashlogError::malformed("entry key length overflows"))?;
        let end_offset = value_offset
            .checked_add(value_len)
            .ok_or_else(|| HashlogError::malformed("entry value length overflows"))?;

        if end_offset > data_end {
            return Err(HashlogError::malformed(format!(
                "entry at offset {} ends at {}, past data end {}",
                offset, end_offset, data_end
            )));
        }

        Ok(Self {
            entry_type,
            offset,
            key_len,
            value_len,
            key_offset,
            value_offset,
            end_offset,
        })
    }

    /// Key bytes of this entry within the mapped file
    pub(crate) fn key<'a>(&self, file: &'a [u8]) -> &'a [u8] {
        &file[self.key_offset as usize..self.value_offset as usize]
    }

    /// Value bytes of this entry within the mapped file
    pub(crate) fn value<'a>(&self, file: &'a [u8]) -> &'a [u8] {
        &file[self.value_offset as usize..self.end_offset as usize]
    }
}
