//! Unsigned LEB128 variable-length integers
//!
//! Used for key and value lengths in log entries: 7 bits per byte, low
//! group first, high bit set on every byte except the last.

use bytes::BufMut;

use crate::error::{HashlogError, Result};

/// Longest encoding of a u64 (ceil(64 / 7))
pub const MAX_VARINT_LEN: usize = 10;

/// Append `value` to `buf`
pub fn encode(value: u64, buf: &mut impl BufMut) {
    let mut v = value;
    while v >= 0x80 {
        buf.put_u8((v as u8) | 0x80);
        v >>= 7;
    }
    buf.put_u8(v as u8);
}

/// Number of bytes `encode` writes for `value`
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}

/// Decode a varint from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in bytes.iter().take(MAX_VARINT_LEN).enumerate() {
        let group = (byte & 0x7f) as u64;
        // The tenth byte may only carry the single top bit of a u64
        if i == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(HashlogError::malformed("varint overflows u64"));
        }
        value |= group << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if bytes.len() >= MAX_VARINT_LEN {
        Err(HashlogError::malformed("varint longer than 10 bytes"))
    } else {
        Err(HashlogError::malformed("truncated varint"))
    }
}
