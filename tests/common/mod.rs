//! Shared fixtures for integration tests
//!
//! Real logs and indexes are produced with `LogWriter` / `IndexBuilder`.
//! Hand-crafted files (forced fingerprint collisions, corrupt headers) are
//! assembled byte by byte from the public header/slot encoders.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use hashlog::hash::{Slot, HASH_HEADER_SIZE};
use hashlog::{
    HashAlgorithm, HashHeader, IndexBuilder, IndexOptions, IterState, LogHeader, LogReader,
    LogWriter, LogWriterOptions,
};
use tempfile::TempDir;

/// One operation to append to a fixture log
#[derive(Debug, Clone)]
pub enum Op<'a> {
    Put(&'a [u8], &'a [u8]),
    Delete(&'a [u8]),
}

// =============================================================================
// Paths
// =============================================================================

pub fn setup_temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

pub fn log_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(format!("{}.hll", name))
}

pub fn index_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(format!("{}.hli", name))
}

// =============================================================================
// Real Files
// =============================================================================

/// Write a log containing `ops` in order
pub fn write_log(path: &Path, ops: &[Op<'_>]) -> LogHeader {
    let mut writer = LogWriter::create(path, LogWriterOptions::default()).unwrap();
    for op in ops {
        match op {
            Op::Put(k, v) => writer.put(k, v).unwrap(),
            Op::Delete(k) => writer.delete(k).unwrap(),
        }
    }
    writer.finish().unwrap()
}

/// Write a log and its index with default options
pub fn write_dataset(dir: &TempDir, name: &str, ops: &[Op<'_>]) -> (PathBuf, PathBuf) {
    write_dataset_with(dir, name, ops, IndexOptions::default())
}

pub fn write_dataset_with(
    dir: &TempDir,
    name: &str,
    ops: &[Op<'_>],
    options: IndexOptions,
) -> (PathBuf, PathBuf) {
    let log = log_path(dir, name);
    let index = index_path(dir, name);
    write_log(&log, ops);
    IndexBuilder::new(options).build(&log, &index).unwrap();
    (log, index)
}

/// The log from the end-to-end scenario
pub fn alpha_beta_ops() -> Vec<Op<'static>> {
    vec![
        Op::Put(b"alpha", b"1"),
        Op::Put(b"beta", b"22"),
        Op::Delete(b"alpha"),
        Op::Put(b"beta", b"33"),
    ]
}

/// File offsets of every entry in the log, in order
pub fn entry_offsets(log: &Path) -> Vec<u64> {
    let reader = LogReader::open(log).unwrap();
    let mut iter = reader.iter();
    let mut offsets = Vec::new();
    while iter.advance().unwrap() == IterState::Active {
        offsets.push(iter.position().unwrap());
    }
    offsets
}

/// Read a value by streaming it in `chunk_size` pieces via `value_chunk`
pub fn read_value_chunked(iter: &mut hashlog::LogIterator<'_>, chunk_size: usize) -> (Vec<u8>, usize) {
    let mut value = Vec::new();
    let mut calls = 0;
    loop {
        let chunk = iter.value_chunk(chunk_size).unwrap();
        calls += 1;
        if chunk.is_empty() {
            break;
        }
        assert!(chunk.len() <= chunk_size);
        value.extend_from_slice(chunk);
    }
    (value, calls)
}

// =============================================================================
// Hand-Crafted Files
// =============================================================================

/// A version-1 index header for a table of `slot_count` 16-byte slots
pub fn raw_hash_header(slot_count: u64, live: u64, max_displacement: u64, log_data_size: u64) -> HashHeader {
    HashHeader {
        version: 1,
        hash_algorithm: HashAlgorithm::Xxh3,
        hash_seed: 0,
        slot_count,
        slot_size: 16,
        live_entries: live,
        max_displacement,
        log_data_size,
    }
}

/// Write an index file from a header and explicit slots
pub fn write_raw_index(path: &Path, header: &HashHeader, slots: &[Slot]) {
    assert_eq!(slots.len() as u64, header.slot_count);
    let mut bytes = header.encode().to_vec();
    for slot in slots {
        slot.encode(header.slot_size, &mut bytes);
    }
    assert_eq!(bytes.len() as u64, HASH_HEADER_SIZE + header.slot_count * 16);
    fs::write(path, bytes).unwrap();
}

/// Write a log file from a header and raw entry bytes
pub fn write_raw_log(path: &Path, header: &LogHeader, data: &[u8]) {
    let mut bytes = header.encode().to_vec();
    bytes.extend_from_slice(data);
    fs::write(path, bytes).unwrap();
}
