//! Tests for HashReader lookups
//!
//! These tests verify:
//! - The alpha/beta end-to-end scenario (PUT, DELETE, overwrite)
//! - Last-write-wins over a larger generated dataset
//! - Fingerprint collisions resolved by full key comparison
//! - Index/log cross-validation and corrupt slot handling
//! - Shared log readers and concurrent lookups

mod common;

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use common::*;
use hashlog::hash::{Slot, SLOT_SIZE_COMPACT};
use hashlog::{
    ErrorKind, HashAlgorithm, HashReader, HashlogError, IndexOptions, IterState, LogReader,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn lookup_value(reader: &HashReader, key: &[u8]) -> Option<Vec<u8>> {
    reader.get_value(key).unwrap()
}

/// Generated dataset with overwrites and deletes, plus the expected final state
fn generated_ops() -> (Vec<(Vec<u8>, Option<Vec<u8>>)>, HashMap<Vec<u8>, Vec<u8>>) {
    let mut ops = Vec::new();
    let mut expected = HashMap::new();
    for i in 0..500u32 {
        let key = format!("key{:04}", i).into_bytes();
        let value = format!("value{}", i).into_bytes();
        ops.push((key.clone(), Some(value.clone())));
        expected.insert(key, value);
    }
    for i in (0..500u32).step_by(3) {
        let key = format!("key{:04}", i).into_bytes();
        let value = format!("rewritten{}", i * 7).into_bytes();
        ops.push((key.clone(), Some(value.clone())));
        expected.insert(key, value);
    }
    for i in (0..500u32).step_by(5) {
        let key = format!("key{:04}", i).into_bytes();
        ops.push((key.clone(), None));
        expected.remove(&key);
    }
    (ops, expected)
}

fn as_ops(raw: &[(Vec<u8>, Option<Vec<u8>>)]) -> Vec<Op<'_>> {
    raw.iter()
        .map(|(k, v)| match v {
            Some(v) => Op::Put(k, v),
            None => Op::Delete(k),
        })
        .collect()
}

// =============================================================================
// End-to-End Scenario
// =============================================================================

#[test]
fn test_alpha_beta_scenario() {
    let dir = setup_temp_dir();
    let (log, index) = write_dataset(&dir, "ab", &alpha_beta_ops());
    let reader = HashReader::open(&index, &log).unwrap();

    let mut iter = reader.log_reader().iter();
    reader.get(b"alpha", &mut iter).unwrap();
    assert_eq!(iter.state(), IterState::Invalid);

    let mut iter = reader.log_reader().iter();
    reader.get(b"beta", &mut iter).unwrap();
    assert_eq!(iter.state(), IterState::Active);
    let (value, _) = read_value_chunked(&mut iter, 65536);
    assert_eq!(value, b"33");

    let mut iter = reader.log_reader().iter();
    reader.get(b"gamma", &mut iter).unwrap();
    assert_eq!(iter.state(), IterState::Invalid);

    assert_eq!(reader.live_entries(), 1);
}

#[test]
fn test_lookup_and_get_value() {
    let dir = setup_temp_dir();
    let (log, index) = write_dataset(&dir, "ab", &alpha_beta_ops());
    let reader = HashReader::open(&index, &log).unwrap();

    assert!(reader.lookup(b"alpha").unwrap().is_none());
    let iter = reader.lookup(b"beta").unwrap().unwrap();
    assert_eq!(iter.key().unwrap(), b"beta");
    assert_eq!(lookup_value(&reader, b"beta"), Some(b"33".to_vec()));
    assert_eq!(lookup_value(&reader, b"gamma"), None);
}

#[test]
fn test_get_repositions_active_iterator() {
    let dir = setup_temp_dir();
    let (log, index) = write_dataset(
        &dir,
        "two",
        &[Op::Put(b"a", b"first"), Op::Put(b"b", b"second")],
    );
    let reader = HashReader::open(&index, &log).unwrap();
    let mut iter = reader.log_reader().iter();

    reader.get(b"a", &mut iter).unwrap();
    assert_eq!(iter.value_chunk(3).unwrap(), b"fir");

    reader.get(b"b", &mut iter).unwrap();
    assert_eq!(iter.state(), IterState::Active);
    assert_eq!(iter.value_chunk(64).unwrap(), b"second");
}

#[test]
fn test_get_on_terminal_iterator_is_usage_error() {
    let dir = setup_temp_dir();
    let (log, index) = write_dataset(&dir, "ab", &alpha_beta_ops());
    let reader = HashReader::open(&index, &log).unwrap();

    let mut iter = reader.log_reader().iter();
    reader.get(b"gamma", &mut iter).unwrap();
    assert_eq!(iter.state(), IterState::Invalid);

    let err = reader.get(b"beta", &mut iter).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUsage);
}

#[test]
fn test_get_rejects_iterator_from_other_log() {
    let dir = setup_temp_dir();
    let (log, index) = write_dataset(&dir, "ab", &alpha_beta_ops());
    let reader = HashReader::open(&index, &log).unwrap();

    let other = LogReader::open(&log).unwrap();
    let mut iter = other.iter();
    assert!(matches!(
        reader.get(b"beta", &mut iter),
        Err(HashlogError::InvalidUsage(_))
    ));
}

// =============================================================================
// Dataset Property Tests
// =============================================================================

#[test]
fn test_last_write_wins_over_generated_dataset() {
    let dir = setup_temp_dir();
    let (raw, expected) = generated_ops();
    let (log, index) = write_dataset(&dir, "gen", &as_ops(&raw));
    let reader = HashReader::open(&index, &log).unwrap();

    assert_eq!(reader.live_entries(), expected.len() as u64);

    for i in 0..500u32 {
        let key = format!("key{:04}", i).into_bytes();
        assert_eq!(
            lookup_value(&reader, &key),
            expected.get(&key).cloned(),
            "key {}",
            i
        );
    }
    assert_eq!(lookup_value(&reader, b"key9999"), None);
}

#[test]
fn test_compact_slots_with_xxh32() {
    let dir = setup_temp_dir();
    let (raw, expected) = generated_ops();
    let options = IndexOptions {
        hash_algorithm: HashAlgorithm::Xxh32,
        hash_seed: 12345,
        slot_size: SLOT_SIZE_COMPACT,
        load_factor: 0.9,
    };
    let (log, index) = write_dataset_with(&dir, "compact", &as_ops(&raw), options);
    let reader = HashReader::open(&index, &log).unwrap();

    assert_eq!(reader.header().slot_size, 8);
    for (key, value) in &expected {
        assert_eq!(lookup_value(&reader, key).as_ref(), Some(value));
    }
}

#[test]
fn test_full_table_lookups() {
    let dir = setup_temp_dir();
    let (raw, expected) = generated_ops();
    let options = IndexOptions {
        load_factor: 1.0,
        ..IndexOptions::default()
    };
    let (log, index) = write_dataset_with(&dir, "full", &as_ops(&raw), options);
    let reader = HashReader::open(&index, &log).unwrap();

    assert_eq!(reader.slot_count(), expected.len() as u64);
    for (key, value) in &expected {
        assert_eq!(lookup_value(&reader, key).as_ref(), Some(value));
    }
    assert_eq!(lookup_value(&reader, b"absent"), None);
}

#[test]
fn test_next_live_visits_each_live_key_once() {
    let dir = setup_temp_dir();
    let (raw, expected) = generated_ops();
    let (log, index) = write_dataset(&dir, "scan", &as_ops(&raw));
    let reader = HashReader::open(&index, &log).unwrap();

    let mut seen = HashMap::new();
    let mut iter = reader.log_reader().iter();
    while reader.next_live(&mut iter).unwrap() == IterState::Active {
        let key = iter.key().unwrap().to_vec();
        let (value, _) = read_value_chunked(&mut iter, 7);
        assert!(seen.insert(key, value).is_none());
    }

    assert_eq!(seen, expected);
}

#[test]
fn test_empty_dataset() {
    let dir = setup_temp_dir();
    let (log, index) = write_dataset(&dir, "empty", &[]);
    let reader = HashReader::open(&index, &log).unwrap();

    assert_eq!(reader.live_entries(), 0);
    assert_eq!(lookup_value(&reader, b"anything"), None);
}

// =============================================================================
// Fingerprint Collision Tests
// =============================================================================

#[test]
fn test_fingerprint_collision_resolved_by_key_compare() {
    let dir = setup_temp_dir();
    let log = log_path(&dir, "collide");
    let index = index_path(&dir, "collide");
    let log_header = write_log(&log, &[Op::Put(b"k1", b"v1"), Op::Put(b"k2", b"v2")]);
    let offsets = entry_offsets(&log);

    let header = raw_hash_header(4, 2, 3, log_header.data_size);
    let hash = header.hash_key(b"k2");
    let primary = (hash % 4) as usize;

    // k1's entry sits at k2's primary slot, claiming k2's fingerprint
    let mut slots = vec![Slot::EMPTY; 4];
    slots[primary] = Slot {
        fingerprint: hash,
        offset: offsets[0],
    };
    slots[(primary + 1) % 4] = Slot {
        fingerprint: hash,
        offset: offsets[1],
    };
    write_raw_index(&index, &header, &slots);

    let reader = HashReader::open(&index, &log).unwrap();
    assert_eq!(lookup_value(&reader, b"k2"), Some(b"v2".to_vec()));
}

#[test]
fn test_fingerprint_collision_with_absent_key_is_miss() {
    let dir = setup_temp_dir();
    let log = log_path(&dir, "ghost");
    let index = index_path(&dir, "ghost");
    let log_header = write_log(&log, &[Op::Put(b"present", b"value")]);
    let offsets = entry_offsets(&log);

    let header = raw_hash_header(2, 1, 1, log_header.data_size);
    let hash = header.hash_key(b"ghost");

    // Every slot carries the absent key's fingerprint but points at "present"
    let slots = vec![
        Slot {
            fingerprint: hash,
            offset: offsets[0],
        };
        2
    ];
    write_raw_index(&index, &header, &slots);

    let reader = HashReader::open(&index, &log).unwrap();
    let mut iter = reader.log_reader().iter();
    reader.get(b"ghost", &mut iter).unwrap();
    assert_eq!(iter.state(), IterState::Invalid);
}

#[test]
fn test_delete_slot_ahead_of_older_put_is_miss() {
    let dir = setup_temp_dir();
    let log = log_path(&dir, "tomb");
    let index = index_path(&dir, "tomb");
    let log_header = write_log(&log, &[Op::Put(b"key", b"stale"), Op::Delete(b"key")]);
    let offsets = entry_offsets(&log);

    let header = raw_hash_header(4, 1, 3, log_header.data_size);
    let hash = header.hash_key(b"key");
    let primary = (hash % 4) as usize;

    // The DELETE is found first; the older PUT behind it must stay hidden
    let mut slots = vec![Slot::EMPTY; 4];
    slots[primary] = Slot {
        fingerprint: hash,
        offset: offsets[1],
    };
    slots[(primary + 1) % 4] = Slot {
        fingerprint: hash,
        offset: offsets[0],
    };
    write_raw_index(&index, &header, &slots);

    let reader = HashReader::open(&index, &log).unwrap();
    let mut iter = reader.log_reader().iter();
    reader.get(b"key", &mut iter).unwrap();
    assert_eq!(iter.state(), IterState::Invalid);
    assert_eq!(iter.position(), None);
    assert_eq!(lookup_value(&reader, b"key"), None);
}

#[test]
fn test_empty_slot_does_not_end_probe_early() {
    let dir = setup_temp_dir();
    let log = log_path(&dir, "gap");
    let index = index_path(&dir, "gap");
    let log_header = write_log(&log, &[Op::Put(b"key", b"found")]);
    let offsets = entry_offsets(&log);

    let header = raw_hash_header(8, 1, 3, log_header.data_size);
    let hash = header.hash_key(b"key");
    let primary = (hash % 8) as usize;

    let mut slots = vec![Slot::EMPTY; 8];
    slots[(primary + 3) % 8] = Slot {
        fingerprint: hash,
        offset: offsets[0],
    };
    write_raw_index(&index, &header, &slots);

    let reader = HashReader::open(&index, &log).unwrap();
    assert_eq!(lookup_value(&reader, b"key"), Some(b"found".to_vec()));
}

#[test]
fn test_key_beyond_max_displacement_is_not_found() {
    let dir = setup_temp_dir();
    let log = log_path(&dir, "far");
    let index = index_path(&dir, "far");
    let log_header = write_log(&log, &[Op::Put(b"key", b"hidden")]);
    let offsets = entry_offsets(&log);

    let header = raw_hash_header(8, 1, 2, log_header.data_size);
    let hash = header.hash_key(b"key");
    let primary = (hash % 8) as usize;

    let mut slots = vec![Slot::EMPTY; 8];
    slots[(primary + 3) % 8] = Slot {
        fingerprint: hash,
        offset: offsets[0],
    };
    write_raw_index(&index, &header, &slots);

    let reader = HashReader::open(&index, &log).unwrap();
    assert_eq!(lookup_value(&reader, b"key"), None);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_stale_index_is_mismatch() {
    let dir = setup_temp_dir();
    let (log, index) = write_dataset(&dir, "stale", &alpha_beta_ops());

    // Rewrite the log with different contents
    write_log(&log, &[Op::Put(b"alpha", b"a much longer value than before")]);

    let err = HashReader::open(&index, &log).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IndexLogMismatch);
}

#[test]
fn test_index_with_missing_slots_is_malformed() {
    let dir = setup_temp_dir();
    let (log, index) = write_dataset(&dir, "cut", &alpha_beta_ops());
    let bytes = fs::read(&index).unwrap();
    fs::write(&index, &bytes[..bytes.len() - 4]).unwrap();

    let err = HashReader::open(&index, &log).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[test]
fn test_index_with_extra_bytes_is_malformed() {
    let dir = setup_temp_dir();
    let (log, index) = write_dataset(&dir, "extra", &alpha_beta_ops());
    let mut bytes = fs::read(&index).unwrap();
    bytes.extend_from_slice(&[0u8; 16]);
    fs::write(&index, bytes).unwrap();

    assert_eq!(
        HashReader::open(&index, &log).unwrap_err().kind(),
        ErrorKind::Malformed
    );
}

#[test]
fn test_log_passed_as_index_is_wrong_file_type() {
    let dir = setup_temp_dir();
    let (log, _index) = write_dataset(&dir, "swap", &alpha_beta_ops());

    let err = HashReader::open(&log, &log).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WrongFileType);
}

#[test]
fn test_slot_pointing_outside_log_is_malformed() {
    let dir = setup_temp_dir();
    let log = log_path(&dir, "wild");
    let index = index_path(&dir, "wild");
    let log_header = write_log(&log, &[Op::Put(b"key", b"value")]);

    let header = raw_hash_header(1, 1, 0, log_header.data_size);
    let slots = vec![Slot {
        fingerprint: header.hash_key(b"key"),
        offset: 1 << 40,
    }];
    write_raw_index(&index, &header, &slots);

    let reader = HashReader::open(&index, &log).unwrap();
    let mut iter = reader.log_reader().iter();
    let err = reader.get(b"key", &mut iter).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
    assert_eq!(iter.state(), IterState::Invalid);
}

// =============================================================================
// Sharing and Concurrency Tests
// =============================================================================

#[test]
fn test_two_indexes_share_one_log_reader() {
    let dir = setup_temp_dir();
    let (log, index_a) = write_dataset(&dir, "shared", &alpha_beta_ops());
    let index_b = index_path(&dir, "shared-compact");
    hashlog::IndexBuilder::new(IndexOptions {
        slot_size: SLOT_SIZE_COMPACT,
        ..IndexOptions::default()
    })
    .build(&log, &index_b)
    .unwrap();

    let log_reader = Arc::new(LogReader::open(&log).unwrap());
    let a = HashReader::with_log_reader(&index_a, Arc::clone(&log_reader)).unwrap();
    let b = HashReader::with_log_reader(&index_b, Arc::clone(&log_reader)).unwrap();

    // An iterator over the shared reader works with either index
    let mut iter = log_reader.iter();
    a.get(b"beta", &mut iter).unwrap();
    assert_eq!(iter.value_chunk(8).unwrap(), b"33");

    let mut iter = log_reader.iter();
    b.get(b"beta", &mut iter).unwrap();
    assert_eq!(iter.value_chunk(8).unwrap(), b"33");

    a.close();
    assert_eq!(Arc::strong_count(&log_reader), 2);
    b.close();
    assert_eq!(Arc::strong_count(&log_reader), 1);
}

#[test]
fn test_concurrent_lookups_with_private_iterators() {
    let dir = setup_temp_dir();
    let (raw, expected) = generated_ops();
    let (log, index) = write_dataset(&dir, "threads", &as_ops(&raw));
    let reader = HashReader::open(&index, &log).unwrap();

    crossbeam::scope(|s| {
        for t in 0..4u32 {
            let reader = &reader;
            let expected = &expected;
            s.spawn(move |_| {
                for i in (t..500).step_by(4) {
                    let key = format!("key{:04}", i).into_bytes();
                    let mut iter = reader.log_reader().iter();
                    reader.get(&key, &mut iter).unwrap();
                    match expected.get(&key) {
                        Some(value) => {
                            let (got, _) = read_value_chunked(&mut iter, 3);
                            assert_eq!(&got, value);
                        }
                        None => assert_eq!(iter.state(), IterState::Invalid),
                    }
                    iter.close();
                }
            });
        }
    })
    .unwrap();
}
