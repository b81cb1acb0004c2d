//! Crash recovery tests.
//!
//! A crash is simulated by copying the data directory while the engine is
//! still live, then starting a second engine on the copy. Nothing the live
//! engine does on shutdown reaches the copy.

use seqgen_core::{Config, CoreError, SequenceEngine};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), target).unwrap();
        }
    }
}

/// Copies a live data directory as a crashed image.
fn crash_image(live: &Path) -> TempDir {
    let image = tempdir().unwrap();
    copy_dir(live, image.path());
    image
}

fn config(dir: &Path) -> Config {
    Config::new(dir, dir)
}

#[test]
fn values_survive_crash() {
    let live = tempdir().unwrap();
    let engine = SequenceEngine::start(config(live.path())).unwrap();
    for expected in 1..=20 {
        assert_eq!(engine.get("orders").unwrap(), expected);
    }
    engine.add("users", 500).unwrap();
    engine.get("users").unwrap();

    let image = crash_image(live.path());
    drop(engine);

    let recovered = SequenceEngine::start(config(image.path())).unwrap();
    assert_eq!(recovered.recovery_report().segments_replayed, 1);
    assert_eq!(recovered.recovery_report().records_replayed, 22);
    assert_eq!(recovered.get("orders").unwrap(), 21);
    assert_eq!(recovered.get("users").unwrap(), 502);
    assert_eq!(recovered.len(), 2);
}

#[test]
fn added_key_survives_crash() {
    let live = tempdir().unwrap();
    let engine = SequenceEngine::start(config(live.path())).unwrap();
    engine.add("x", 100).unwrap();

    let image = crash_image(live.path());
    drop(engine);

    let recovered = SequenceEngine::start(config(image.path())).unwrap();
    assert!(matches!(
        recovered.add("x", 1),
        Err(CoreError::KeyAlreadyExists { .. })
    ));
    assert_eq!(recovered.get("x").unwrap(), 101);
}

#[test]
fn torn_append_is_ignored() {
    let live = tempdir().unwrap();
    let engine = SequenceEngine::start(config(live.path())).unwrap();
    for _ in 0..3 {
        engine.get("a").unwrap();
    }

    let image = crash_image(live.path());
    drop(engine);

    let mut segment = OpenOptions::new()
        .append(true)
        .open(image.path().join("logs").join("log_1.log"))
        .unwrap();
    segment.write_all(b"a 4").unwrap();
    drop(segment);

    let recovered = SequenceEngine::start(config(image.path())).unwrap();
    assert_eq!(recovered.recovery_report().lines_skipped, 1);
    assert_eq!(recovered.get("a").unwrap(), 4);
}

#[test]
fn recovery_is_repeatable() {
    let live = tempdir().unwrap();
    let engine = SequenceEngine::start(config(live.path())).unwrap();
    engine.get("a").unwrap();
    engine.get("a").unwrap();

    let image = crash_image(live.path());
    drop(engine);

    // Crash again right after recovery: the merged snapshot is already on
    // disk, so nothing is lost even though the new segment is empty.
    let first = SequenceEngine::start(config(image.path())).unwrap();
    let second_image = crash_image(image.path());
    drop(first);

    let second = SequenceEngine::start(config(second_image.path())).unwrap();
    assert_eq!(second.recovery_report().records_replayed, 0);
    assert_eq!(second.get("a").unwrap(), 3);
}

#[test]
fn graceful_stop_leaves_no_records_to_replay() {
    let dir = tempdir().unwrap();
    {
        let engine = SequenceEngine::start(config(dir.path())).unwrap();
        engine.get("a").unwrap();
        engine.stop().unwrap();
    }

    let engine = SequenceEngine::start(config(dir.path())).unwrap();
    assert!(dir.path().join("snapshot.cbor").exists());
    assert_eq!(engine.get("a").unwrap(), 2);
}

#[test]
fn corrupt_snapshot_prevents_start() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("data.cbor"), b"\xff\xff\xff\xff").unwrap();

    let result = SequenceEngine::start(config(dir.path()));
    assert!(matches!(result, Err(CoreError::SnapshotCorruption { .. })));
}

#[test]
fn empty_snapshot_file_is_empty_table() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("data.cbor"), b"").unwrap();

    let engine = SequenceEngine::start(config(dir.path())).unwrap();
    assert!(engine.is_empty());
    assert_eq!(engine.get("a").unwrap(), 1);
}

#[test]
fn projection_applies_after_recovery() {
    let live = tempdir().unwrap();
    let engine = SequenceEngine::start(config(live.path()).increment(5).offset(2)).unwrap();
    assert_eq!(engine.get("k").unwrap(), 7);
    assert_eq!(engine.get("k").unwrap(), 12);

    let image = crash_image(live.path());
    drop(engine);

    let recovered = SequenceEngine::start(config(image.path()).increment(5).offset(2)).unwrap();
    assert_eq!(recovered.get("k").unwrap(), 17);
}
