//! Startup recovery.
//!
//! Rebuilds the counter table from the canonical snapshot plus every segment
//! left in `logs/` by an unclean shutdown, then opens a fresh active segment.
//!
//! Filesystem failures are fatal: the engine must not start on an
//! indeterminate state. Unparseable lines inside a segment are not; they are
//! skipped and counted in the [`RecoveryReport`].
//!
//! The merged table is saved before any replayed segment is deleted, so a
//! crash anywhere in this procedure loses nothing.

use crate::dir::DataDir;
use crate::error::CoreResult;
use crate::snapshot::SnapshotWriter;
use crate::table::CounterTable;
use crate::types::SegmentId;
use crate::wal::{LogRecord, LogWriter};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

/// Summary of a recovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Number of leftover segment files replayed.
    pub segments_replayed: usize,
    /// Number of records parsed and merged into the table.
    pub records_replayed: usize,
    /// Number of lines that did not parse and were ignored.
    pub lines_skipped: usize,
}

/// State handed to the engine once recovery completes.
#[derive(Debug)]
pub struct Recovered {
    /// The reconstructed table.
    pub table: CounterTable,
    /// Writer positioned on a fresh, empty first segment.
    pub writer: LogWriter,
    /// What recovery did.
    pub report: RecoveryReport,
}

/// Runs the recovery procedure once, before the engine accepts requests.
///
/// 1. Create `logs/` if it is missing.
/// 2. Load the canonical snapshot (missing or empty file: empty table).
/// 3. Replay every leftover segment, keeping the maximum value per key.
/// 4. Save the merged table, then delete the replayed segments.
/// 5. Open segment 1 as the new active segment.
///
/// # Errors
///
/// Returns an error if the snapshot is corrupt, a segment cannot be read,
/// the merged snapshot cannot be saved, or the new segment cannot be created.
pub fn recover(
    dir: &Arc<DataDir>,
    snapshots: &SnapshotWriter,
    max_log_records: usize,
    sync_on_write: bool,
) -> CoreResult<Recovered> {
    if dir.ensure_logs_dir()? {
        tracing::info!(path = %dir.logs_dir().display(), "create log dir");
    }

    let mut table = snapshots.load()?;
    let mut report = RecoveryReport::default();

    let segments = dir.list_segments()?;
    for path in &segments {
        tracing::info!(path = %path.display(), "read log");
        replay_segment(path, &mut table, &mut report)?;
        report.segments_replayed += 1;
    }

    snapshots.save(&table)?;

    for path in &segments {
        // The saved snapshot covers this segment; a leftover file is replayed
        // again harmlessly on the next start.
        if let Err(err) = dir.remove_segment(path) {
            tracing::warn!(path = %path.display(), error = %err, "failed to delete replayed segment");
        }
    }

    let writer = LogWriter::create(Arc::clone(dir), SegmentId::FIRST, max_log_records, sync_on_write)?;

    tracing::info!(
        keys = table.len(),
        segments = report.segments_replayed,
        records = report.records_replayed,
        skipped = report.lines_skipped,
        "recovery complete"
    );

    Ok(Recovered {
        table,
        writer,
        report,
    })
}

fn replay_segment(path: &Path, table: &mut CounterTable, report: &mut RecoveryReport) -> CoreResult<()> {
    let skipped_before = report.lines_skipped;
    replay_reader(BufReader::new(File::open(path)?), table, report)?;

    let skipped = report.lines_skipped - skipped_before;
    if skipped > 0 {
        tracing::warn!(path = %path.display(), skipped, "skipped malformed log lines");
    }
    Ok(())
}

/// Merges every parseable `"<key> <value>"` line of `reader` into `table`.
pub fn replay_reader<R: BufRead>(
    reader: R,
    table: &mut CounterTable,
    report: &mut RecoveryReport,
) -> io::Result<()> {
    for line in reader.split(b'\n') {
        let line = line?;
        match std::str::from_utf8(&line).ok().and_then(LogRecord::parse) {
            Some(record) => {
                table.merge_max(&record.key, record.value);
                report.records_replayed += 1;
            }
            None => report.lines_skipped += 1,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::fs;
    use std::io::Cursor;
    use tempfile::{tempdir, TempDir};

    fn open_dir() -> (TempDir, Arc<DataDir>, SnapshotWriter) {
        let temp = tempdir().unwrap();
        let dir = Arc::new(DataDir::open(temp.path()).unwrap());
        let snapshots = SnapshotWriter::new(Arc::clone(&dir));
        (temp, dir, snapshots)
    }

    #[test]
    fn empty_directory() {
        let (_temp, dir, snapshots) = open_dir();

        let recovered = recover(&dir, &snapshots, 100, false).unwrap();
        assert!(recovered.table.is_empty());
        assert_eq!(recovered.report, RecoveryReport::default());
        assert!(dir.logs_dir().is_dir());
        assert!(dir.data_path().exists());
        assert_eq!(recovered.writer.active_segment(), SegmentId::FIRST);
    }

    #[test]
    fn merges_snapshot_and_segments_by_max() {
        let (_temp, dir, snapshots) = open_dir();
        let base: CounterTable = vec![("a".to_string(), 5)].into_iter().collect();
        snapshots.save(&base).unwrap();

        dir.ensure_logs_dir().unwrap();
        fs::write(dir.segment_path(SegmentId::new(3)), "a 6\na 7\nb 1\n").unwrap();
        fs::write(dir.segment_path(SegmentId::new(4)), "a 9\nb 3\n").unwrap();

        let recovered = recover(&dir, &snapshots, 100, false).unwrap();
        assert_eq!(recovered.table.get("a"), Some(9));
        assert_eq!(recovered.table.get("b"), Some(3));
        assert_eq!(recovered.table.len(), 2);
        assert_eq!(recovered.report.segments_replayed, 2);
        assert_eq!(recovered.report.records_replayed, 5);

        // Only the fresh active segment is left, and it is empty.
        let left = dir.list_segments().unwrap();
        assert_eq!(left, vec![dir.segment_path(SegmentId::FIRST)]);
        assert_eq!(fs::read(&left[0]).unwrap(), b"");

        // The merged state is durable before any new write.
        assert_eq!(snapshots.load().unwrap(), recovered.table);
    }

    #[test]
    fn stale_records_do_not_lower_snapshot() {
        let (_temp, dir, snapshots) = open_dir();
        let base: CounterTable = vec![("a".to_string(), 50)].into_iter().collect();
        snapshots.save(&base).unwrap();
        dir.ensure_logs_dir().unwrap();
        fs::write(dir.segment_path(SegmentId::new(1)), "a 10\n").unwrap();

        let recovered = recover(&dir, &snapshots, 100, false).unwrap();
        assert_eq!(recovered.table.get("a"), Some(50));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let (_temp, dir, snapshots) = open_dir();
        dir.ensure_logs_dir().unwrap();
        fs::write(
            dir.segment_path(SegmentId::new(2)),
            b"a 1\ngarbage\n\xff\xfe 3\nb -4\nc 2\na 1",
        )
        .unwrap();

        let recovered = recover(&dir, &snapshots, 100, false).unwrap();
        assert_eq!(recovered.table.get("a"), Some(1));
        assert_eq!(recovered.table.get("c"), Some(2));
        assert_eq!(recovered.table.get("b"), None);
        assert_eq!(recovered.report.records_replayed, 3);
        assert_eq!(recovered.report.lines_skipped, 3);
    }

    #[test]
    fn torn_last_line_is_skipped() {
        let (_temp, dir, snapshots) = open_dir();
        dir.ensure_logs_dir().unwrap();
        fs::write(dir.segment_path(SegmentId::new(1)), "a 1\na 2\na ").unwrap();

        let recovered = recover(&dir, &snapshots, 100, false).unwrap();
        assert_eq!(recovered.table.get("a"), Some(2));
        assert_eq!(recovered.report.lines_skipped, 1);
    }

    #[test]
    fn non_segment_files_are_left_alone() {
        let (_temp, dir, snapshots) = open_dir();
        dir.ensure_logs_dir().unwrap();
        let notes = dir.logs_dir().join("README.txt");
        fs::write(&notes, "a 100\n").unwrap();

        let recovered = recover(&dir, &snapshots, 100, false).unwrap();
        assert!(recovered.table.is_empty());
        assert!(notes.exists());
    }

    #[test]
    fn corrupt_snapshot_is_fatal() {
        let (_temp, dir, snapshots) = open_dir();
        dir.ensure_logs_dir().unwrap();
        fs::write(dir.data_path(), b"\xff\xff\xff").unwrap();
        fs::write(dir.segment_path(SegmentId::new(1)), "a 1\n").unwrap();

        let result = recover(&dir, &snapshots, 100, false);
        assert!(matches!(result, Err(CoreError::SnapshotCorruption { .. })));
        // Nothing was consumed.
        assert!(dir.segment_path(SegmentId::new(1)).exists());
    }

    proptest! {
        #[test]
        fn replay_keeps_max_per_key(
            records in proptest::collection::vec(("[a-d]", 0u64..1_000), 0..64),
        ) {
            let mut input = String::new();
            let mut model: HashMap<String, u64> = HashMap::new();
            for (key, value) in &records {
                input.push_str(&LogRecord::new(key.clone(), *value).encode());
                let entry = model.entry(key.clone()).or_insert(0);
                *entry = (*entry).max(*value);
            }

            let mut table = CounterTable::new();
            let mut report = RecoveryReport::default();
            replay_reader(Cursor::new(input), &mut table, &mut report).unwrap();

            prop_assert_eq!(report.records_replayed, records.len());
            prop_assert_eq!(table.len(), model.len());
            for (key, value) in &model {
                prop_assert_eq!(table.get(key), Some(*value));
            }
        }
    }
}
