//! Write log segment writer.

use crate::dir::DataDir;
use crate::error::CoreResult;
use crate::types::SegmentId;
use crate::wal::record::LogRecord;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

/// A segment closed by rotation, waiting for a snapshot that covers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotation {
    /// The retired segment.
    pub segment: SegmentId,
    /// Path of the retired segment file.
    pub path: PathBuf,
}

/// Appends records to the active segment and rotates it at a fixed size.
///
/// The writer is not synchronized; the engine drives it under the same lock
/// that guards the counter table, so record order matches mutation order.
pub struct LogWriter {
    dir: Arc<DataDir>,
    file: File,
    active: SegmentId,
    records: usize,
    max_records: usize,
    sync_on_write: bool,
}

impl LogWriter {
    /// Creates the segment `first` (truncating any file of that name) and
    /// makes it the active segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment file cannot be created.
    pub fn create(
        dir: Arc<DataDir>,
        first: SegmentId,
        max_records: usize,
        sync_on_write: bool,
    ) -> CoreResult<Self> {
        let path = dir.segment_path(first);
        tracing::info!(path = %path.display(), "write log");
        let file = File::create(&path)?;

        Ok(Self {
            dir,
            file,
            active: first,
            records: 0,
            max_records,
            sync_on_write,
        })
    }

    /// Rotates the active segment if it already holds `max_records` records.
    ///
    /// Called before every append so a segment never exceeds the threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if rotation fails; see [`LogWriter::rotate`].
    pub fn rotate_if_full(&mut self) -> CoreResult<Option<Rotation>> {
        if self.records < self.max_records {
            return Ok(None);
        }
        self.rotate().map(Some)
    }

    /// Closes the active segment and opens the next one.
    ///
    /// The retired segment is synced to disk before it is handed back, since
    /// it stays the only durable copy of its records until a snapshot lands.
    ///
    /// # Errors
    ///
    /// Returns an error if the retired segment cannot be synced or the next
    /// segment cannot be created. The active segment is unchanged in that
    /// case, so the next append retries the rotation.
    pub fn rotate(&mut self) -> CoreResult<Rotation> {
        if let Err(err) = self.file.sync_all() {
            tracing::error!(segment = %self.active, error = %err, "failed to sync segment before rotation");
            return Err(err.into());
        }

        let next = self.active.next();
        let next_path = self.dir.segment_path(next);
        let file = match File::create(&next_path) {
            Ok(file) => file,
            Err(err) => {
                tracing::error!(path = %next_path.display(), error = %err, "failed to create segment");
                return Err(err.into());
            }
        };

        let retired = Rotation {
            segment: self.active,
            path: self.dir.segment_path(self.active),
        };

        // Dropping the old handle closes the retired segment.
        self.file = file;
        self.active = next;
        self.records = 0;

        tracing::debug!(path = %next_path.display(), retired = %retired.segment, "write log");
        Ok(retired)
    }

    /// Appends one record to the active segment.
    ///
    /// Does not rotate; callers run [`LogWriter::rotate_if_full`] first.
    ///
    /// # Errors
    ///
    /// Returns an error if the write (or the fsync, with `sync_on_write`)
    /// fails. The record counter only advances on success.
    pub fn append(&mut self, key: &str, value: u64) -> CoreResult<()> {
        let written = LogRecord::write_line(&mut self.file, key, value).and_then(|()| {
            if self.sync_on_write {
                self.file.sync_data()
            } else {
                Ok(())
            }
        });

        if let Err(err) = written {
            tracing::error!(segment = %self.active, key, error = %err, "error write to log");
            return Err(err.into());
        }

        self.records += 1;
        Ok(())
    }

    /// Syncs the active segment to disk.
    pub fn sync(&mut self) -> CoreResult<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Returns the active segment.
    #[must_use]
    pub fn active_segment(&self) -> SegmentId {
        self.active
    }

    /// Returns the number of records in the active segment.
    #[must_use]
    pub fn records_in_segment(&self) -> usize {
        self.records
    }
}

impl std::fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWriter")
            .field("active", &self.active)
            .field("records", &self.records)
            .field("max_records", &self.max_records)
            .field("sync_on_write", &self.sync_on_write)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn create_writer(max_records: usize) -> (TempDir, Arc<DataDir>, LogWriter) {
        let temp = tempdir().unwrap();
        let dir = Arc::new(DataDir::open(temp.path()).unwrap());
        dir.ensure_logs_dir().unwrap();
        let writer = LogWriter::create(Arc::clone(&dir), SegmentId::FIRST, max_records, false)
            .unwrap();
        (temp, dir, writer)
    }

    #[test]
    fn append_writes_lines() {
        let (_temp, dir, mut writer) = create_writer(10);

        writer.append("a", 1).unwrap();
        writer.append("b", 7).unwrap();
        writer.append("a", 2).unwrap();

        let content = fs::read_to_string(dir.segment_path(SegmentId::FIRST)).unwrap();
        assert_eq!(content, "a 1\nb 7\na 2\n");
        assert_eq!(writer.records_in_segment(), 3);
    }

    #[test]
    fn rotate_if_full_respects_threshold() {
        let (_temp, dir, mut writer) = create_writer(2);

        assert_eq!(writer.rotate_if_full().unwrap(), None);
        writer.append("a", 1).unwrap();
        assert_eq!(writer.rotate_if_full().unwrap(), None);
        writer.append("a", 2).unwrap();

        let retired = writer.rotate_if_full().unwrap().unwrap();
        assert_eq!(retired.segment, SegmentId::FIRST);
        assert_eq!(retired.path, dir.segment_path(SegmentId::FIRST));
        assert_eq!(writer.active_segment(), SegmentId::new(2));
        assert_eq!(writer.records_in_segment(), 0);

        writer.append("a", 3).unwrap();
        assert_eq!(
            fs::read_to_string(dir.segment_path(SegmentId::new(2))).unwrap(),
            "a 3\n"
        );
        assert_eq!(
            fs::read_to_string(dir.segment_path(SegmentId::FIRST)).unwrap(),
            "a 1\na 2\n"
        );
    }

    #[test]
    fn failed_rotation_keeps_active_segment() {
        let (_temp, dir, mut writer) = create_writer(1);
        writer.append("a", 1).unwrap();

        // A directory in the way of the next segment makes creation fail.
        fs::create_dir(dir.segment_path(SegmentId::new(2))).unwrap();

        assert!(writer.rotate_if_full().is_err());
        assert_eq!(writer.active_segment(), SegmentId::FIRST);
        assert_eq!(writer.records_in_segment(), 1);

        fs::remove_dir(dir.segment_path(SegmentId::new(2))).unwrap();
        let retired = writer.rotate_if_full().unwrap().unwrap();
        assert_eq!(retired.segment, SegmentId::FIRST);
        assert_eq!(writer.active_segment(), SegmentId::new(2));
    }
}
