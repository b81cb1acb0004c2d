//! Snapshot persistence for the counter table.
//!
//! A snapshot is the CBOR encoding of the whole table as a map from text key
//! to unsigned value. Writes go to a temporary file that is synced and then
//! renamed over the target, so a reader sees either the previous snapshot or
//! the new one, never a partial file.

use crate::dir::DataDir;
use crate::error::{CoreError, CoreResult};
use crate::table::CounterTable;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

/// Encodes a table into snapshot bytes.
pub fn encode_table(table: &CounterTable) -> CoreResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(table.len() * 16);
    ciborium::into_writer(table, &mut buf).map_err(|err| match err {
        ciborium::ser::Error::Io(err) => CoreError::Io(err),
        ciborium::ser::Error::Value(message) => CoreError::Codec(message),
    })?;
    Ok(buf)
}

/// Decodes snapshot bytes. An empty input is an empty table.
pub fn decode_table(data: &[u8]) -> CoreResult<CounterTable> {
    if data.is_empty() {
        return Ok(CounterTable::new());
    }
    ciborium::from_reader(data).map_err(|err| CoreError::snapshot_corruption(format!("{err:?}")))
}

/// Reads and writes snapshot files.
///
/// Writes are serialized by a lock of their own, independent of the counter
/// table lock: the flush worker and the shutdown path both save, and their
/// temporary files must not interleave.
pub struct SnapshotWriter {
    dir: Arc<DataDir>,
    write_lock: Mutex<()>,
}

impl SnapshotWriter {
    /// Creates a snapshot writer for a data directory.
    pub fn new(dir: Arc<DataDir>) -> Self {
        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    /// Loads the canonical snapshot, creating an empty file if none exists.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotCorruption` if the file cannot be decoded, or an I/O
    /// error if it cannot be opened or created.
    pub fn load(&self) -> CoreResult<CounterTable> {
        let path = self.dir.data_path();
        if !path.exists() {
            tracing::info!(path = %path.display(), "create data file");
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        decode_table(&data)
    }

    /// Atomically replaces the canonical snapshot with `table`.
    pub fn save(&self, table: &CounterTable) -> CoreResult<()> {
        let encoded = encode_table(table)?;
        self.save_encoded(&encoded)
    }

    /// Atomically replaces the canonical snapshot with pre-encoded bytes.
    ///
    /// Lets callers encode under the table lock and write without it.
    pub fn save_encoded(&self, encoded: &[u8]) -> CoreResult<()> {
        let _guard = self.write_lock.lock();
        let result = self.write_atomic(&self.dir.data_temp_path(), &self.dir.data_path(), |w| {
            w.write_all(encoded)?;
            Ok(())
        });
        if let Err(err) = &result {
            tracing::error!(error = %err, "failed to save data file");
        }
        result
    }

    /// Writes the shutdown checkpoint (`snapshot.cbor`).
    pub fn save_checkpoint(&self, encoded: &[u8]) -> CoreResult<()> {
        let _guard = self.write_lock.lock();
        tracing::info!(path = %self.dir.checkpoint_path().display(), "create snapshot file");
        let result = self.write_atomic(
            &self.dir.checkpoint_temp_path(),
            &self.dir.checkpoint_path(),
            |w| {
                w.write_all(encoded)?;
                Ok(())
            },
        );
        if let Err(err) = &result {
            tracing::error!(error = %err, "failed to save snapshot file");
        }
        result
    }

    /// Writes `temp` through `fill`, syncs it and renames it over `target`.
    ///
    /// On any failure the temporary file is removed and `target` is left as
    /// it was.
    pub(crate) fn write_atomic<F>(&self, temp: &Path, target: &Path, fill: F) -> CoreResult<()>
    where
        F: FnOnce(&mut BufWriter<File>) -> CoreResult<()>,
    {
        let result = (|| -> CoreResult<()> {
            let mut writer = BufWriter::new(File::create(temp)?);
            fill(&mut writer)?;
            let file = writer.into_inner().map_err(|err| err.into_error())?;
            file.sync_all()?;
            drop(file);
            fs::rename(temp, target)?;
            self.dir.sync_directory()
        })();

        if result.is_err() {
            let _ = fs::remove_file(temp);
        }
        result
    }
}

impl std::fmt::Debug for SnapshotWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotWriter")
            .field("dir", &self.dir.path())
            .finish_non_exhaustive()
    }
}
