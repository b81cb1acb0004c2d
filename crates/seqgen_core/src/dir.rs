//! Data directory management.
//!
//! This module handles the file system layout of the sequence engine:
//!
//! ```text
//! <data_dir>/
//! ├─ LOCK              # Advisory lock for single-writer
//! ├─ data.cbor         # Canonical snapshot of the counter table
//! ├─ data.cbor.tmp     # Snapshot being written (renamed over data.cbor)
//! ├─ snapshot.cbor     # Checkpoint written on graceful shutdown
//! └─ logs/
//!    ├─ log_1.log      # Write log segments, "<key> <value>\n" per record
//!    └─ log_2.log
//! ```
//!
//! The data directory itself must already exist; only `logs/` is created.

use crate::error::{CoreError, CoreResult};
use crate::types::SegmentId;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const DATA_FILE: &str = "data.cbor";
const DATA_TEMP: &str = "data.cbor.tmp";
const CHECKPOINT_FILE: &str = "snapshot.cbor";
const CHECKPOINT_TEMP: &str = "snapshot.cbor.tmp";
const LOGS_DIR: &str = "logs";
const SEGMENT_PREFIX: &str = "log_";
const SEGMENT_SUFFIX: &str = ".log";

/// Manages the data directory structure and file locking.
///
/// # Thread Safety
///
/// The `DataDir` holds an exclusive lock on the data directory. Only one
/// `DataDir` instance can exist per directory at a time, across processes.
#[derive(Debug)]
pub struct DataDir {
    /// Root directory path.
    path: PathBuf,
    /// Lock file handle (held for exclusive access).
    _lock_file: File,
}

impl DataDir {
    /// Opens an existing data directory and locks it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path is not an existing directory (`InvalidConfig`)
    /// - Another engine holds the lock (`DataDirLocked`)
    /// - I/O errors occur
    pub fn open(path: &Path) -> CoreResult<Self> {
        if !path.is_dir() {
            return Err(CoreError::invalid_config(format!(
                "data dir {} does not exist",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::DataDirLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the path to the data directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path to the canonical snapshot.
    #[must_use]
    pub fn data_path(&self) -> PathBuf {
        self.path.join(DATA_FILE)
    }

    /// Returns the temporary path the canonical snapshot is written to.
    #[must_use]
    pub fn data_temp_path(&self) -> PathBuf {
        self.path.join(DATA_TEMP)
    }

    /// Returns the path to the shutdown checkpoint.
    #[must_use]
    pub fn checkpoint_path(&self) -> PathBuf {
        self.path.join(CHECKPOINT_FILE)
    }

    /// Returns the temporary path the shutdown checkpoint is written to.
    #[must_use]
    pub fn checkpoint_temp_path(&self) -> PathBuf {
        self.path.join(CHECKPOINT_TEMP)
    }

    /// Returns the path to the segment directory.
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.path.join(LOGS_DIR)
    }

    /// Returns the path of a segment file.
    ///
    /// Segment 3 is `logs/log_3.log`.
    #[must_use]
    pub fn segment_path(&self, id: SegmentId) -> PathBuf {
        self.logs_dir()
            .join(format!("{SEGMENT_PREFIX}{}{SEGMENT_SUFFIX}", id.as_u64()))
    }

    /// Creates the segment directory if it does not exist.
    ///
    /// Returns true if the directory was created.
    pub fn ensure_logs_dir(&self) -> CoreResult<bool> {
        let logs = self.logs_dir();
        if logs.is_dir() {
            return Ok(false);
        }
        fs::create_dir(&logs)?;
        self.sync_directory()?;
        Ok(true)
    }

    /// Lists segment files left in the segment directory.
    ///
    /// Only regular files ending in `.log` are returned, ordered by segment
    /// number where the name carries one.
    pub fn list_segments(&self) -> CoreResult<Vec<PathBuf>> {
        let mut segments = Vec::new();
        for entry in fs::read_dir(self.logs_dir())? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let is_segment = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(SEGMENT_SUFFIX));
            if is_segment {
                segments.push(path);
            }
        }
        segments.sort_by_key(|path| (segment_number(path), path.clone()));
        Ok(segments)
    }

    /// Deletes a consumed segment file and syncs the segment directory.
    pub fn remove_segment(&self, path: &Path) -> CoreResult<()> {
        fs::remove_file(path)?;
        sync_dir(&self.logs_dir())
    }

    /// Syncs the data directory so renames and creations are durable.
    pub fn sync_directory(&self) -> CoreResult<()> {
        sync_dir(&self.path)
    }
}

/// Extracts `N` from a `log_<N>.log` file name.
#[must_use]
pub fn segment_number(path: &Path) -> Option<u64> {
    path.file_name()?
        .to_str()?
        .strip_prefix(SEGMENT_PREFIX)?
        .strip_suffix(SEGMENT_SUFFIX)?
        .parse()
        .ok()
}

/// On Unix, fsync on a directory makes its entries durable.
#[cfg(unix)]
fn sync_dir(path: &Path) -> CoreResult<()> {
    File::open(path)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_path: &Path) -> CoreResult<()> {
    // NTFS journaling covers metadata durability
    Ok(())
}
