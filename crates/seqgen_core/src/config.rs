//! Engine configuration.

use crate::error::{CoreError, CoreResult};
use crate::types::Projection;
use std::path::{Path, PathBuf};

/// Default number of records in a log segment before rotation.
pub const DEFAULT_MAX_LOG_RECORDS: usize = 10_000;

/// Default capacity of the queue between rotation and the flush worker.
pub const DEFAULT_FLUSH_QUEUE_CAPACITY: usize = 10;

/// Configuration for starting a [`crate::SequenceEngine`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Step between consecutive values of a key. Zero means "use defaults".
    pub increment: u64,

    /// Added to every projected value. Must not exceed `increment`.
    pub offset: u64,

    /// Directory holding snapshots and the `logs/` segment directory.
    pub data_dir: PathBuf,

    /// Directory for diagnostic output. Must exist.
    pub log_dir: PathBuf,

    /// Number of records a segment holds before the next append rotates it.
    pub max_log_records: usize,

    /// Retired segments that may wait for a snapshot before rotation blocks.
    pub flush_queue_capacity: usize,

    /// Whether to fsync the active segment after every record.
    pub sync_on_write: bool,
}

impl Config {
    /// Creates a configuration with default values.
    pub fn new(data_dir: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            increment: 1,
            offset: 0,
            data_dir: data_dir.into(),
            log_dir: log_dir.into(),
            max_log_records: DEFAULT_MAX_LOG_RECORDS,
            flush_queue_capacity: DEFAULT_FLUSH_QUEUE_CAPACITY,
            sync_on_write: false,
        }
    }

    /// Sets the increment.
    #[must_use]
    pub const fn increment(mut self, value: u64) -> Self {
        self.increment = value;
        self
    }

    /// Sets the offset.
    #[must_use]
    pub const fn offset(mut self, value: u64) -> Self {
        self.offset = value;
        self
    }

    /// Sets the rotation threshold.
    #[must_use]
    pub const fn max_log_records(mut self, value: usize) -> Self {
        self.max_log_records = value;
        self
    }

    /// Sets the flush queue capacity.
    #[must_use]
    pub const fn flush_queue_capacity(mut self, value: usize) -> Self {
        self.flush_queue_capacity = value;
        self
    }

    /// Sets whether to fsync after every record.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Returns the projection this configuration describes.
    ///
    /// Only meaningful after [`Config::validate`].
    #[must_use]
    pub const fn projection(&self) -> Projection {
        Projection::new(self.increment, self.offset)
    }

    /// Checks the configuration and normalizes a zero increment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if:
    /// - `offset` is greater than `increment`
    /// - `data_dir` or `log_dir` is not an existing directory
    /// - `max_log_records` or `flush_queue_capacity` is zero
    pub fn validate(mut self) -> CoreResult<Self> {
        if self.offset > self.increment {
            return Err(CoreError::invalid_config(format!(
                "offset can not be greater than increment ({} > {})",
                self.offset, self.increment
            )));
        }

        require_dir("data", &self.data_dir)?;
        require_dir("log", &self.log_dir)?;

        if self.max_log_records == 0 {
            return Err(CoreError::invalid_config("max_log_records must be positive"));
        }
        if self.flush_queue_capacity == 0 {
            return Err(CoreError::invalid_config(
                "flush_queue_capacity must be positive",
            ));
        }

        if self.increment == 0 {
            self.increment = 1;
            self.offset = 0;
            tracing::info!("increment is 0, using increment=1 offset=0");
        }

        Ok(self)
    }
}

fn require_dir(kind: &str, path: &Path) -> CoreResult<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(CoreError::invalid_config(format!(
            "{kind} dir {} does not exist",
            path.display()
        )))
    }
}
