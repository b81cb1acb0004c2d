//! Diagnostic logging setup.
//!
//! Events go to stdout and to `<log_dir>/sequence-generator.log`. Access log
//! events (failed requests) only go to the file.

use parking_lot::{Mutex, MutexGuard};
use seqgen_server::ACCESS_LOG_TARGET;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Name of the diagnostic log file inside the log directory.
pub const LOG_FILE_NAME: &str = "sequence-generator.log";

/// An append-only log file that can be reopened at runtime.
///
/// Log rotation tools move the file away and signal the process; after
/// [`ReopenableFile::reopen`] new events land in a fresh file at the
/// original path. Each event is written under the handle lock, so an event
/// in flight during a reopen completes against the old handle.
#[derive(Debug, Clone)]
pub struct ReopenableFile {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    file: Mutex<File>,
}

impl ReopenableFile {
    /// Opens (or creates) `path` for appending.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = open_append(&path)?;
        Ok(Self {
            inner: Arc::new(Inner {
                path,
                file: Mutex::new(file),
            }),
        })
    }

    /// Replaces the handle with a newly opened one at the same path.
    ///
    /// On failure the current handle stays in use.
    pub fn reopen(&self) -> io::Result<()> {
        let file = open_append(&self.inner.path)?;
        *self.inner.file.lock() = file;
        Ok(())
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Writer handed out per event; holds the handle lock until dropped.
pub struct LockedFile<'a> {
    file: MutexGuard<'a, File>,
}

impl Write for LockedFile<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl<'a> MakeWriter<'a> for ReopenableFile {
    type Writer = LockedFile<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LockedFile {
            file: self.inner.file.lock(),
        }
    }
}

/// Installs the global subscriber and returns the file sink for reopening.
///
/// `RUST_LOG` overrides the level; otherwise `info`, or `debug` when
/// `verbose` is set.
pub fn init(log_dir: &Path, verbose: bool) -> io::Result<ReopenableFile> {
    let file = ReopenableFile::open(log_dir.join(LOG_FILE_NAME))?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_filter(filter_fn(|meta| meta.target() != ACCESS_LOG_TARGET));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file.clone());

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(file)
}
