//! Sequence engine facade and lifecycle.

use crate::config::Config;
use crate::dir::DataDir;
use crate::error::{CoreError, CoreResult};
use crate::flusher::{FlushCoordinator, SnapshotSource};
use crate::recovery::{self, Recovered, RecoveryReport};
use crate::snapshot::{encode_table, SnapshotWriter};
use crate::table::CounterTable;
use crate::types::{Projection, SegmentId};
use crate::wal::{validate_key, LogWriter, Rotation};
use parking_lot::Mutex;
use std::sync::Arc;

/// The durable sequence engine.
///
/// `SequenceEngine` owns the counter table, the active write log segment,
/// the snapshot writer and the flush worker. It is the only type the HTTP
/// layer talks to:
///
/// ```rust,no_run
/// use seqgen_core::{Config, SequenceEngine};
///
/// let config = Config::new("/var/sequence-generator/", "/var/log/sequence-generator/")
///     .increment(5)
///     .offset(2);
/// let engine = SequenceEngine::start(config)?;
///
/// assert_eq!(engine.get("orders")?, 7);
/// assert_eq!(engine.get("orders")?, 12);
///
/// engine.stop()?;
/// # Ok::<(), seqgen_core::CoreError>(())
/// ```
///
/// # Concurrency
///
/// `get`, `add` and `len` are serialized by one lock, so write log order
/// matches mutation order. Snapshot writes happen on the flush worker under
/// a separate lock; the table lock is only held while the table is encoded.
pub struct SequenceEngine {
    projection: Projection,
    dir: Arc<DataDir>,
    shared: Arc<Shared>,
    snapshots: Arc<SnapshotWriter>,
    flusher: FlushCoordinator,
    report: RecoveryReport,
}

/// State guarded by the table lock.
struct State {
    table: CounterTable,
    /// `None` once the engine is stopped.
    writer: Option<LogWriter>,
}

impl State {
    fn writer(&mut self) -> CoreResult<&mut LogWriter> {
        self.writer.as_mut().ok_or(CoreError::EngineStopped)
    }

    /// Appends a record, rotating first if the active segment is full.
    ///
    /// The rotation is returned even when the append itself fails: the
    /// retired segment still needs its snapshot.
    fn log(&mut self, key: &str, value: u64) -> (Option<Rotation>, CoreResult<()>) {
        let writer = match self.writer() {
            Ok(writer) => writer,
            Err(err) => return (None, Err(err)),
        };
        let rotation = match writer.rotate_if_full() {
            Ok(rotation) => rotation,
            Err(err) => return (None, Err(err)),
        };
        (rotation, writer.append(key, value))
    }
}

struct Shared {
    state: Mutex<State>,
}

impl SnapshotSource for Shared {
    fn encode_snapshot(&self) -> CoreResult<Vec<u8>> {
        encode_table(&self.state.lock().table)
    }
}

impl SequenceEngine {
    /// Validates `config`, runs recovery and starts the flush worker.
    ///
    /// No request is served before recovery has completed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid (`InvalidConfig`)
    /// - Another engine holds the data directory (`DataDirLocked`)
    /// - The snapshot is corrupt (`SnapshotCorruption`)
    /// - Recovery hits a filesystem error
    pub fn start(config: Config) -> CoreResult<Self> {
        let config = config.validate()?;
        tracing::info!(pid = std::process::id(), data_dir = %config.data_dir.display(), "start");

        let dir = Arc::new(DataDir::open(&config.data_dir)?);
        let snapshots = Arc::new(SnapshotWriter::new(Arc::clone(&dir)));

        let Recovered {
            table,
            writer,
            report,
        } = recovery::recover(&dir, &snapshots, config.max_log_records, config.sync_on_write)?;

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                table,
                writer: Some(writer),
            }),
        });

        let flusher = FlushCoordinator::start(
            Arc::clone(&shared),
            Arc::clone(&snapshots),
            Arc::clone(&dir),
            config.flush_queue_capacity,
        )?;

        Ok(Self {
            projection: config.projection(),
            dir,
            shared,
            snapshots,
            flusher,
            report,
        })
    }

    /// Returns the next value for `key`.
    ///
    /// The stored counter advances by one (an unknown key starts at 0) and
    /// the projected value is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid, the engine is stopped, or the
    /// record cannot be logged. In the last case the in-memory counter has
    /// already advanced without a durable record.
    ///
    /// Returns `CounterOverflow` without advancing the counter if the next
    /// value, projected, would not fit in a `u64`.
    pub fn get(&self, key: &str) -> CoreResult<u64> {
        validate_key(key)?;

        let (projected, rotation, logged) = {
            let mut state = self.shared.state.lock();
            state.writer()?;
            let projected = state
                .table
                .get(key)
                .unwrap_or(0)
                .checked_add(1)
                .and_then(|next| self.projection.try_apply(next))
                .ok_or_else(|| CoreError::CounterOverflow {
                    key: key.to_string(),
                })?;
            let value = state.table.increment(key)?;
            let (rotation, logged) = state.log(key, value);
            (projected, rotation, logged)
        };

        self.hand_off(rotation);
        logged?;
        Ok(projected)
    }

    /// Registers `key` with a stored value of `value`.
    ///
    /// The value is stored as given, not projected.
    ///
    /// # Errors
    ///
    /// Returns `KeyAlreadyExists` if the key is present (nothing is logged),
    /// or an error if the record cannot be logged. In the last case the key
    /// is already registered in memory.
    pub fn add(&self, key: &str, value: u64) -> CoreResult<()> {
        validate_key(key)?;

        let (rotation, logged) = {
            let mut state = self.shared.state.lock();
            state.writer()?;
            state.table.insert_new(key, value)?;
            state.log(key, value)
        };

        self.hand_off(rotation);
        logged
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().table.len()
    }

    /// Returns true if no key is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the stored (unprojected) value of `key` without advancing it.
    #[must_use]
    pub fn current(&self, key: &str) -> Option<u64> {
        self.shared.state.lock().table.get(key)
    }

    /// Returns the active segment, or `None` once stopped.
    #[must_use]
    pub fn active_segment(&self) -> Option<SegmentId> {
        self.shared
            .state
            .lock()
            .writer
            .as_ref()
            .map(LogWriter::active_segment)
    }

    /// Returns the projection applied by [`SequenceEngine::get`].
    #[must_use]
    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Returns what startup recovery did.
    #[must_use]
    pub fn recovery_report(&self) -> &RecoveryReport {
        &self.report
    }

    /// Returns true until [`SequenceEngine::stop`] has been called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().writer.is_some()
    }

    /// Stops accepting mutations and persists the final state.
    ///
    /// Drains the flush queue, writes the canonical snapshot and the shutdown
    /// checkpoint, then syncs and closes the active segment. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if a snapshot or the final segment sync fails. The
    /// segment files stay on disk in that case and recovery replays them.
    pub fn stop(&self) -> CoreResult<()> {
        let Some(mut writer) = self.shared.state.lock().writer.take() else {
            return Ok(());
        };
        tracing::info!(data_dir = %self.dir.path().display(), "stop storage, create snapshot file");

        self.flusher.shutdown();

        let encoded = self.shared.encode_snapshot()?;
        self.snapshots.save_encoded(&encoded)?;
        self.snapshots.save_checkpoint(&encoded)?;

        writer.sync()?;
        drop(writer);

        tracing::info!("stopped");
        Ok(())
    }

    /// Queues a retired segment. Runs outside the table lock: a full queue
    /// blocks here while the worker needs that lock to encode.
    ///
    /// A failed hand-off leaves the segment on disk for recovery to replay,
    /// so the caller's own result stands.
    fn hand_off(&self, rotation: Option<Rotation>) {
        let Some(rotation) = rotation else {
            return;
        };
        let segment = rotation.segment;
        if let Err(err) = self.flusher.submit(rotation) {
            tracing::error!(%segment, error = %err, "could not queue retired segment for snapshot");
        }
    }
}

impl Drop for SequenceEngine {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::error!(error = %err, "failed to stop sequence engine");
        }
    }
}

impl std::fmt::Debug for SequenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceEngine")
            .field("data_dir", &self.dir.path())
            .field("projection", &self.projection)
            .field("flusher", &self.flusher)
            .finish_non_exhaustive()
    }
}
