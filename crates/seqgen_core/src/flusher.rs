//! Background snapshot worker for retired segments.
//!
//! Rotation hands each retired segment to a single worker thread through a
//! bounded queue. For every segment, in FIFO order, the worker writes a
//! snapshot of the current table and deletes the segment only if the
//! snapshot succeeded. One consumer means snapshots are written serially.
//!
//! A full queue blocks the rotating caller until the worker drains a slot.
//! That backpressure is the intended degradation mode when the disk stalls.

use crate::dir::DataDir;
use crate::error::{CoreError, CoreResult};
use crate::snapshot::SnapshotWriter;
use crate::wal::Rotation;
use parking_lot::Mutex;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Produces the bytes of a snapshot of the live table.
///
/// Implementors take whatever lock guards the table for the duration of the
/// encoding and release it before returning.
pub trait SnapshotSource: Send + Sync + 'static {
    /// Encodes the current table.
    fn encode_snapshot(&self) -> CoreResult<Vec<u8>>;
}

/// Owns the flush worker thread and the producer side of its queue.
pub struct FlushCoordinator {
    sender: Mutex<Option<SyncSender<Rotation>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl FlushCoordinator {
    /// Spawns the worker with a queue of `capacity` retired segments.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn start<S: SnapshotSource>(
        source: Arc<S>,
        snapshots: Arc<SnapshotWriter>,
        dir: Arc<DataDir>,
        capacity: usize,
    ) -> CoreResult<Self> {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));

        let worker = thread::Builder::new()
            .name("seqgen-flush".into())
            .spawn(move || worker_loop(&receiver, &*source, &snapshots, &dir))?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queues a retired segment, blocking while the queue is full.
    ///
    /// Must not be called while holding the lock the [`SnapshotSource`]
    /// takes, or a full queue deadlocks against the worker.
    ///
    /// # Errors
    ///
    /// Returns `FlushQueueClosed` after [`FlushCoordinator::shutdown`] or if
    /// the worker has died.
    pub fn submit(&self, rotation: Rotation) -> CoreResult<()> {
        let sender = self
            .sender
            .lock()
            .clone()
            .ok_or(CoreError::FlushQueueClosed)?;

        sender.send(rotation).map_err(|mpsc::SendError(rotation)| {
            tracing::error!(segment = %rotation.segment, "flush worker is gone, segment kept for recovery");
            CoreError::FlushQueueClosed
        })
    }

    /// Closes the queue and waits for the worker to finish what is queued.
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        drop(self.sender.lock().take());

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::error!("flush worker panicked");
            }
        }
    }
}

impl Drop for FlushCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for FlushCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushCoordinator")
            .field("running", &self.worker.lock().is_some())
            .finish()
    }
}

fn worker_loop(
    receiver: &Receiver<Rotation>,
    source: &dyn SnapshotSource,
    snapshots: &SnapshotWriter,
    dir: &DataDir,
) {
    for rotation in receiver {
        tracing::info!(path = %rotation.path.display(), "rotate");

        let saved = source
            .encode_snapshot()
            .and_then(|encoded| snapshots.save_encoded(&encoded));

        match saved {
            Ok(()) => {
                if let Err(err) = dir.remove_segment(&rotation.path) {
                    tracing::warn!(path = %rotation.path.display(), error = %err, "failed to delete flushed segment");
                }
            }
            Err(err) => {
                tracing::error!(
                    path = %rotation.path.display(),
                    error = %err,
                    "snapshot failed, keeping segment"
                );
            }
        }
    }
    tracing::debug!("flush worker stopped");
}
