//! # Seqgen Core
//!
//! Durable monotonic sequence engine.
//!
//! This crate provides:
//! - An in-memory counter table mapping keys to stored values
//! - A segmented text write log for durability
//! - Atomic CBOR snapshots of the whole table
//! - A background flush worker that snapshots and deletes retired segments
//! - Startup recovery from the snapshot plus any leftover segments
//!
//! ## On-disk Layout
//!
//! ```text
//! <data_dir>/
//!   LOCK            advisory lock, one engine per directory
//!   data.cbor       canonical snapshot
//!   snapshot.cbor   checkpoint written on graceful stop
//!   logs/
//!     log_1.log     write log segments
//!     log_2.log
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use seqgen_core::{Config, SequenceEngine};
//!
//! let engine = SequenceEngine::start(Config::new("/var/sequence-generator/", "/tmp"))?;
//! engine.add("invoices", 1000)?;
//! assert_eq!(engine.get("invoices")?, 1001);
//! # Ok::<(), seqgen_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod dir;
mod engine;
mod error;
mod flusher;
mod recovery;
mod snapshot;
mod table;
mod types;
mod wal;

pub use config::{Config, DEFAULT_FLUSH_QUEUE_CAPACITY, DEFAULT_MAX_LOG_RECORDS};
pub use dir::{segment_number, DataDir};
pub use engine::SequenceEngine;
pub use error::{CoreError, CoreResult};
pub use flusher::{FlushCoordinator, SnapshotSource};
pub use recovery::{recover, replay_reader, Recovered, RecoveryReport};
pub use snapshot::{decode_table, encode_table, SnapshotWriter};
pub use table::CounterTable;
pub use types::{Projection, SegmentId};
pub use wal::{validate_key, LogRecord, LogWriter, Rotation};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
