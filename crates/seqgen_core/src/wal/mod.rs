//! Write log for durability and crash recovery.
//!
//! Every mutation of the counter table appends one text record to the
//! active segment before the call returns. Segments are rotated after a
//! fixed number of records; a retired segment is deleted once a snapshot
//! that covers it has been written.
//!
//! ## Record Format
//!
//! ```text
//! <key> <value>\n
//! ```
//!
//! One ASCII space, an unsigned decimal, a newline, nothing else. The format
//! must stay byte-compatible with existing segment files.
//!
//! ## Recovery Policy
//!
//! Replay is best-effort per line:
//!
//! - A line that does not parse (including a torn last line after a crash
//!   mid-append) is skipped and counted, never fatal.
//! - Each parsed record raises the key to at least its value. Segments may
//!   be replayed in any order because merging takes the maximum.
//!
//! ## Invariants
//!
//! - Segments are **append-only** and never exceed the rotation threshold
//! - Record order within a segment matches table mutation order
//! - A retired segment is deleted only after a successful snapshot

mod record;
mod writer;

pub use record::{validate_key, LogRecord};
pub use writer::{LogWriter, Rotation};
