//! Write log record text format.

use crate::error::{CoreError, CoreResult};
use std::io::Write;

/// A single write log record: "as of this point, `key` is at least `value`".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Counter key.
    pub key: String,
    /// Stored (unprojected) value.
    pub value: u64,
}

impl LogRecord {
    /// Creates a record.
    pub fn new(key: impl Into<String>, value: u64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Writes `"<key> <value>\n"` for a key/value pair.
    ///
    /// The line is formatted into a single buffer first so it reaches the
    /// writer in one `write_all` call.
    pub fn write_line<W: Write>(writer: &mut W, key: &str, value: u64) -> std::io::Result<()> {
        let mut line = Vec::with_capacity(key.len() + 22);
        line.extend_from_slice(key.as_bytes());
        line.push(b' ');
        line.extend_from_slice(value.to_string().as_bytes());
        line.push(b'\n');
        writer.write_all(&line)
    }

    /// Encodes the record as a line, including the trailing newline.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{} {}\n", self.key, self.value)
    }

    /// Parses one line (without its newline).
    ///
    /// Returns `None` for anything other than exactly a valid key, one space,
    /// and an unsigned decimal that fits in 64 bits.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let (key, value) = line.split_once(' ')?;
        if !is_valid_key(key) || value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let value = value.parse().ok()?;
        Some(Self::new(key, value))
    }
}

/// Checks that a key can be stored in the line format.
///
/// # Errors
///
/// Returns `InvalidKey` for an empty key or one containing whitespace.
pub fn validate_key(key: &str) -> CoreResult<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(CoreError::invalid_key(key))
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.chars().any(char::is_whitespace)
}
