//! Core type definitions.

use std::fmt;

/// Number of a write log segment.
///
/// Segment numbers start at 1, increase by one on every rotation and are
/// never reused within a process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(pub u64);

impl SegmentId {
    /// The first segment opened after recovery.
    pub const FIRST: Self = Self(1);

    /// Creates a new segment ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the segment that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log_{}", self.0)
    }
}

/// Maps a stored counter value to the externally visible sequence value.
///
/// `returned = offset + stored * increment`. Values past `u64::MAX` have no
/// projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    increment: u64,
    offset: u64,
}

impl Projection {
    /// Creates a projection.
    #[must_use]
    pub const fn new(increment: u64, offset: u64) -> Self {
        Self { increment, offset }
    }

    /// Returns the increment.
    #[must_use]
    pub const fn increment(self) -> u64 {
        self.increment
    }

    /// Returns the offset.
    #[must_use]
    pub const fn offset(self) -> u64 {
        self.offset
    }

    /// Projects a stored counter value, or returns `None` if the result
    /// does not fit in a `u64`.
    #[must_use]
    pub const fn try_apply(self, stored: u64) -> Option<u64> {
        match stored.checked_mul(self.increment) {
            Some(scaled) => self.offset.checked_add(scaled),
            None => None,
        }
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::new(1, 0)
    }
}
