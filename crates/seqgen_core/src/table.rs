//! In-memory counter table.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mapping from key to its current stored counter value.
///
/// Values never decrease: [`CounterTable::increment`] advances a key by one,
/// [`CounterTable::insert_new`] sets a key exactly once, and
/// [`CounterTable::merge_max`] (used by recovery) only raises a value.
///
/// The table itself is not synchronized; the engine serializes every access
/// behind a single lock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CounterTable {
    counters: HashMap<String, u64>,
}

impl CounterTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances `key` by one and returns the new stored value.
    ///
    /// A missing key starts at 0, so its first increment returns 1.
    ///
    /// # Errors
    ///
    /// Returns `CounterOverflow` if the key is already at `u64::MAX`; the
    /// stored value is left unchanged.
    pub fn increment(&mut self, key: &str) -> CoreResult<u64> {
        match self.counters.get_mut(key) {
            Some(value) => {
                *value = value
                    .checked_add(1)
                    .ok_or_else(|| CoreError::CounterOverflow {
                        key: key.to_string(),
                    })?;
                Ok(*value)
            }
            None => {
                self.counters.insert(key.to_string(), 1);
                Ok(1)
            }
        }
    }

    /// Registers `key` with an initial value.
    ///
    /// # Errors
    ///
    /// Returns `KeyAlreadyExists` if the key is present; the existing value
    /// is kept.
    pub fn insert_new(&mut self, key: &str, value: u64) -> CoreResult<()> {
        if self.counters.contains_key(key) {
            return Err(CoreError::key_already_exists(key));
        }
        self.counters.insert(key.to_string(), value);
        Ok(())
    }

    /// Raises `key` to `value` if it is absent or lower.
    ///
    /// Returns true if the table changed.
    pub fn merge_max(&mut self, key: &str, value: u64) -> bool {
        match self.counters.get_mut(key) {
            Some(current) if *current >= value => false,
            Some(current) => {
                *current = value;
                true
            }
            None => {
                self.counters.insert(key.to_string(), value);
                true
            }
        }
    }

    /// Returns the stored value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<u64> {
        self.counters.get(key).copied()
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Returns true if no key is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

impl FromIterator<(String, u64)> for CounterTable {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            counters: iter.into_iter().collect(),
        }
    }
}
