//! Per-check state carried across invocations within one file.

use std::collections::HashMap;

use serde_json::Value;

/// State slot owned by the check driver for a single check.
///
/// A fresh slot is created for every file, so state never leaks between
/// files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckerState {
    values: HashMap<String, Value>,
}

impl CheckerState {
    /// Creates an empty state slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Stores `value` under `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// Removes the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Returns true when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
