//! Per-step test results: test name -> 0/1.
//!
//! Names are unique keys. Writing a name that already exists overwrites its
//! value in place (last write wins, first position kept).

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::core::coerce::display;

pub const POLLED_PASS_PREFIX: &str = "[Polled] [PASS] ";
pub const POLLED_FAIL_PREFIX: &str = "[Polled] [FAIL] ";

/// How results are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMode {
    /// The stored value is the outcome.
    Direct,
    /// The outcome is encoded in the name and the entry is marked executed
    /// (1), so a poll loop's intermediate failures do not fail the run.
    Polled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: IndexMap<String, u8>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `name` verbatim, bypassing the record mode.
    pub fn set(&mut self, name: impl Into<String>, value: u8) {
        self.entries.insert(name.into(), value);
    }

    /// Record an outcome under `base` (+ rendered `value`) and return the key
    /// that was written.
    ///
    /// In polled mode a failure is stored as 1 unless `poll_override` is set,
    /// in which case it is stored as 0 so the entry fails honestly.
    pub fn record(
        &mut self,
        mode: RecordMode,
        base: &str,
        passed: bool,
        value: Option<&Value>,
        poll_override: bool,
    ) -> String {
        let name = match value {
            Some(value) => format!("{base}{}", display(value)),
            None => base.to_string(),
        };
        let key = match (mode, passed) {
            (RecordMode::Direct, _) => name,
            (RecordMode::Polled, true) => format!("{POLLED_PASS_PREFIX}{name}"),
            (RecordMode::Polled, false) => format!("{POLLED_FAIL_PREFIX}{name}"),
        };
        let stored = match (mode, passed) {
            (RecordMode::Direct, passed) => u8::from(passed),
            (RecordMode::Polled, true) => 1,
            (RecordMode::Polled, false) => u8::from(!poll_override),
        };
        self.entries.insert(key.clone(), stored);
        key
    }

    pub fn get(&self, name: &str) -> Option<u8> {
        self.entries.get(name).copied()
    }

    /// True unless some entry is 0 or carries the polled failure marker.
    pub fn all_passed(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Names of the entries that count as failures for [`Ledger::all_passed`].
    pub fn failures(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(name, value)| name.starts_with(POLLED_FAIL_PREFIX) || **value == 0)
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
