//! Debounce ledger
//!
//! Maps each local path to the modification time most recently confirmed
//! uploaded by the change monitor. A single logical write often produces
//! several modify events; consulting the ledger lets all but the first one
//! be suppressed. The ledger lives in memory only and starts empty.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use drivemirror_core::domain::Timestamp;

/// Per-path record of the last uploaded modification time
#[derive(Debug, Default)]
pub struct DebounceLedger {
    entries: HashMap<PathBuf, Timestamp>,
}

impl DebounceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `path` has no entry or `current` is strictly newer than it
    pub fn should_upload(&self, path: &Path, current: Timestamp) -> bool {
        match self.entries.get(path) {
            Some(recorded) => current > *recorded,
            None => true,
        }
    }

    /// Records a confirmed upload of `path` at modification time `ts`
    pub fn record(&mut self, path: &Path, ts: Timestamp) {
        self.entries.insert(path.to_path_buf(), ts);
    }

    pub fn last_uploaded(&self, path: &Path) -> Option<Timestamp> {
        self.entries.get(path).copied()
    }

    /// Drops the entry for `path`, returning it if one existed
    pub fn forget(&mut self, path: &Path) -> Option<Timestamp> {
        self.entries.remove(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
