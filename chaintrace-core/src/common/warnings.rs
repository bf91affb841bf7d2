//! Shared sink for non-fatal analysis warnings.

use std::sync::Mutex;

/// Thread-safe, append-only list of warning strings.
///
/// Detection runs across call sites in parallel, so every component that
/// records an anomaly goes through this sink instead of a plain `Vec`.
#[derive(Debug, Default)]
pub struct Warnings {
    entries: Mutex<Vec<String>>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning.
    pub fn push(&self, message: impl Into<String>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(message.into());
    }

    /// Copies the warnings recorded so far.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// True if any recorded warning starts with `prefix`.
    pub fn any_starts_with(&self, prefix: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|w| w.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.entries.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl From<Vec<String>> for Warnings {
    fn from(entries: Vec<String>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}
