//! Append-only transcript store.

use chrono::{DateTime, Local};
use parking_lot::RwLock;

use relayhub_protocols::TranscriptEntry;

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;

/// Ordered, timestamped log of every relayed message.
///
/// Appends take the write lock, so they are serialized and timestamps never
/// go backwards within the sequence. Snapshots take the read lock and always
/// see whole entries.
#[derive(Debug, Default)]
pub struct TranscriptStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<TranscriptEntry>,
    last: Option<DateTime<Local>>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a payload stamped with the current wall-clock time.
    pub fn append(&self, payload: impl Into<String>) -> TranscriptEntry {
        self.append_at(Local::now(), payload)
    }

    /// Append a payload stamped with `at`, or with the previous entry's
    /// instant if `at` is earlier.
    fn append_at(&self, at: DateTime<Local>, payload: impl Into<String>) -> TranscriptEntry {
        let mut inner = self.inner.write();
        let at = match inner.last {
            Some(last) if at < last => last,
            _ => at,
        };
        let entry = TranscriptEntry::stamped(at, payload);
        inner.last = Some(at);
        inner.entries.push(entry.clone());
        entry
    }

    /// Serialize the whole transcript as a JSON array, in append order.
    pub fn snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.inner.read().entries)
    }

    /// Copy of the current entries.
    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.inner.read().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}
