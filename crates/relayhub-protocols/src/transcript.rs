//! Transcript entry definitions.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Timestamp layout used on the wire, millisecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// One line of the shared transcript.
///
/// Serialized as `{"time": "...", "date": "..."}`: the `date` key carries the
/// message payload, which is the shape every connected peer expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Wall-clock time of the append, formatted with [`TIMESTAMP_FORMAT`].
    #[serde(rename = "time")]
    pub timestamp: String,
    /// Message payload, verbatim.
    #[serde(rename = "date")]
    pub payload: String,
}

impl TranscriptEntry {
    /// Create an entry from an already formatted timestamp.
    pub fn new(timestamp: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            payload: payload.into(),
        }
    }

    /// Create an entry stamped with the given instant.
    pub fn stamped(at: DateTime<Local>, payload: impl Into<String>) -> Self {
        Self::new(at.format(TIMESTAMP_FORMAT).to_string(), payload)
    }
}
