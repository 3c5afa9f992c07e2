//! Notification error types.

use thiserror::Error;

/// Why a snapshot could not be queued for the front end.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    /// The relay queue is at capacity; the update is dropped.
    #[error("Relay queue full, update dropped")]
    Full,

    /// The consumer side of the relay queue is gone.
    #[error("Relay queue closed")]
    Closed,
}
