//! Hub error types.

use std::time::Duration;

use thiserror::Error;

/// Hub and server errors.
#[derive(Debug, Error)]
pub enum HubError {
    /// The listening endpoint could not be bound.
    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    /// The configured upgrade path is not routable.
    #[error("Invalid endpoint path: {0}")]
    InvalidPath(String),

    /// Transcript encoding failed; the broadcast cycle is skipped.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The server did not finish within the grace period and was aborted.
    #[error("Shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),
}

/// Why a frame could not be queued for one recipient.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Outbound buffer full; the recipient is treated as dead.
    #[error("Outbound buffer full")]
    Full,

    /// The connection's writer is gone.
    #[error("Connection closed")]
    Closed,
}
