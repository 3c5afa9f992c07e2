//! Client error types.

use std::time::Duration;

use thiserror::Error;

/// Client session errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No live connection to write on.
    #[error("Not connected")]
    NotConnected,

    /// Every attempt failed until the deadline passed.
    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The transport handshake was refused or failed.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Read or write on an established connection failed.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}
