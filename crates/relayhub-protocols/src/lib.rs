//! # RelayHub Protocols
//!
//! Types and capability traits shared by the hub, the client session and the
//! control surface.
//!
//! - [`TranscriptEntry`] - one timestamped transcript line, wire shape `{time, date}`
//! - [`ConnectionId`] - identity of one live duplex connection
//! - [`NotificationSink`] / [`EventEmitter`] - the seam towards an external front end
//! - [`RelaySink`] - bounded, drop-on-full adapter between the two

pub mod connection;
pub mod error;
pub mod notify;
pub mod transcript;

pub use connection::ConnectionId;
pub use error::SinkError;
pub use notify::{DEFAULT_EVENT, EventEmitter, NotificationSink, RelaySink, TracingEmitter};
pub use transcript::{TIMESTAMP_FORMAT, TranscriptEntry};
