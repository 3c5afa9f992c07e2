//! # RelayHub Hub
//!
//! Process-side half of the relay.
//!
//! - [`TranscriptStore`] keeps the append-only, timestamped transcript
//! - [`ConnectionRegistry`] tracks live connections and hands out snapshots
//! - [`BroadcastHub`] appends each inbound message and fans the serialized
//!   transcript out to every live connection
//! - [`InboundSession`] drives one accepted WebSocket connection
//! - [`HubServer`] owns the axum listener and its start/stop lifecycle
//!
//! ## Usage
//!
//! ```ignore
//! use relayhub_config::ServerConfig;
//! use relayhub_hub::{BroadcastHub, HubServer};
//!
//! let server = HubServer::new(ServerConfig::default(), Arc::new(BroadcastHub::new()));
//! let addr = server.start().await?;
//! ```

mod error;
mod hub;
mod registry;
mod server;
mod session;
mod transcript;

pub use error::{DeliveryError, HubError};
pub use hub::{BroadcastHub, BroadcastReport};
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use server::{HubServer, create_router};
pub use session::{InboundSession, SessionPhase};
pub use transcript::TranscriptStore;
