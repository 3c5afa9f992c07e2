//! # RelayHub Client
//!
//! Peer side of the relay. A [`ClientSession`] keeps at most one connection
//! to a hub, retries the handshake on a fixed interval up to a deadline, and
//! relays every received transcript snapshot to an
//! [`EventEmitter`](relayhub_protocols::EventEmitter) through a bounded queue.

mod error;
mod session;

pub use error::ClientError;
pub use session::{ClientSession, ClientSessionState, endpoint_url};
