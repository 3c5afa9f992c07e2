//! # RelayHub API
//!
//! Control surface handed to an external front end. Every call reports a
//! numeric status instead of an error type: [`STATUS_OK`] or
//! [`STATUS_FAILED`]. Details go to the log.

mod control;

pub use control::{ClientControl, HubControl, STATUS_FAILED, STATUS_OK};
