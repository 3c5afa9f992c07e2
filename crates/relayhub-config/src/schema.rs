//! Configuration schema definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub notify: NotifyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hub server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Listening port; 0 picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upgrade endpoint.
    #[serde(default = "default_path")]
    pub path: String,

    /// Frames buffered per connection before it is treated as dead.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    /// Grace period for in-flight handshakes on stop.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_port(),
            path: default_path(),
            outbound_buffer: default_outbound_buffer(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_path() -> String {
    "/ws".to_string()
}

fn default_outbound_buffer() -> usize {
    32
}

fn default_shutdown_grace_ms() -> u64 {
    5_000
}

/// Client session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Port dialed when the host carries none.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Overall deadline for one connect call.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Capacity of the relay queue between the read loop and the front end.
    #[serde(default = "default_relay_capacity")]
    pub relay_capacity: usize,
}

impl ClientConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            path: default_path(),
            retry_interval_ms: default_retry_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            relay_capacity: default_relay_capacity(),
        }
    }
}

fn default_retry_interval_ms() -> u64 {
    3_000
}

fn default_connect_timeout_ms() -> u64 {
    30_000
}

fn default_relay_capacity() -> usize {
    10
}

/// Front-end notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_event")]
    pub event: String,

    #[serde(default = "default_relay_capacity")]
    pub capacity: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            event: default_event(),
            capacity: default_relay_capacity(),
        }
    }
}

fn default_event() -> String {
    "chat:update".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Also write rotating log files.
    #[serde(default = "default_true")]
    pub file: bool,

    /// Directory for rotating log files; `~` is expanded.
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: default_true(),
            dir: default_log_dir(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_dir() -> String {
    "~/.relayhub/logs".to_string()
}
