//! CLI definitions for RelayHub.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// RelayHub CLI.
#[derive(Parser)]
#[command(name = "relayhub")]
#[command(about = "Real-time message relay hub and client")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/relayhub.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the hub in foreground until Ctrl-C
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Connect to a hub and relay stdin lines as messages
    Connect {
        /// Name announced to the hub and prefixed to every message
        #[arg(short, long)]
        identity: String,

        /// Hub host, `host:port` or full ws:// URL
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}
