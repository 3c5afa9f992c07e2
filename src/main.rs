//! RelayHub - real-time message relay
//!
//! Main entry point for the hub server and the terminal client.

mod cli;
mod emitter;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use relayhub_api::{ClientControl, HubControl, STATUS_OK};
use relayhub_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};

use crate::cli::{Cli, Commands};
use crate::emitter::TerminalEmitter;

/// Initialize tracing with console and optional rolling file output.
///
/// Log files go to `logging.dir` (default ~/.relayhub/logs/) with daily
/// rotation.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = if logging.file {
        let log_dir = PathBuf::from(ConfigLoader::expand_path(&logging.dir));
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("creating log directory {}", log_dir.display()))?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("relayhub")
            .filename_suffix("log")
            .max_log_files(14)
            .build(&log_dir)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // Keep the writer alive for the whole process
        static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
            std::sync::OnceLock::new();
        let _ = GUARD.set(guard);

        Some(fmt::layer().with_writer(non_blocking).with_ansi(false).boxed())
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(file_layer)
        .init();

    Ok(())
}

/// Log validation findings and reject configurations with errors.
fn validate_config(config: &Config, path: &Path) -> anyhow::Result<()> {
    let result = ConfigValidator::validate(config);
    for err in &result.errors {
        error!("Config {}: {}", err.path, err.message);
    }

    let warnings = result
        .into_result()
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    for warning in &warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    init_tracing(&config.logging)?;
    validate_config(&config, &cli.config)?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Commands::Connect { identity, host } => connect(config, identity, host).await,
    }
}

/// Run the hub until Ctrl-C.
async fn serve(config: Config) -> anyhow::Result<()> {
    info!("Starting RelayHub v{}", env!("CARGO_PKG_VERSION"));

    let control = HubControl::new(&config, Arc::new(TerminalEmitter));
    if control.start().await != STATUS_OK {
        bail!("hub failed to start on {}", config.server.address());
    }

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, shutting down");

    if control.stop().await != STATUS_OK {
        bail!("hub did not shut down cleanly");
    }
    Ok(())
}

/// Connect to a hub and send each stdin line until EOF or Ctrl-C.
async fn connect(config: Config, identity: String, host: String) -> anyhow::Result<()> {
    let control = ClientControl::new(&config, Arc::new(TerminalEmitter));
    if control.connect(&identity, &host).await != STATUS_OK {
        bail!("could not connect to {}", host);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => control.send(&identity, &line).await,
                None => break,
            },
        }
    }

    control.session().disconnect().await;
    Ok(())
}
