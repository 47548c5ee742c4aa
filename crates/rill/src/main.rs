//! Rill - interactive console for the rill message bus
//!
//! # Usage
//!
//! ```bash
//! # Interactive console (default)
//! rill
//! rill --socket /run/rill/bus.sock
//!
//! # One-shot commands for scripting
//! rill list elements
//! rill logs --window 60 camera robot
//! rill command robot wave
//! rill read camera:frames --rate 2
//! ```

mod cmd;
mod output;
#[cfg(test)]
mod testutil;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rill_bus::BusClient;
use rill_config::Config;
use tracing_subscriber::EnvFilter;

/// Config file looked up when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "rill.toml";

/// Rill - interactive console for the rill message bus
#[derive(Parser, Debug)]
#[command(name = "rill")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Bus socket path. Overrides config file.
    #[arg(short, long, global = true)]
    socket: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive console (default when no subcommand is given)
    Console,

    /// Enumerate elements, streams, or an element's commands
    List(cmd::list::ListArgs),

    /// Query the shared log stream
    Logs(cmd::logs::LogsArgs),

    /// Send a command to an element and print its response
    #[command(name = "command")]
    Send(cmd::command::CommandArgs),

    /// Follow the newest entry of a stream
    Read(cmd::read::ReadArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(&resolve_log_level(cli.log_level.as_deref(), &config))?;

    let socket = cli
        .socket
        .clone()
        .unwrap_or_else(|| config.bus.socket.clone());
    let client = BusClient::connect_with_timeout(
        &socket,
        Duration::from_millis(config.command.timeout_ms),
    )
    .await
    .with_context(|| format!("failed to connect to bus at {}", socket.display()))?;

    tracing::debug!(socket = %socket.display(), "connected to bus");

    let ctx = cmd::Ctx {
        client,
        default_rate: config.read.rate,
    };

    match cli.command {
        None | Some(Command::Console) => cmd::console::run(&ctx).await,
        Some(Command::List(args)) => cmd::list::run(&ctx, args.mode).await,
        Some(Command::Logs(args)) => {
            let elements = args.elements.iter().cloned().collect();
            cmd::logs::run(&ctx, args.window, &elements).await
        }
        Some(Command::Send(args)) => {
            cmd::command::run(&ctx, &args.element, &args.command, args.payload.as_deref()).await
        }
        Some(Command::Read(args)) => cmd::read::run(&ctx, &args.target, args.rate).await,
    }
}

/// Load config: explicit path must exist; otherwise `rill.toml` if present
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            Config::from_file(path).with_context(|| format!("config file {}", path.display()))
        }
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                Config::from_file(default).context("config file rill.toml")
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// Resolve log level: CLI flag > config file > default "info"
fn resolve_log_level(cli_level: Option<&str>, config: &Config) -> String {
    match cli_level {
        Some(level) => level.to_string(),
        None => config.log.level.as_str().to_string(),
    }
}

/// Initialize the tracing subscriber for logging
///
/// Diagnostics go to stderr so console output stays clean.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .init();

    Ok(())
}
