//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Telegram signal bot mirroring futures trades onto subscriber accounts
#[derive(Parser, Debug)]
#[command(name = "signalbot")]
#[command(version)]
pub struct Cli {
    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Defaults to `run` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bot (HTTP server and Telegram updates)
    Run(RunArgs),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),

    /// Print a fresh ENCRYPTION_KEY value
    Keygen,
}

/// Subcommands for `signalbot check`.
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate configuration from the file and environment.
    Config(ConfigPathArg),
    /// Probe the health endpoint of a running instance.
    Health(HealthArgs),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to the configuration file (optional; env alone is enough).
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the configuration file (optional; env alone is enough).
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            config: PathBuf::from("config.toml"),
            json_logs: false,
        }
    }
}

/// Arguments for `check health`.
#[derive(Parser, Debug)]
pub struct HealthArgs {
    /// Health endpoint to probe
    #[arg(long, default_value = "http://127.0.0.1:8000/health")]
    pub url: String,

    /// Probe timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,
}
