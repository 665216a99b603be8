// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `runlaunch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "runlaunch",
    version,
    about = "Launch, inspect and cancel runs on remote workers.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML). Defaults apply if it does not exist.
    #[arg(long, value_name = "PATH", default_value = "Runlaunch.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNLAUNCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Register a run in the store and start it on a worker.
    Launch(LaunchArgs),

    /// Ask the run's worker whether it can cancel the run.
    CanTerminate {
        run_id: String,
    },

    /// Ask the run's worker to cancel the run.
    Terminate {
        run_id: String,
    },

    /// Print a run's status, tags and events.
    Status {
        run_id: String,
    },

    /// Validate the config and print the effective settings.
    ShowConfig,
}

#[derive(Debug, Clone, Args)]
pub struct LaunchArgs {
    #[arg(long)]
    pub run_id: String,

    /// Job to execute.
    #[arg(long)]
    pub job: String,

    #[arg(long, default_value = "__repository__")]
    pub repository: String,

    /// Name of the code location served by the worker.
    #[arg(long)]
    pub location: String,

    /// Worker host; requires `--port`.
    #[arg(long, requires = "port", conflicts_with = "socket")]
    pub host: Option<String>,

    #[arg(long, requires = "host")]
    pub port: Option<u16>,

    /// Worker unix socket, instead of host/port.
    #[arg(long, value_name = "PATH", required_unless_present = "host")]
    pub socket: Option<PathBuf>,

    #[arg(long)]
    pub use_ssl: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
