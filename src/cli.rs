// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `pipechain`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipechain",
    version,
    about = "Run a linear pipeline of commands without a shell.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to a pipeline file (TOML).
    ///
    /// Ignored when stages are given on the command line.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// How to run the pipeline.
    #[arg(long, value_enum, default_value = "stream")]
    pub mode: RunMode,

    /// What to do when a non-terminal stage fails to start.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub launch_failure: Option<LaunchFailureArg>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPECHAIN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the stages, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Stages, separated by a literal `|` argument, e.g.
    /// `pipechain -- echo hello '|' tr a-z A-Z`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "STAGES")]
    pub stages: Vec<String>,
}

/// Run mode as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Let the last stage write straight to the terminal.
    Stream,
    /// Capture the last stage's stdout and print it.
    Output,
    /// Capture the last stage's stdout and stderr together and print them.
    Combined,
}

/// Launch failure policy as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LaunchFailureArg {
    Abort,
    Lenient,
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
