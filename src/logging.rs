// src/logging.rs

//! Logging setup for `pipechain` using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. the `--log-level` flag,
//! 2. `PIPECHAIN_LOG`, either a bare level (`debug`) or full `EnvFilter`
//!    directives (`warn,pipechain::chain=trace`),
//! 3. `warn`.
//!
//! Logs go to stderr; stdout belongs to the pipeline.

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` is given.
pub const LOG_ENV: &str = "PIPECHAIN_LOG";

const DEFAULT_LEVEL: Level = Level::WARN;

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(cli_level, env.as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))
}

/// Resolve the filter from the CLI level and the raw `PIPECHAIN_LOG` value.
///
/// Unparseable directives fall back to the default level rather than
/// silencing everything.
pub fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(lvl) = cli_level {
        return level_filter(level_from_log_level(lvl));
    }

    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(spec) => match parse_level_str(spec) {
            Some(level) => level_filter(level),
            None => EnvFilter::try_new(spec).unwrap_or_else(|_| level_filter(DEFAULT_LEVEL)),
        },
        None => level_filter(DEFAULT_LEVEL),
    }
}

fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::new(level.as_str().to_ascii_lowercase())
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

pub fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
