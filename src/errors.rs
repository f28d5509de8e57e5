// src/errors.rs

//! Crate-wide error types.
//!
//! - [`ProcessError`] is what a single [`Process`](crate::process::Process)
//!   reports.
//! - [`PipechainError`] is what the chain hands back to callers. Every
//!   stage-level variant carries the stage index and command name.

use std::process::ExitStatus;

use thiserror::Error;

use crate::types::ChainPhase;

/// Failure reported by the process collaborator for a single stage.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to spawn: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} already set")]
    AlreadySet(&'static str),

    #[error("process already started")]
    AlreadyStarted,

    #[error("process not started")]
    NotStarted,

    #[error("{0}")]
    Exit(ExitStatus),

    #[error("process cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum PipechainError {
    #[error("unable to pipe command #{index} ({name}): {source}")]
    Link {
        index: usize,
        name: String,
        #[source]
        source: ProcessError,
    },

    #[error("unable to start command #{index} ({name}): {source}")]
    Launch {
        index: usize,
        name: String,
        #[source]
        source: ProcessError,
    },

    #[error("command #{index} ({name}) failed: {source}")]
    Terminal {
        index: usize,
        name: String,
        #[source]
        source: ProcessError,
        /// Bytes captured before the failure (empty unless the terminal stage
        /// ran to completion with a non-zero exit).
        output: Vec<u8>,
    },

    #[error("unable to wait for process #{index} ({name}): {source}")]
    Wait {
        index: usize,
        name: String,
        #[source]
        source: ProcessError,
    },

    #[error("chain is {actual:?}; operation requires {expected:?}")]
    InvalidPhase {
        expected: ChainPhase,
        actual: ChainPhase,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipechainError {
    /// Index of the stage the error belongs to, if any.
    pub fn stage_index(&self) -> Option<usize> {
        match self {
            PipechainError::Link { index, .. }
            | PipechainError::Launch { index, .. }
            | PipechainError::Terminal { index, .. }
            | PipechainError::Wait { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Command name of the stage the error belongs to, if any.
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            PipechainError::Link { name, .. }
            | PipechainError::Launch { name, .. }
            | PipechainError::Terminal { name, .. }
            | PipechainError::Wait { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Output the terminal stage produced before failing.
    pub fn captured_output(&self) -> Option<&[u8]> {
        match self {
            PipechainError::Terminal { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Exit status behind a stage failure, when the failure was a non-zero exit.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        match self {
            PipechainError::Launch { source, .. }
            | PipechainError::Terminal { source, .. }
            | PipechainError::Wait { source, .. } => match source {
                ProcessError::Exit(status) => Some(*status),
                _ => None,
            },
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipechainError>;
