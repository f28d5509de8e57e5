// src/process/mod.rs

//! Process collaborator.
//!
//! The chain never spawns anything itself. It talks to a [`Process`] instead,
//! which owns one external command and its three stream slots. This keeps the
//! orchestration logic in [`crate::chain`] independent of how processes are
//! actually run, and lets tests substitute a fake.
//!
//! - [`os`] provides [`OsProcess`], the production implementation on top of
//!   `tokio::process::Command`.
//! - [`stream`] defines the slot types ([`Input`], [`Output`], [`StagePipe`]).
//! - [`cancel`] provides a shared cancellation signal for stages.

use std::future::Future;
use std::io::{PipeReader, PipeWriter};
use std::pin::Pin;
use std::process::ExitStatus;

use crate::errors::ProcessError;

pub mod cancel;
pub mod os;
pub mod stream;

pub use cancel::{CancelSource, CancelToken, cancel_pair};
pub use os::OsProcess;
pub use stream::{Input, Output, StagePipe};

/// Boxed future returned by the async [`Process`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result type for collaborator calls.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

/// Bytes captured from a process run together with how it exited.
#[derive(Debug, Clone)]
pub struct Captured {
    pub bytes: Vec<u8>,
    pub status: ExitStatus,
}

/// A single external command the chain can wire up and run.
///
/// Slot setters overwrite whatever was assigned before. The `*_pipe` methods
/// must be called before [`Process::start`]; they fail if the slot was
/// already assigned.
pub trait Process: Send {
    /// Human-readable identifier used in errors and logs.
    fn name(&self) -> &str;

    /// True once the process has been spawned.
    fn is_started(&self) -> bool;

    fn set_stdin(&mut self, input: Input);
    fn set_stdout(&mut self, output: Output);
    fn set_stderr(&mut self, output: Output);

    /// Writable end feeding the process's stdin.
    fn stdin_pipe(&mut self) -> ProcessResult<PipeWriter>;

    /// Readable end yielding the process's stdout as it is produced.
    ///
    /// The chain uses this to connect a stage to the next one.
    fn stdout_pipe(&mut self) -> ProcessResult<PipeReader>;

    /// Readable end yielding the process's stderr.
    fn stderr_pipe(&mut self) -> ProcessResult<PipeReader>;

    /// Spawn the process without waiting for it.
    fn start(&mut self) -> ProcessResult<()>;

    /// Wait for a started process to exit.
    ///
    /// A non-zero exit is reported through the returned status, not as an
    /// error; the caller decides what counts as failure.
    fn wait(&mut self) -> BoxFuture<'_, ProcessResult<ExitStatus>>;

    /// Spawn the process, capture its stdout and wait for it.
    fn output(&mut self) -> BoxFuture<'_, ProcessResult<Captured>>;

    /// Spawn the process, capture stdout and stderr interleaved into a single
    /// buffer and wait for it.
    fn combined_output(&mut self) -> BoxFuture<'_, ProcessResult<Captured>>;

    /// Ask a started process to terminate. No-op if it has not been started
    /// or has already been reaped.
    fn kill(&mut self) -> ProcessResult<()>;
}
