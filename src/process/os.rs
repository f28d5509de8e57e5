// src/process/os.rs

//! Production [`Process`] implementation backed by `tokio::process::Command`.

use std::ffi::OsStr;
use std::io::{PipeReader, PipeWriter, Read};
use std::process::{ExitStatus, Stdio};

use anyhow::anyhow;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::errors::ProcessError;
use crate::process::{
    BoxFuture, CancelToken, Captured, Input, Output, Process, ProcessResult,
};

/// One external command plus its stream slots.
///
/// Unset slots inherit the parent's streams when the process is spawned.
/// Once spawned, the command (and with it every parent-side copy of the pipe
/// ends it was given) is dropped, so downstream readers see EOF as soon as
/// the child exits.
#[derive(Debug)]
pub struct OsProcess {
    name: String,
    command: Option<Command>,
    stdin: Option<Input>,
    stdout: Option<Output>,
    stderr: Option<Output>,
    child: Option<Child>,
    status: Option<ExitStatus>,
    cancel: Option<CancelToken>,
}

enum Waited {
    Exited(std::io::Result<ExitStatus>),
    Cancelled,
}

impl OsProcess {
    /// Build a process for `program` with the given arguments.
    pub fn new<I, S>(program: impl AsRef<OsStr>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(program);
        command.args(args);
        Self::from_command(command)
    }

    /// Wrap a pre-configured command (environment, working directory, ...).
    ///
    /// Any stdio configured on `command` is replaced by the process's slots
    /// at spawn time.
    pub fn from_command(command: Command) -> Self {
        let name = command.as_std().get_program().to_string_lossy().into_owned();
        Self {
            name,
            command: Some(command),
            stdin: None,
            stdout: None,
            stderr: None,
            child: None,
            status: None,
            cancel: None,
        }
    }

    /// Observe `token`: refuse to start once cancelled and kill the child if
    /// cancellation fires while waiting.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Access the underlying command before it is spawned.
    pub fn command_mut(&mut self) -> Option<&mut Command> {
        self.command.as_mut()
    }

    /// OS process id while the child is running.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Exit status, once the process has been waited on.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.status
    }

    pub fn stdin_slot(&self) -> Option<&Input> {
        self.stdin.as_ref()
    }

    pub fn stdout_slot(&self) -> Option<&Output> {
        self.stdout.as_ref()
    }

    pub fn stderr_slot(&self) -> Option<&Output> {
        self.stderr.as_ref()
    }

    fn ensure_startable(&self) -> ProcessResult<()> {
        if self.command.is_none() {
            return Err(ProcessError::AlreadyStarted);
        }
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(ProcessError::Cancelled);
        }
        Ok(())
    }

    fn take_stdin(&mut self) -> Stdio {
        self.stdin
            .take()
            .map(Input::into_stdio)
            .unwrap_or_else(Stdio::inherit)
    }

    fn take_output(slot: &mut Option<Output>) -> ProcessResult<Stdio> {
        match slot.take() {
            Some(output) => output.to_stdio(),
            None => Ok(Stdio::inherit()),
        }
    }

    fn spawn(&mut self, stdin: Stdio, stdout: Stdio, stderr: Stdio) -> ProcessResult<()> {
        let mut command = self.command.take().ok_or(ProcessError::AlreadyStarted)?;
        command.stdin(stdin).stdout(stdout).stderr(stderr);

        let child = command.spawn().map_err(|e| {
            warn!(process = %self.name, error = %e, "failed to spawn process");
            ProcessError::Spawn(e)
        })?;
        // Release the parent's copies of the child's pipe ends.
        drop(command);

        info!(process = %self.name, pid = ?child.id(), "process started");
        self.child = Some(child);
        Ok(())
    }

    fn spawn_with_slots(&mut self) -> ProcessResult<()> {
        self.ensure_startable()?;
        let stdin = self.take_stdin();
        let stdout = Self::take_output(&mut self.stdout)?;
        let stderr = Self::take_output(&mut self.stderr)?;
        self.spawn(stdin, stdout, stderr)
    }

    /// Spawn with stdout (and, if `merge_stderr`, stderr) going to a fresh
    /// pipe; returns its read end.
    fn spawn_capturing(&mut self, merge_stderr: bool) -> ProcessResult<PipeReader> {
        if self.stdout.is_some() {
            return Err(ProcessError::AlreadySet("stdout"));
        }
        if merge_stderr && self.stderr.is_some() {
            return Err(ProcessError::AlreadySet("stderr"));
        }
        self.ensure_startable()?;

        let (reader, writer) = std::io::pipe()?;
        let stderr = if merge_stderr {
            Stdio::from(writer.try_clone()?)
        } else {
            Self::take_output(&mut self.stderr)?
        };
        let stdin = self.take_stdin();
        self.spawn(stdin, Stdio::from(writer), stderr)?;
        Ok(reader)
    }

    /// Drop every stream slot of a process that will never run, so the
    /// stages on the other end of its pipes see EOF.
    fn release_slots(&mut self) {
        if self.command.is_none() {
            return;
        }
        let held = [
            self.stdin.take().is_some(),
            self.stdout.take().is_some(),
            self.stderr.take().is_some(),
        ];
        if held.contains(&true) {
            debug!(process = %self.name, "released stream slots of unstarted process");
        }
    }

    async fn wait_child(&mut self) -> ProcessResult<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let child = self.child.as_mut().ok_or(ProcessError::NotStarted)?;

        let waited = match self.cancel.as_mut() {
            Some(token) => {
                tokio::select! {
                    biased;
                    res = child.wait() => Waited::Exited(res),
                    _ = token.cancelled() => Waited::Cancelled,
                }
            }
            None => Waited::Exited(child.wait().await),
        };

        match waited {
            Waited::Exited(res) => {
                let status = res?;
                info!(
                    process = %self.name,
                    exit_code = status.code().unwrap_or(-1),
                    success = status.success(),
                    "process exited"
                );
                self.status = Some(status);
                self.child = None;
                Ok(status)
            }
            Waited::Cancelled => {
                info!(process = %self.name, "cancellation requested; killing process");
                if let Err(e) = child.kill().await {
                    warn!(
                        process = %self.name,
                        error = %e,
                        "failed to kill child process on cancellation"
                    );
                }
                let reaped = child.wait().await;
                if let Ok(status) = reaped {
                    self.status = Some(status);
                    self.child = None;
                }
                Err(ProcessError::Cancelled)
            }
        }
    }

    /// Drain `reader` on the blocking pool while the child runs.
    async fn collect(&mut self, reader: PipeReader) -> ProcessResult<Captured> {
        let name = self.name.clone();
        let drain = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<u8>> {
            let mut reader = reader;
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes)?;
            debug!(process = %name, bytes = bytes.len(), "captured output drained");
            Ok(bytes)
        });

        let status = self.wait_child().await?;
        let bytes = drain
            .await
            .map_err(|e| anyhow!("output reader for '{}' failed: {e}", self.name))??;

        Ok(Captured { bytes, status })
    }
}

impl Process for OsProcess {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_started(&self) -> bool {
        self.child.is_some() || self.status.is_some()
    }

    fn set_stdin(&mut self, input: Input) {
        self.stdin = Some(input);
    }

    fn set_stdout(&mut self, output: Output) {
        self.stdout = Some(output);
    }

    fn set_stderr(&mut self, output: Output) {
        self.stderr = Some(output);
    }

    fn stdin_pipe(&mut self) -> ProcessResult<PipeWriter> {
        if self.stdin.is_some() {
            return Err(ProcessError::AlreadySet("stdin"));
        }
        if self.command.is_none() {
            return Err(ProcessError::AlreadyStarted);
        }
        let (reader, writer) = std::io::pipe()?;
        self.stdin = Some(Input::Reader(reader));
        Ok(writer)
    }

    fn stdout_pipe(&mut self) -> ProcessResult<PipeReader> {
        if self.stdout.is_some() {
            return Err(ProcessError::AlreadySet("stdout"));
        }
        if self.command.is_none() {
            return Err(ProcessError::AlreadyStarted);
        }
        let (reader, writer) = std::io::pipe()?;
        self.stdout = Some(Output::pipe(writer));
        Ok(reader)
    }

    fn stderr_pipe(&mut self) -> ProcessResult<PipeReader> {
        if self.stderr.is_some() {
            return Err(ProcessError::AlreadySet("stderr"));
        }
        if self.command.is_none() {
            return Err(ProcessError::AlreadyStarted);
        }
        let (reader, writer) = std::io::pipe()?;
        self.stderr = Some(Output::pipe(writer));
        Ok(reader)
    }

    fn start(&mut self) -> ProcessResult<()> {
        let res = self.spawn_with_slots();
        if res.is_err() {
            self.release_slots();
        }
        res
    }

    fn wait(&mut self) -> BoxFuture<'_, ProcessResult<ExitStatus>> {
        Box::pin(self.wait_child())
    }

    fn output(&mut self) -> BoxFuture<'_, ProcessResult<Captured>> {
        Box::pin(async move {
            let reader = self.spawn_capturing(false).inspect_err(|_| self.release_slots())?;
            self.collect(reader).await
        })
    }

    fn combined_output(&mut self) -> BoxFuture<'_, ProcessResult<Captured>> {
        Box::pin(async move {
            let reader = self.spawn_capturing(true).inspect_err(|_| self.release_slots())?;
            self.collect(reader).await
        })
    }

    fn kill(&mut self) -> ProcessResult<()> {
        if let Some(child) = self.child.as_mut() {
            debug!(process = %self.name, "killing process");
            child.start_kill()?;
        }
        Ok(())
    }
}
