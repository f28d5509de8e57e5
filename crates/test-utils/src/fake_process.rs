use std::io::{PipeReader, PipeWriter};
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use pipechain::errors::ProcessError;
use pipechain::process::{BoxFuture, Captured, Input, Output, Process, ProcessResult};

/// What happened to which fake process, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeEvent {
    Piped(String),
    Started(String),
    Ran(String),
    Waited(String),
    Killed(String),
}

/// Journal shared by every fake in a test.
pub type Journal = Arc<Mutex<Vec<FakeEvent>>>;

pub fn new_journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// Build an `ExitStatus` carrying `code`.
pub fn exit_status(code: i32) -> ExitStatus {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(code << 8)
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::ExitStatusExt;
        ExitStatus::from_raw(code as u32)
    }
}

/// A process that never spawns anything.
///
/// - records slot assignments so tests can inspect the wiring
/// - hands out real (but unused) OS pipes from the `*_pipe` methods
/// - fails on demand at pipe, start or wait time
/// - logs every lifecycle call into a shared [`Journal`]
#[derive(Debug)]
pub struct FakeProcess {
    name: String,
    journal: Journal,
    stdin: Option<Input>,
    stdout: Option<Output>,
    stderr: Option<Output>,
    started: bool,
    completed: bool,
    /// Remaining `*_pipe` calls that fail.
    pipe_failures: u32,
    fail_start: bool,
    fail_wait: bool,
    exit_code: i32,
    output: Vec<u8>,
    #[cfg(unix)]
    stdout_reader_fd: Option<std::os::fd::RawFd>,
}

impl FakeProcess {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: Arc::clone(journal),
            stdin: None,
            stdout: None,
            stderr: None,
            started: false,
            completed: false,
            pipe_failures: 0,
            fail_start: false,
            fail_wait: false,
            exit_code: 0,
            output: Vec::new(),
            #[cfg(unix)]
            stdout_reader_fd: None,
        }
    }

    pub fn fail_pipe(mut self) -> Self {
        self.pipe_failures = u32::MAX;
        self
    }

    /// Fail only the next pipe request, e.g. a transient descriptor shortage.
    pub fn fail_next_pipe(mut self) -> Self {
        self.pipe_failures = 1;
        self
    }

    pub fn fail_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn fail_wait(mut self) -> Self {
        self.fail_wait = true;
        self
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Bytes returned from `output` / `combined_output`.
    pub fn output(mut self, bytes: &[u8]) -> Self {
        self.output = bytes.to_vec();
        self
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

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Raw descriptor of the read end handed out by `stdout_pipe`.
    #[cfg(unix)]
    pub fn stdout_reader_fd(&self) -> Option<std::os::fd::RawFd> {
        self.stdout_reader_fd
    }

    fn record(&self, event: FakeEvent) {
        self.journal.lock().unwrap().push(event);
    }

    fn check_pipe(&mut self, slot_set: bool, slot: &'static str) -> ProcessResult<()> {
        if self.pipe_failures > 0 {
            self.pipe_failures -= 1;
            return Err(ProcessError::Other(anyhow!("scripted pipe failure")));
        }
        if slot_set {
            return Err(ProcessError::AlreadySet(slot));
        }
        if self.started {
            return Err(ProcessError::AlreadyStarted);
        }
        Ok(())
    }

    fn run(&mut self) -> ProcessResult<Captured> {
        if self.fail_start {
            return Err(ProcessError::Spawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "scripted start failure",
            )));
        }
        if self.started {
            return Err(ProcessError::AlreadyStarted);
        }
        self.started = true;
        self.completed = true;
        self.record(FakeEvent::Ran(self.name.clone()));
        Ok(Captured {
            bytes: self.output.clone(),
            status: exit_status(self.exit_code),
        })
    }
}

impl Process for FakeProcess {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_started(&self) -> bool {
        self.started
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
        self.check_pipe(self.stdin.is_some(), "stdin")?;
        let (reader, writer) = std::io::pipe()?;
        self.stdin = Some(Input::Reader(reader));
        Ok(writer)
    }

    fn stdout_pipe(&mut self) -> ProcessResult<PipeReader> {
        self.check_pipe(self.stdout.is_some(), "stdout")?;
        let (reader, writer) = std::io::pipe()?;
        self.stdout = Some(Output::pipe(writer));
        #[cfg(unix)]
        {
            use std::os::fd::AsRawFd;
            self.stdout_reader_fd = Some(reader.as_raw_fd());
        }
        self.record(FakeEvent::Piped(self.name.clone()));
        Ok(reader)
    }

    fn stderr_pipe(&mut self) -> ProcessResult<PipeReader> {
        self.check_pipe(self.stderr.is_some(), "stderr")?;
        let (reader, writer) = std::io::pipe()?;
        self.stderr = Some(Output::pipe(writer));
        Ok(reader)
    }

    fn start(&mut self) -> ProcessResult<()> {
        if self.fail_start {
            return Err(ProcessError::Spawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "scripted start failure",
            )));
        }
        if self.started {
            return Err(ProcessError::AlreadyStarted);
        }
        self.started = true;
        self.record(FakeEvent::Started(self.name.clone()));
        Ok(())
    }

    fn wait(&mut self) -> BoxFuture<'_, ProcessResult<ExitStatus>> {
        Box::pin(async move {
            if !self.started {
                return Err(ProcessError::NotStarted);
            }
            if self.fail_wait {
                return Err(ProcessError::Other(anyhow!("scripted wait failure")));
            }
            self.completed = true;
            self.record(FakeEvent::Waited(self.name.clone()));
            Ok(exit_status(self.exit_code))
        })
    }

    fn output(&mut self) -> BoxFuture<'_, ProcessResult<Captured>> {
        Box::pin(async move { self.run() })
    }

    fn combined_output(&mut self) -> BoxFuture<'_, ProcessResult<Captured>> {
        Box::pin(async move { self.run() })
    }

    fn kill(&mut self) -> ProcessResult<()> {
        if self.started && !self.completed {
            self.record(FakeEvent::Killed(self.name.clone()));
        }
        Ok(())
    }
}
