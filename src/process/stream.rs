// src/process/stream.rs

//! Stream slot types.
//!
//! [`Input`] is owned by exactly one stage. [`Output`] handles are shared
//! (`Arc`) so one sink such as the chain's `allerr` can be attached to
//! several stages; each stage gets its own duplicate of the descriptor at
//! spawn time.

use std::fs::File;
use std::io::{PipeReader, PipeWriter};
use std::process::Stdio;
use std::sync::Arc;

use crate::errors::ProcessError;

/// Read end of a pipe created by linking two stages.
#[derive(Debug)]
pub struct StagePipe {
    from_stage: usize,
    reader: PipeReader,
}

impl StagePipe {
    pub fn new(from_stage: usize, reader: PipeReader) -> Self {
        Self { from_stage, reader }
    }

    /// Index of the stage writing into this pipe.
    pub fn from_stage(&self) -> usize {
        self.from_stage
    }

    pub fn reader(&self) -> &PipeReader {
        &self.reader
    }

    pub fn into_reader(self) -> PipeReader {
        self.reader
    }
}

/// Source for a stage's stdin.
#[derive(Debug)]
pub enum Input {
    Inherit,
    Null,
    File(File),
    /// Output of the previous stage.
    Pipe(StagePipe),
    /// Read end of a pipe created by the caller.
    Reader(PipeReader),
}

impl Input {
    pub fn file(file: File) -> Self {
        Input::File(file)
    }

    /// The upstream stage index, if this input is an inter-stage pipe.
    pub fn upstream_stage(&self) -> Option<usize> {
        match self {
            Input::Pipe(pipe) => Some(pipe.from_stage()),
            _ => None,
        }
    }

    pub(crate) fn into_stdio(self) -> Stdio {
        match self {
            Input::Inherit => Stdio::inherit(),
            Input::Null => Stdio::null(),
            Input::File(file) => Stdio::from(file),
            Input::Pipe(pipe) => Stdio::from(pipe.into_reader()),
            Input::Reader(reader) => Stdio::from(reader),
        }
    }
}

/// Sink for a stage's stdout or stderr.
#[derive(Debug, Clone)]
pub enum Output {
    Inherit,
    Null,
    File(Arc<File>),
    /// Write end of a pipe, e.g. one handed out by `stdout_pipe`.
    Pipe(Arc<PipeWriter>),
}

impl Output {
    pub fn file(file: File) -> Self {
        Output::File(Arc::new(file))
    }

    pub fn pipe(writer: PipeWriter) -> Self {
        Output::Pipe(Arc::new(writer))
    }

    /// True if both sides refer to the same underlying handle.
    pub fn same_sink(&self, other: &Output) -> bool {
        match (self, other) {
            (Output::Inherit, Output::Inherit) => true,
            (Output::Null, Output::Null) => true,
            (Output::File(a), Output::File(b)) => Arc::ptr_eq(a, b),
            (Output::Pipe(a), Output::Pipe(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Duplicate the handle for a child process.
    pub(crate) fn to_stdio(&self) -> Result<Stdio, ProcessError> {
        Ok(match self {
            Output::Inherit => Stdio::inherit(),
            Output::Null => Stdio::null(),
            Output::File(file) => Stdio::from(file.try_clone()?),
            Output::Pipe(writer) => Stdio::from(writer.try_clone()?),
        })
    }
}
