// src/chain/mod.rs

//! The pipeline chain.
//!
//! A [`Chain`] is an ordered, non-empty list of stages plus chain-level
//! stream overrides. Running it goes through fixed phases:
//!
//! - [`link`]: create one pipe per adjacent pair of stages and apply the
//!   `stdin` / `stdout` / `stderr` / `allerr` overrides.
//! - [`launch`]: start every stage except the last, in index order.
//! - [`terminal`]: the operation the caller invoked (`output`,
//!   `combined_output`, `start`) runs or starts the last stage.
//! - [`collect`]: `wait` reaps every stage in index order and reports the
//!   first failure.
//!
//! The chain owns its stages, so nothing outside can touch their stream
//! slots once they have been handed over.

use std::ffi::OsStr;

use crate::errors::{PipechainError, Result};
use crate::process::{CancelToken, Input, OsProcess, Output, Process};
use crate::types::{ChainOptions, ChainPhase, StageState};

pub mod collect;
pub mod launch;
pub mod link;
pub mod terminal;

/// A linear pipeline of processes: `stage[0] | stage[1] | ... | stage[n-1]`.
#[derive(Debug)]
pub struct Chain<P: Process = OsProcess> {
    stages: Vec<P>,
    states: Vec<StageState>,
    stdin: Option<Input>,
    stdout: Option<Output>,
    stderr: Option<Output>,
    allerr: Option<Output>,
    options: ChainOptions,
    phase: ChainPhase,
}

impl Chain<OsProcess> {
    /// Start a chain with `program args...` as its first stage.
    pub fn command<I, S>(program: impl AsRef<OsStr>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self::new(OsProcess::new(program, args))
    }

    /// Like [`Chain::command`], with the stage observing `token`.
    pub fn command_with_cancel<I, S>(
        token: CancelToken,
        program: impl AsRef<OsStr>,
        args: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self::new(OsProcess::new(program, args).with_cancel(token))
    }

    /// Append `program args...` as the next stage.
    pub fn pipe<I, S>(self, program: impl AsRef<OsStr>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.pipe_process(OsProcess::new(program, args))
    }

    /// Like [`Chain::pipe`], with the stage observing `token`.
    pub fn pipe_with_cancel<I, S>(
        self,
        token: CancelToken,
        program: impl AsRef<OsStr>,
        args: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.pipe_process(OsProcess::new(program, args).with_cancel(token))
    }
}

impl<P: Process> Chain<P> {
    /// Start a chain from an already configured process.
    pub fn new(first: P) -> Self {
        Self {
            stages: vec![first],
            states: vec![StageState::Unlinked],
            stdin: None,
            stdout: None,
            stderr: None,
            allerr: None,
            options: ChainOptions::default(),
            phase: ChainPhase::Built,
        }
    }

    /// Append an already configured process as the next stage.
    ///
    /// The process must not already be wired into another chain.
    pub fn pipe_process(mut self, process: P) -> Self {
        self.stages.push(process);
        self.states.push(StageState::Unlinked);
        self
    }

    /// Feed the first stage from `input`, replacing whatever it had.
    pub fn stdin(mut self, input: Input) -> Self {
        self.stdin = Some(input);
        self
    }

    /// Send the last stage's stdout to `output`.
    pub fn stdout(mut self, output: Output) -> Self {
        self.stdout = Some(output);
        self
    }

    /// Send the last stage's stderr to `output`.
    pub fn stderr(mut self, output: Output) -> Self {
        self.stderr = Some(output);
        self
    }

    /// Send every non-terminal stage's stderr to `output`, and the last
    /// stage's too unless [`Chain::stderr`] is set.
    pub fn allerr(mut self, output: Output) -> Self {
        self.allerr = Some(output);
        self
    }

    pub fn options(mut self, options: ChainOptions) -> Self {
        self.options = options;
        self
    }

    pub fn chain_options(&self) -> &ChainOptions {
        &self.options
    }

    /// Number of stages. Never zero.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false: a chain starts with one stage and only grows.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn phase(&self) -> ChainPhase {
        self.phase
    }

    pub fn stages(&self) -> &[P] {
        &self.stages
    }

    pub fn stage(&self, index: usize) -> Option<&P> {
        self.stages.get(index)
    }

    pub fn stage_state(&self, index: usize) -> Option<StageState> {
        self.states.get(index).copied()
    }

    pub(crate) fn last_index(&self) -> usize {
        self.stages.len() - 1
    }

    pub(crate) fn ensure_phase(&self, expected: ChainPhase) -> Result<()> {
        if self.phase != expected {
            return Err(PipechainError::InvalidPhase {
                expected,
                actual: self.phase,
            });
        }
        Ok(())
    }
}
