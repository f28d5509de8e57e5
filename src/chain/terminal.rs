// src/chain/terminal.rs

//! Terminal operations: the calls that actually run a chain, plus the
//! caller-managed pipe accessors.

use std::io::{PipeReader, PipeWriter};

use tracing::{debug, info};

use crate::chain::Chain;
use crate::errors::{PipechainError, ProcessError, Result};
use crate::process::{Captured, Process};
use crate::types::{ChainPhase, StageState};

impl<P: Process> Chain<P> {
    /// Run the chain and return the last stage's stdout and stderr
    /// interleaved into one buffer.
    ///
    /// Only the last stage's failure is reported here. Upstream stages keep
    /// running until they finish on their own; call [`Chain::wait`] to reap
    /// them.
    pub async fn combined_output(&mut self) -> Result<Vec<u8>> {
        self.prepare().await?;
        let index = self.last_index();
        info!(index, process = %self.stages[index].name(), "running terminal stage (combined output)");

        let res = self.stages[index].combined_output().await;
        self.finish_capture(index, res).await
    }

    /// Run the chain and return the last stage's stdout.
    ///
    /// Same failure reporting as [`Chain::combined_output`].
    pub async fn output(&mut self) -> Result<Vec<u8>> {
        self.prepare().await?;
        let index = self.last_index();
        info!(index, process = %self.stages[index].name(), "running terminal stage (output)");

        let res = self.stages[index].output().await;
        self.finish_capture(index, res).await
    }

    /// Start every stage and return without waiting.
    pub async fn start(&mut self) -> Result<()> {
        self.prepare().await?;
        let index = self.last_index();

        self.phase = ChainPhase::TerminalInvoked;
        if let Err(source) = self.stages[index].start() {
            return Err(self.terminal_failure(index, source, Vec::new()).await);
        }
        self.states[index] = StageState::Started;
        debug!(index, process = %self.stages[index].name(), "terminal stage started");
        Ok(())
    }

    /// Writable end feeding the first stage's stdin.
    ///
    /// Bypasses the chain-level `stdin`; if both are used the chain-level
    /// one wins at link time. Must be called before the chain is started.
    pub fn stdin_pipe(&mut self) -> Result<PipeWriter> {
        self.stages[0]
            .stdin_pipe()
            .map_err(|source| PipechainError::Link {
                index: 0,
                name: self.stages[0].name().to_string(),
                source,
            })
    }

    /// Readable end draining the last stage's stdout.
    ///
    /// Must be called before the last stage is started.
    pub fn stdout_pipe(&mut self) -> Result<PipeReader> {
        let index = self.last_index();
        self.stages[index]
            .stdout_pipe()
            .map_err(|source| PipechainError::Link {
                index,
                name: self.stages[index].name().to_string(),
                source,
            })
    }

    /// Readable end draining the last stage's stderr.
    ///
    /// Must be called before the last stage is started.
    pub fn stderr_pipe(&mut self) -> Result<PipeReader> {
        let index = self.last_index();
        self.stages[index]
            .stderr_pipe()
            .map_err(|source| PipechainError::Link {
                index,
                name: self.stages[index].name().to_string(),
                source,
            })
    }

    /// Link (if needed) and launch.
    async fn prepare(&mut self) -> Result<()> {
        self.ensure_linked()?;
        self.launch().await
    }

    async fn finish_capture(
        &mut self,
        index: usize,
        res: std::result::Result<Captured, ProcessError>,
    ) -> Result<Vec<u8>> {
        self.phase = ChainPhase::TerminalInvoked;
        match res {
            Ok(Captured { bytes, status }) => {
                self.states[index] = StageState::Completed;
                if status.success() {
                    Ok(bytes)
                } else {
                    Err(self.terminal_failure(index, ProcessError::Exit(status), bytes).await)
                }
            }
            Err(source) => {
                if self.stages[index].is_started() {
                    self.states[index] = StageState::Started;
                }
                Err(self.terminal_failure(index, source, Vec::new()).await)
            }
        }
    }

    /// Build the terminal error, cleaning up upstream stages if the last
    /// stage never came into existence (nothing would drain their output).
    async fn terminal_failure(
        &mut self,
        index: usize,
        source: ProcessError,
        output: Vec<u8>,
    ) -> PipechainError {
        if !self.stages[index].is_started() && self.options.kill_on_failure {
            self.abandon_started().await;
        }
        PipechainError::Terminal {
            index,
            name: self.stages[index].name().to_string(),
            source,
            output,
        }
    }
}
