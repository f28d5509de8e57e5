// src/chain/link.rs

//! Link phase: pipes between stages plus chain-level overrides.

use tracing::debug;

use crate::chain::Chain;
use crate::errors::{PipechainError, Result};
use crate::process::{Input, Process, StagePipe};
use crate::types::{ChainPhase, StageState};

impl<P: Process> Chain<P> {
    /// Wire the chain without starting anything.
    ///
    /// For every adjacent pair `(i, i + 1)`, stage `i`'s stdout pipe becomes
    /// stage `i + 1`'s stdin. Then the chain-level overrides are applied:
    /// `stdin` to the first stage, `stdout` to the last, `stderr` (or,
    /// failing that, `allerr`) to the last stage's stderr. `allerr` also goes
    /// to every non-terminal stage's stderr.
    ///
    /// The override handles are moved into the stages; the chain keeps none.
    /// On failure nothing is rolled back: no stage has been started yet, and
    /// pipes already created are released with the chain. The chain-level
    /// overrides are only consumed once every pipe exists, so a failed link
    /// leaves them in place.
    ///
    /// Terminal operations call this themselves when the chain is still
    /// [`ChainPhase::Built`]. Linking twice is rejected.
    pub fn link(&mut self) -> Result<()> {
        self.ensure_phase(ChainPhase::Built)?;

        let last = self.last_index();

        for i in 0..last {
            let reader = self.stages[i].stdout_pipe().map_err(|source| {
                PipechainError::Link {
                    index: i,
                    name: self.stages[i].name().to_string(),
                    source,
                }
            })?;
            self.stages[i + 1].set_stdin(Input::Pipe(StagePipe::new(i, reader)));

            if let Some(sink) = &self.allerr {
                self.stages[i].set_stderr(sink.clone());
            }

            debug!(
                from = i,
                to = i + 1,
                upstream = %self.stages[i].name(),
                downstream = %self.stages[i + 1].name(),
                "linked stages"
            );
        }

        if let Some(input) = self.stdin.take() {
            self.stages[0].set_stdin(input);
        }
        if let Some(output) = self.stdout.take() {
            self.stages[last].set_stdout(output);
        }
        match (self.stderr.take(), self.allerr.take()) {
            (Some(stderr), _) => self.stages[last].set_stderr(stderr),
            (None, Some(allerr)) => self.stages[last].set_stderr(allerr),
            (None, None) => {}
        }

        self.states.fill(StageState::Linked);
        self.phase = ChainPhase::Linked;
        debug!(stages = self.stages.len(), "chain linked");
        Ok(())
    }

    /// Link if nobody has done so yet.
    pub(crate) fn ensure_linked(&mut self) -> Result<()> {
        if self.phase == ChainPhase::Built {
            self.link()?;
        }
        self.ensure_phase(ChainPhase::Linked)
    }
}
