// src/chain/launch.rs

//! Launch phase: start every non-terminal stage, plus cleanup of
//! already-started stages when a run has to be abandoned.

use tracing::{debug, info, warn};

use crate::chain::Chain;
use crate::errors::{PipechainError, Result};
use crate::process::Process;
use crate::types::{ChainPhase, LaunchFailure, StageState};

impl<P: Process> Chain<P> {
    /// Start stages `0..n-1` in ascending order. The terminal stage is left
    /// to the terminal operation.
    ///
    /// With [`LaunchFailure::Abort`] the first failure stops the loop and is
    /// returned; with `kill_on_failure` the stages started so far are killed
    /// and reaped first. With [`LaunchFailure::Lenient`] the failure is only
    /// logged and the loop continues.
    pub(crate) async fn launch(&mut self) -> Result<()> {
        self.ensure_phase(ChainPhase::Linked)?;

        for i in 0..self.last_index() {
            match self.stages[i].start() {
                Ok(()) => {
                    self.states[i] = StageState::Started;
                }
                Err(source) => {
                    let err = PipechainError::Launch {
                        index: i,
                        name: self.stages[i].name().to_string(),
                        source,
                    };

                    match self.options.launch_failure {
                        LaunchFailure::Lenient => {
                            warn!(error = %err, "stage failed to start; continuing");
                        }
                        LaunchFailure::Abort => {
                            if self.options.kill_on_failure {
                                self.abandon_started().await;
                            }
                            return Err(err);
                        }
                    }
                }
            }
        }

        self.phase = ChainPhase::Launched;
        debug!(started = self.last_index(), "non-terminal stages launched");
        Ok(())
    }

    /// Kill and reap every stage that is currently running.
    ///
    /// Errors are logged; the caller is already reporting a failure.
    pub(crate) async fn abandon_started(&mut self) {
        for (i, stage) in self.stages.iter_mut().enumerate() {
            if self.states[i] != StageState::Started {
                continue;
            }

            info!(index = i, process = %stage.name(), "killing abandoned stage");
            if let Err(e) = stage.kill() {
                warn!(
                    index = i,
                    process = %stage.name(),
                    error = %e,
                    "failed to kill abandoned stage"
                );
            }
            match stage.wait().await {
                Ok(status) => {
                    debug!(index = i, process = %stage.name(), %status, "abandoned stage reaped");
                }
                Err(e) => {
                    warn!(
                        index = i,
                        process = %stage.name(),
                        error = %e,
                        "failed to reap abandoned stage"
                    );
                }
            }
            self.states[i] = StageState::Completed;
        }
    }
}
