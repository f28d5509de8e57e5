// src/chain/collect.rs

//! Result collection: waiting for every stage.

use tracing::{debug, warn};

use crate::chain::Chain;
use crate::errors::{PipechainError, ProcessError, Result};
use crate::process::Process;
use crate::types::{ChainPhase, StageState};

impl<P: Process> Chain<P> {
    /// Wait for every stage in ascending index order.
    ///
    /// Stops at the first stage whose wait fails or which exits
    /// unsuccessfully; later stages are not waited on in this call. A stage
    /// that already completed (e.g. the last stage after [`Chain::output`])
    /// reports its recorded exit status again.
    pub async fn wait(&mut self) -> Result<()> {
        for (index, stage) in self.stages.iter_mut().enumerate() {
            let failure = match stage.wait().await {
                Ok(status) if status.success() => None,
                Ok(status) => Some(ProcessError::Exit(status)),
                Err(e) => Some(e),
            };

            if let Some(source) = failure {
                if stage.is_started() {
                    self.states[index] = StageState::Completed;
                }
                warn!(index, process = %stage.name(), error = %source, "stage failed");
                return Err(PipechainError::Wait {
                    index,
                    name: stage.name().to_string(),
                    source,
                });
            }

            self.states[index] = StageState::Completed;
            debug!(index, process = %stage.name(), "stage completed");
        }

        self.phase = ChainPhase::Waited;
        Ok(())
    }
}
