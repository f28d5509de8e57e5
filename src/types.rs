use serde::Deserialize;
use std::str::FromStr;

/// What Launch does when a non-terminal stage fails to start.
///
/// - `Abort`: stop starting further stages and return the failure from the
///   terminal operation (default behaviour).
/// - `Lenient`: log the failure and keep going. Later stages will usually see
///   EOF on their input; the failed stage shows up again as a `Wait` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchFailure {
    Abort,
    Lenient,
}

impl Default for LaunchFailure {
    fn default() -> Self {
        LaunchFailure::Abort
    }
}

impl FromStr for LaunchFailure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(LaunchFailure::Abort),
            "lenient" => Ok(LaunchFailure::Lenient),
            other => Err(format!(
                "invalid launch_failure: {other} (expected \"abort\" or \"lenient\")"
            )),
        }
    }
}

/// Behaviour knobs for a [`Chain`](crate::chain::Chain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ChainOptions {
    #[serde(default)]
    pub launch_failure: LaunchFailure,

    /// Kill and reap already-started stages when Launch aborts or the
    /// terminal stage cannot be spawned.
    #[serde(default = "default_kill_on_failure")]
    pub kill_on_failure: bool,
}

fn default_kill_on_failure() -> bool {
    true
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            launch_failure: LaunchFailure::default(),
            kill_on_failure: default_kill_on_failure(),
        }
    }
}

/// Where a chain is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPhase {
    /// Stages added, nothing wired yet.
    Built,
    /// Pipes created and overrides applied.
    Linked,
    /// Every non-terminal stage has been started (or skipped, when lenient).
    Launched,
    /// The terminal stage has been run or started.
    TerminalInvoked,
    /// `wait` returned successfully for every stage.
    Waited,
}

/// Lifecycle of a single stage as seen by its process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Unlinked,
    Linked,
    Started,
    Completed,
}
