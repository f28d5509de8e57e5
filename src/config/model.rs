// src/config/model.rs

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::chain::Chain;
use crate::errors::{PipechainError, Result};
use crate::process::{CancelToken, Input, OsProcess, Output};
use crate::types::{ChainOptions, LaunchFailure};

/// Top-level pipeline file as read from TOML, before validation.
///
/// ```toml
/// [chain]
/// launch_failure = "abort"
/// kill_on_failure = true
/// stdin = "input.txt"
/// allerr = "errors.log"
///
/// [[stage]]
/// cmd = "cat"
///
/// [[stage]]
/// cmd = "grep"
/// args = ["world"]
/// ```
///
/// Stages run in file order. `[chain]` is optional.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPipelineFile {
    #[serde(default)]
    pub chain: ChainSection,

    #[serde(default)]
    pub stage: Vec<StageConfig>,
}

/// `[chain]` section: options and chain-level stream files.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChainSection {
    /// `"abort"` (default) or `"lenient"`.
    #[serde(default)]
    pub launch_failure: LaunchFailure,

    /// Defaults to `true` when omitted.
    #[serde(default)]
    pub kill_on_failure: Option<bool>,

    /// File fed to the first stage's stdin.
    #[serde(default)]
    pub stdin: Option<PathBuf>,

    /// File receiving the last stage's stdout.
    #[serde(default)]
    pub stdout: Option<PathBuf>,

    /// File receiving the last stage's stderr.
    #[serde(default)]
    pub stderr: Option<PathBuf>,

    /// File receiving every stage's stderr (the last stage's only when
    /// `stderr` is not set).
    #[serde(default)]
    pub allerr: Option<PathBuf>,

    /// Append to output files instead of truncating them.
    #[serde(default)]
    pub append: bool,
}

impl ChainSection {
    pub fn options(&self) -> ChainOptions {
        let defaults = ChainOptions::default();
        ChainOptions {
            launch_failure: self.launch_failure,
            kill_on_failure: self.kill_on_failure.unwrap_or(defaults.kill_on_failure),
        }
    }
}

/// `[[stage]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    /// Program to run. Resolved through `PATH` like any spawned command.
    pub cmd: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory for this stage.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Extra environment variables for this stage.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl StageConfig {
    pub fn new(cmd: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            cmd: cmd.into(),
            args,
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    /// Build the process for this stage.
    pub fn to_process(&self, cancel: Option<&CancelToken>) -> OsProcess {
        let mut command = Command::new(&self.cmd);
        command.args(&self.args).envs(&self.env);
        if let Some(ref cwd) = self.cwd {
            command.current_dir(cwd);
        }

        let process = OsProcess::from_command(command);
        match cancel {
            Some(token) => process.with_cancel(token.clone()),
            None => process,
        }
    }
}

/// A validated pipeline file.
#[derive(Debug, Clone)]
pub struct PipelineFile {
    chain: ChainSection,
    stages: Vec<StageConfig>,
}

impl PipelineFile {
    /// Only reachable through validation (`TryFrom<RawPipelineFile>`).
    pub(crate) fn new_unchecked(chain: ChainSection, stages: Vec<StageConfig>) -> Self {
        Self { chain, stages }
    }

    pub fn chain(&self) -> &ChainSection {
        &self.chain
    }

    /// Stages in pipeline order. Never empty.
    pub fn stages(&self) -> &[StageConfig] {
        &self.stages
    }

    /// Turn the file into a chain, opening the configured stream files.
    pub fn build_chain(&self, cancel: Option<&CancelToken>) -> Result<Chain> {
        let mut stages = self.stages.iter().map(|s| s.to_process(cancel));
        let first = stages.next().ok_or_else(|| {
            PipechainError::ConfigError("pipeline has no stages".to_string())
        })?;

        let mut chain = Chain::new(first).options(self.chain.options());
        for process in stages {
            chain = chain.pipe_process(process);
        }

        if let Some(ref path) = self.chain.stdin {
            debug!(path = %path.display(), "chain stdin from file");
            chain = chain.stdin(Input::file(File::open(path)?));
        }
        if let Some(ref path) = self.chain.stdout {
            chain = chain.stdout(Output::file(self.open_sink(path)?));
        }
        if let Some(ref path) = self.chain.stderr {
            chain = chain.stderr(Output::file(self.open_sink(path)?));
        }
        if let Some(ref path) = self.chain.allerr {
            chain = chain.allerr(Output::file(self.open_sink(path)?));
        }

        Ok(chain)
    }

    fn open_sink(&self, path: &Path) -> Result<File> {
        debug!(path = %path.display(), append = self.chain.append, "opening output file");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(self.chain.append)
            .truncate(!self.chain.append)
            .open(path)?;
        Ok(file)
    }
}
