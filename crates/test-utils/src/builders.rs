#![allow(dead_code)]

use std::path::PathBuf;

use pipechain::config::{ChainSection, PipelineFile, RawPipelineFile, StageConfig};
use pipechain::types::LaunchFailure;

/// Builder for `PipelineFile` to simplify test setup.
pub struct PipelineFileBuilder {
    raw: RawPipelineFile,
}

impl PipelineFileBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawPipelineFile {
                chain: ChainSection::default(),
                stage: Vec::new(),
            },
        }
    }

    pub fn with_stage(mut self, stage: StageConfig) -> Self {
        self.raw.stage.push(stage);
        self
    }

    pub fn with_command(self, cmd: &str, args: &[&str]) -> Self {
        self.with_stage(StageConfigBuilder::new(cmd).args(args).build())
    }

    pub fn launch_failure(mut self, policy: LaunchFailure) -> Self {
        self.raw.chain.launch_failure = policy;
        self
    }

    pub fn kill_on_failure(mut self, val: bool) -> Self {
        self.raw.chain.kill_on_failure = Some(val);
        self
    }

    pub fn stdin(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.chain.stdin = Some(path.into());
        self
    }

    pub fn stdout(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.chain.stdout = Some(path.into());
        self
    }

    pub fn stderr(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.chain.stderr = Some(path.into());
        self
    }

    pub fn allerr(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.chain.allerr = Some(path.into());
        self
    }

    pub fn raw(self) -> RawPipelineFile {
        self.raw
    }

    pub fn build(self) -> PipelineFile {
        PipelineFile::try_from(self.raw).expect("Failed to build valid pipeline from builder")
    }
}

impl Default for PipelineFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `StageConfig`.
pub struct StageConfigBuilder {
    stage: StageConfig,
}

impl StageConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            stage: StageConfig::new(cmd, Vec::new()),
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.stage.args.push(arg.to_string());
        self
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.stage.args.extend(args.iter().map(|a| a.to_string()));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.stage.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.stage.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> StageConfig {
        self.stage
    }
}
