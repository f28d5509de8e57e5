// src/config/validate.rs

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::errors::{PipechainError, Result};

impl TryFrom<RawPipelineFile> for PipelineFile {
    type Error = crate::errors::PipechainError;

    fn try_from(raw: RawPipelineFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_pipeline(&raw)?;
        Ok(PipelineFile::new_unchecked(raw.chain, raw.stage))
    }
}

fn validate_raw_pipeline(raw: &RawPipelineFile) -> Result<()> {
    ensure_has_stages(raw)?;
    validate_stages(raw)?;
    validate_stream_paths(raw)?;
    Ok(())
}

fn ensure_has_stages(raw: &RawPipelineFile) -> Result<()> {
    if raw.stage.is_empty() {
        return Err(PipechainError::ConfigError(
            "pipeline must contain at least one [[stage]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_stages(raw: &RawPipelineFile) -> Result<()> {
    for (index, stage) in raw.stage.iter().enumerate() {
        if stage.cmd.trim().is_empty() {
            return Err(PipechainError::ConfigError(format!(
                "stage #{} has an empty `cmd`",
                index
            )));
        }
        if let Some(ref cwd) = stage.cwd {
            if cwd.as_os_str().is_empty() {
                return Err(PipechainError::ConfigError(format!(
                    "stage #{} ({}) has an empty `cwd`",
                    index, stage.cmd
                )));
            }
        }
    }
    Ok(())
}

fn validate_stream_paths(raw: &RawPipelineFile) -> Result<()> {
    let chain = &raw.chain;
    let paths = [
        ("stdin", &chain.stdin),
        ("stdout", &chain.stdout),
        ("stderr", &chain.stderr),
        ("allerr", &chain.allerr),
    ];

    for (field, path) in paths {
        if let Some(path) = path {
            if path.as_os_str().is_empty() {
                return Err(PipechainError::ConfigError(format!(
                    "[chain].{} must not be an empty path",
                    field
                )));
            }
        }
    }
    Ok(())
}
