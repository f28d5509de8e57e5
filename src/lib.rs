// src/lib.rs

//! Compose external processes into a linear pipeline, `cmd1 | cmd2 | ...`,
//! without a shell and without wiring file descriptors by hand.
//!
//! ```no_run
//! # async fn demo() -> pipechain::errors::Result<()> {
//! use pipechain::Chain;
//!
//! let out = Chain::command("echo", ["hello world"])
//!     .pipe("grep", ["world"])
//!     .combined_output()
//!     .await?;
//! assert_eq!(out, b"hello world\n");
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod process;
pub mod types;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, LaunchFailureArg, RunMode};
use crate::config::loader::{default_config_path, load_from_path};
use crate::config::{PipelineFile, RawPipelineFile, StageConfig};
use crate::process::cancel_pair;
use crate::types::LaunchFailure;

pub use crate::chain::Chain;
pub use crate::errors::{PipechainError, ProcessError};
pub use crate::process::{CancelSource, CancelToken, Input, OsProcess, Output, Process};
pub use crate::types::{ChainOptions, ChainPhase, StageState};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - pipeline loading (command line or TOML file)
/// - chain construction
/// - Ctrl-C → cancellation of every stage
/// - running the chain in the requested mode
pub async fn run(args: CliArgs) -> Result<()> {
    let pipeline = pipeline_from_args(&args)?;

    if args.dry_run {
        print_dry_run(&pipeline);
        return Ok(());
    }

    // Ctrl-C → kill every stage.
    let (cancel, token) = cancel_pair();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        cancel.cancel();
    });

    let mut chain = pipeline
        .build_chain(Some(&token))
        .context("building chain from pipeline")?;
    info!(stages = chain.len(), mode = ?args.mode, "running pipeline");

    match args.mode {
        RunMode::Stream => {
            chain.start().await?;
        }
        RunMode::Output | RunMode::Combined => {
            let res = if args.mode == RunMode::Output {
                chain.output().await
            } else {
                chain.combined_output().await
            };
            let bytes = match res {
                Ok(bytes) => bytes,
                Err(err) => {
                    if let Some(partial) = err.captured_output() {
                        write_stdout(partial)?;
                    }
                    return Err(err.into());
                }
            };
            write_stdout(&bytes)?;
        }
    }

    chain.wait().await?;
    debug!("pipeline finished");
    Ok(())
}

/// Build the pipeline either from trailing command-line words or from a
/// pipeline file, then apply CLI overrides.
pub fn pipeline_from_args(args: &CliArgs) -> errors::Result<PipelineFile> {
    let mut raw = if args.stages.is_empty() {
        let path = args
            .config
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(default_config_path);
        load_from_path(&path)?
    } else {
        RawPipelineFile {
            stage: stages_from_words(&args.stages),
            ..RawPipelineFile::default()
        }
    };

    if let Some(policy) = args.launch_failure {
        raw.chain.launch_failure = match policy {
            LaunchFailureArg::Abort => LaunchFailure::Abort,
            LaunchFailureArg::Lenient => LaunchFailure::Lenient,
        };
    }

    PipelineFile::try_from(raw)
}

/// Split `a x | b y z` into stages; every `|` word is a stage boundary.
pub fn stages_from_words(words: &[String]) -> Vec<StageConfig> {
    words
        .split(|w| w == "|")
        .map(|stage| match stage.split_first() {
            Some((cmd, args)) => StageConfig::new(cmd.clone(), args.to_vec()),
            None => StageConfig::new(String::new(), Vec::new()),
        })
        .collect()
}

fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(bytes).context("writing pipeline output")?;
    stdout.flush().context("flushing stdout")?;
    Ok(())
}

/// Simple dry-run output: print options and stages.
fn print_dry_run(pipeline: &PipelineFile) {
    let chain = pipeline.chain();
    let options = chain.options();

    println!("pipechain dry-run");
    println!("  chain.launch_failure = {:?}", options.launch_failure);
    println!("  chain.kill_on_failure = {}", options.kill_on_failure);
    if let Some(ref p) = chain.stdin {
        println!("  chain.stdin = {}", p.display());
    }
    if let Some(ref p) = chain.stdout {
        println!("  chain.stdout = {}", p.display());
    }
    if let Some(ref p) = chain.stderr {
        println!("  chain.stderr = {}", p.display());
    }
    if let Some(ref p) = chain.allerr {
        println!("  chain.allerr = {}", p.display());
    }
    println!();

    println!("stages ({}):", pipeline.stages().len());
    for (i, stage) in pipeline.stages().iter().enumerate() {
        println!("  #{i} {} {:?}", stage.cmd, stage.args);
        if let Some(ref cwd) = stage.cwd {
            println!("      cwd: {}", cwd.display());
        }
        if !stage.env.is_empty() {
            println!("      env: {:?}", stage.env);
        }
    }

    debug!("dry-run complete (no execution)");
}
