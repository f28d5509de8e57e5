// src/config/mod.rs

//! Pipeline files.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a pipeline file from disk (`loader.rs`).
//! - Validate it and turn it into a runnable [`Chain`](crate::chain::Chain)
//!   (`validate.rs`, `model.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ChainSection, PipelineFile, RawPipelineFile, StageConfig};
