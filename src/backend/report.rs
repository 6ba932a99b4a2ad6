//! Backend request and report types

use crate::core::step::BuildOptions;
use crate::core::target::BuildTarget;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Everything the backend needs to build one target
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub target: BuildTarget,

    /// Fully resolved artifact path, suffix policy already applied
    pub output_path: PathBuf,

    /// Scene manifest, passed through uninspected
    pub scenes: Vec<String>,

    /// Options aggregated by the pre-build steps
    pub options: BuildOptions,
}

/// Summary returned by the backend for one target build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub succeeded: bool,

    #[serde(default)]
    pub elapsed_secs: f64,

    #[serde(default)]
    pub output_size_bytes: u64,

    /// Backend log excerpt explaining a failure; empty on success
    #[serde(default)]
    pub diagnostics: String,

    /// Where the artifact landed. Backends echo the requested path here so
    /// post-build steps can probe next to it.
    #[serde(default)]
    pub output_path: PathBuf,
}

/// Errors from talking to the build backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The builder process misbehaved (bad exit, unusable output)
    #[error("builder error: {0}")]
    Builder(String),

    /// The invocation did not finish in time
    #[error("builder timed out after {0} seconds")]
    Timeout(u64),

    /// Something went wrong on our side of the boundary
    #[error("internal error: {0}")]
    Internal(String),
}
