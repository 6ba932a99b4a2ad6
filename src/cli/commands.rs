//! CLI command definitions

use clap::Args;
use std::path::PathBuf;

/// Build every configured target
#[derive(Debug, Args, Clone)]
pub struct BuildCommand {
    /// Path to build config YAML file
    #[arg(short, long)]
    pub file: String,

    /// Replace the configured output folder
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overwrite existing builds without asking
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Launch each artifact after its build
    #[arg(long)]
    pub and_run: bool,

    /// Output the run report in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Apply the configured pre-build steps without building
#[derive(Debug, Args, Clone)]
pub struct ApplyCommand {
    /// Path to build config YAML file
    #[arg(short, long)]
    pub file: String,
}

/// Validate the configured steps and show findings
#[derive(Debug, Args, Clone)]
pub struct CheckCommand {
    /// Path to build config YAML file
    #[arg(short, long)]
    pub file: String,

    /// Run available fix actions, then validate again
    #[arg(long)]
    pub fix: bool,

    /// Output findings in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show resolved output paths per target
#[derive(Debug, Args, Clone)]
pub struct TargetsCommand {
    /// Path to build config YAML file
    #[arg(short, long)]
    pub file: String,

    /// Replace the configured output folder
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
