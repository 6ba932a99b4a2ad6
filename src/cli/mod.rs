//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{ApplyCommand, BuildCommand, CheckCommand, TargetsCommand};

/// Multi-target build orchestration tool
#[derive(Debug, Parser, Clone)]
#[command(name = "multibuild")]
#[command(author = "MultiBuild Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Builds a project for multiple targets in one run", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Builder executable to invoke
    #[arg(long, global = true)]
    pub builder: Option<String>,

    /// Per-invocation builder timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Build every configured target
    Build(BuildCommand),

    /// Apply the configured pre-build steps without building
    Apply(ApplyCommand),

    /// Validate the configured steps and show findings
    Check(CheckCommand),

    /// Show resolved output paths per target
    Targets(TargetsCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

use std::ffi::OsString;
