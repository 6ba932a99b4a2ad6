//! multibuild - multi-target build orchestration around an external builder

pub mod backend;
pub mod cli;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use backend::{BackendError, BuildBackend, BuildReport, BuildRequest, CommandBackend};
pub use crate::core::{
    BuildConfig, BuildOptions, BuildTarget, ConfigFile, Severity, ValidationResult,
};
pub use execution::{BuildError, BuildEvent, BuildOrchestrator, BuildOutcome, RunReport};
