//! Build backend: the external engine that switches targets and produces
//! artifacts

pub mod command;
pub mod report;

use async_trait::async_trait;
pub use command::CommandBackend;
pub use report::{BackendError, BuildReport, BuildRequest};

use crate::core::target::BuildTarget;

/// Trait for the external build engine - allows for different implementations
///
/// The backend owns one process-wide active target. Switching it is slow,
/// which is why the orchestration engine reorders targets to start with
/// whatever is already active.
#[async_trait]
pub trait BuildBackend: Send + Sync {
    /// The target the backend's process-wide state currently points at
    async fn active_target(&self) -> Result<BuildTarget, BackendError>;

    /// Switch the process-wide active target
    async fn switch_active_target(&self, target: BuildTarget) -> Result<(), BackendError>;

    /// Build one target and report how it went.
    ///
    /// A build that ran to completion but failed is a report with
    /// `succeeded == false`, not an error; errors are reserved for the
    /// backend itself misbehaving (spawn failure, timeout, garbled output).
    async fn build(&self, request: &BuildRequest) -> Result<BuildReport, BackendError>;
}
