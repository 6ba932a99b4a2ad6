//! Build run execution

pub mod engine;
pub mod gates;
pub mod outcome;

pub use engine::{BuildError, BuildEvent, BuildOrchestrator, EventHandler};
pub use gates::{AutoConfirm, NoUnsavedWork, OverwritePrompt, StdinPrompt, UnsavedWorkGuard};
pub use outcome::{BuildOutcome, CancelReason, RunReport};
