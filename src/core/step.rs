//! Build step contract
//!
//! A step is a named, independently toggleable unit of work that runs either
//! before any target is built (pre-build, mutating the aggregated
//! [`BuildOptions`]) or after each target's artifact is produced (post-build,
//! emitting findings about that artifact). Both variants share the
//! validate half of the contract.

use crate::backend::BuildReport;
use crate::core::project::ProjectSnapshot;
use crate::core::target::BuildTarget;
use crate::core::validation::ValidationResult;
use serde_yaml::Mapping;
use std::fmt;
use thiserror::Error;

/// Read-only context handed to step validation and execution
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub project: &'a ProjectSnapshot,
    pub targets: &'a [BuildTarget],
}

/// Options accumulated by pre-build steps and handed to the backend once per
/// target. Applied exactly once per run so every target builds the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub development: bool,
    pub allow_debugging: bool,
    pub deep_profiling: bool,
    pub wait_for_debugger: bool,
    pub auto_run: bool,
    pub define_symbols: Vec<String>,
}

impl BuildOptions {
    /// Add a scripting define symbol, keeping the list duplicate-free
    pub fn define_symbol(&mut self, symbol: &str) {
        if !self.define_symbols.iter().any(|s| s == symbol) {
            self.define_symbols.push(symbol.to_string());
        }
    }

    /// Remove a scripting define symbol if present
    pub fn remove_symbol(&mut self, symbol: &str) {
        self.define_symbols.retain(|s| s != symbol);
    }
}

/// Errors raised by step application
#[derive(Debug, Error)]
pub enum StepError {
    #[error("step '{step}' failed: {reason}")]
    Failed { step: String, reason: String },

    #[error("step '{kind}' is not resolved and cannot run")]
    Unresolved { kind: String },
}

/// Behaviour shared by both step variants
pub trait BuildStep: Send + Sync {
    /// Stable identity, matching the registry entry
    fn kind(&self) -> &'static str;

    /// Human-readable name derived from identity and parameters
    fn display_name(&self) -> String;

    /// Inspect the step's own configuration and report findings.
    ///
    /// Returns zero or more findings; it never aborts the pass for other
    /// steps.
    fn validate(&self, ctx: &StepContext<'_>) -> Vec<ValidationResult>;
}

/// A step that runs once before any target is built
pub trait PreBuildStep: BuildStep {
    /// Fold this step's effect into the aggregated options.
    ///
    /// An error here is fatal to the whole run: it propagates before any
    /// target is built.
    fn apply(&self, ctx: &StepContext<'_>, options: &mut BuildOptions) -> Result<(), StepError>;
}

/// A step that runs against each target's freshly built artifact
pub trait PostBuildStep: BuildStep {
    /// Check the produced artifact and report findings.
    ///
    /// Errors are contained by the pipeline as Error-severity findings on
    /// that target's outcome; they never abort later steps or targets.
    fn execute(
        &self,
        ctx: &StepContext<'_>,
        target: BuildTarget,
        report: &BuildReport,
    ) -> Result<Vec<ValidationResult>, StepError>;
}

/// Which half of the run a step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    PreBuild,
    PostBuild,
}

impl fmt::Display for StepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepPhase::PreBuild => f.write_str("pre-build"),
            StepPhase::PostBuild => f.write_str("post-build"),
        }
    }
}

type MakePre = fn(&Mapping) -> anyhow::Result<Box<dyn PreBuildStep>>;
type MakePost = fn(&Mapping) -> anyhow::Result<Box<dyn PostBuildStep>>;

/// Registry entry for one step identity: constructors plus the two add-time
/// policies (permitted phases, single vs. multiple instances per pipeline).
pub struct StepDescriptor {
    pub kind: &'static str,
    pub label: &'static str,
    pub pre_build: bool,
    pub post_build: bool,
    pub allow_multiple: bool,
    pub(crate) make_pre: Option<MakePre>,
    pub(crate) make_post: Option<MakePost>,
}

impl StepDescriptor {
    pub fn allows(&self, phase: StepPhase) -> bool {
        match phase {
            StepPhase::PreBuild => self.pre_build,
            StepPhase::PostBuild => self.post_build,
        }
    }

    /// Construct a pre-build instance from a YAML parameter mapping
    pub fn construct_pre(&self, params: &Mapping) -> anyhow::Result<Box<dyn PreBuildStep>> {
        match self.make_pre {
            Some(make) => make(params),
            None => anyhow::bail!("step '{}' has no pre-build form", self.kind),
        }
    }

    /// Construct a post-build instance from a YAML parameter mapping
    pub fn construct_post(&self, params: &Mapping) -> anyhow::Result<Box<dyn PostBuildStep>> {
        match self.make_post {
            Some(make) => make(params),
            None => anyhow::bail!("step '{}' has no post-build form", self.kind),
        }
    }
}

impl fmt::Debug for StepDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDescriptor")
            .field("kind", &self.kind)
            .field("pre_build", &self.pre_build)
            .field("post_build", &self.post_build)
            .field("allow_multiple", &self.allow_multiple)
            .finish()
    }
}
