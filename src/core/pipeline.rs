//! Ordered step pipelines with per-slot findings
//!
//! A pipeline owns an ordered list of slots. Each slot is either a resolved
//! step or a broken placeholder recording why it could not be constructed
//! (unknown kind, phase violation, bad parameters). Broken slots render as
//! explicit error findings; they never crash a pass and never block the
//! slots around them.

use crate::backend::BuildReport;
use crate::core::step::{
    BuildOptions, BuildStep, PostBuildStep, PreBuildStep, StepContext, StepDescriptor, StepError,
    StepPhase,
};
use crate::core::steps;
use crate::core::target::BuildTarget;
use crate::core::validation::ValidationResult;
use serde_yaml::Mapping;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error};

/// Errors from pipeline mutation (add, move, remove)
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown step kind '{0}'")]
    UnknownKind(String),

    #[error("step '{kind}' is not a {phase} step")]
    WrongPhase { kind: String, phase: StepPhase },

    #[error("step '{0}' allows only one instance per pipeline")]
    SingleInstance(String),

    #[error("step index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("could not construct step '{kind}': {reason}")]
    Construct { kind: String, reason: String },
}

enum SlotState<S: ?Sized> {
    Resolved(Box<S>),
    Broken { kind: String, reason: String },
}

/// One position in a pipeline: a step (or a broken placeholder), its active
/// flag and the findings from the most recent validation pass.
pub struct StepSlot<S: ?Sized> {
    active: bool,
    state: SlotState<S>,
    findings: Vec<ValidationResult>,
}

impl<S: BuildStep + ?Sized> StepSlot<S> {
    pub fn resolved(step: Box<S>) -> Self {
        Self {
            active: true,
            state: SlotState::Resolved(step),
            findings: Vec::new(),
        }
    }

    pub fn broken(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            active: true,
            state: SlotState::Broken {
                kind: kind.into(),
                reason: reason.into(),
            },
            findings: Vec::new(),
        }
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_broken(&self) -> bool {
        matches!(self.state, SlotState::Broken { .. })
    }

    pub fn kind(&self) -> &str {
        match &self.state {
            SlotState::Resolved(step) => step.kind(),
            SlotState::Broken { kind, .. } => kind,
        }
    }

    pub fn display_name(&self) -> String {
        match &self.state {
            SlotState::Resolved(step) => step.display_name(),
            SlotState::Broken { kind, .. } => format!("{} (not found)", kind),
        }
    }

    pub fn step(&self) -> Option<&S> {
        match &self.state {
            SlotState::Resolved(step) => Some(step),
            SlotState::Broken { .. } => None,
        }
    }

    /// Findings from the most recent validation pass
    pub fn findings(&self) -> &[ValidationResult] {
        &self.findings
    }

    fn structural_finding(kind: &str, reason: &str) -> ValidationResult {
        ValidationResult::error(format!("step '{}' not found: {}", kind, reason))
    }
}

impl<S: BuildStep + ?Sized> fmt::Debug for StepSlot<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepSlot")
            .field("kind", &self.kind())
            .field("active", &self.active)
            .field("broken", &self.is_broken())
            .field("findings", &self.findings.len())
            .finish()
    }
}

/// An ordered list of step slots for one phase
pub struct StepPipeline<S: ?Sized> {
    phase: StepPhase,
    slots: Vec<StepSlot<S>>,
}

pub type PreBuildPipeline = StepPipeline<dyn PreBuildStep>;
pub type PostBuildPipeline = StepPipeline<dyn PostBuildStep>;

impl<S: BuildStep + ?Sized> StepPipeline<S> {
    fn new(phase: StepPhase) -> Self {
        Self {
            phase,
            slots: Vec::new(),
        }
    }

    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[StepSlot<S>] {
        &self.slots
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut StepSlot<S>> {
        self.slots.get_mut(index)
    }

    /// Append a slot as-is, bypassing add-time policy. Config loading uses
    /// this so a policy violation lands as a broken slot instead of an
    /// error, and tests use it to inject doubles.
    pub fn push(&mut self, slot: StepSlot<S>) {
        self.slots.push(slot);
    }

    /// Revalidate every slot, discarding all previous findings.
    ///
    /// Runs for inactive slots too: the findings describe the configuration,
    /// not the run. Broken slots get a single structural error finding.
    pub fn run_validation(&mut self, ctx: &StepContext<'_>) {
        for slot in &mut self.slots {
            slot.findings = match &slot.state {
                SlotState::Resolved(step) => step.validate(ctx),
                SlotState::Broken { kind, reason } => {
                    vec![StepSlot::<S>::structural_finding(kind, reason)]
                }
            };
        }
        debug!(
            "{} validation pass: {} slot(s), {} finding(s)",
            self.phase,
            self.slots.len(),
            self.slots.iter().map(|s| s.findings.len()).sum::<usize>()
        );
    }

    /// Whether any slot's latest findings contain an Error
    pub fn has_errors(&self) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.findings.iter().any(ValidationResult::is_error))
    }

    /// Invoke the remediation action of every finding that carries one.
    /// Returns the number of actions run; callers revalidate afterwards.
    pub fn run_remediations(&self) -> usize {
        self.slots
            .iter()
            .flat_map(|slot| slot.findings.iter())
            .filter(|finding| finding.remediate())
            .count()
    }

    /// Relocate the slot at `index` to `destination`, shifting the slots in
    /// between and preserving their relative order.
    pub fn move_step(&mut self, index: usize, destination: usize) -> Result<(), PipelineError> {
        let len = self.slots.len();
        if index >= len {
            return Err(PipelineError::IndexOutOfBounds { index, len });
        }
        if destination >= len {
            return Err(PipelineError::IndexOutOfBounds {
                index: destination,
                len,
            });
        }
        let slot = self.slots.remove(index);
        self.slots.insert(destination, slot);
        Ok(())
    }

    /// Detach and discard the slot at `index`
    pub fn remove(&mut self, index: usize) -> Result<(), PipelineError> {
        let len = self.slots.len();
        if index >= len {
            return Err(PipelineError::IndexOutOfBounds { index, len });
        }
        self.slots.remove(index);
        Ok(())
    }

    /// Add-time policy shared by both phases: the kind must exist, be
    /// permitted in this phase, and not already be present unless it allows
    /// multiple instances.
    pub(crate) fn descriptor_for(
        &self,
        kind: &str,
    ) -> Result<&'static StepDescriptor, PipelineError> {
        let descriptor =
            steps::descriptor(kind).ok_or_else(|| PipelineError::UnknownKind(kind.to_string()))?;
        if !descriptor.allows(self.phase) {
            return Err(PipelineError::WrongPhase {
                kind: kind.to_string(),
                phase: self.phase,
            });
        }
        if !descriptor.allow_multiple && self.slots.iter().any(|slot| slot.kind() == kind) {
            return Err(PipelineError::SingleInstance(kind.to_string()));
        }
        Ok(descriptor)
    }
}

impl StepPipeline<dyn PreBuildStep> {
    pub fn pre_build() -> Self {
        Self::new(StepPhase::PreBuild)
    }

    /// Append a newly constructed step of the given registry kind with
    /// default parameters
    pub fn add(&mut self, kind: &str) -> Result<(), PipelineError> {
        let descriptor = self.descriptor_for(kind)?;
        let step = descriptor
            .construct_pre(&Mapping::new())
            .map_err(|e| PipelineError::Construct {
                kind: kind.to_string(),
                reason: e.to_string(),
            })?;
        self.push(StepSlot::resolved(step));
        Ok(())
    }

    /// Run every active step's apply in order, folding effects into
    /// `options`.
    ///
    /// The first failure aborts the pass: pre-build effects are
    /// prerequisites for the whole run. An active broken slot is structural
    /// misuse and fails the same way.
    pub fn run_apply(
        &self,
        ctx: &StepContext<'_>,
        options: &mut BuildOptions,
    ) -> Result<(), StepError> {
        for slot in &self.slots {
            if !slot.active {
                continue;
            }
            match &slot.state {
                SlotState::Resolved(step) => {
                    debug!("applying pre-build step: {}", step.display_name());
                    step.apply(ctx, options)?;
                }
                SlotState::Broken { kind, .. } => {
                    return Err(StepError::Unresolved { kind: kind.clone() });
                }
            }
        }
        Ok(())
    }
}

impl StepPipeline<dyn PostBuildStep> {
    pub fn post_build() -> Self {
        Self::new(StepPhase::PostBuild)
    }

    /// Append a newly constructed step of the given registry kind with
    /// default parameters
    pub fn add(&mut self, kind: &str) -> Result<(), PipelineError> {
        let descriptor = self.descriptor_for(kind)?;
        let step = descriptor
            .construct_post(&Mapping::new())
            .map_err(|e| PipelineError::Construct {
                kind: kind.to_string(),
                reason: e.to_string(),
            })?;
        self.push(StepSlot::resolved(step));
        Ok(())
    }

    /// Run every active step's execute against one target's report,
    /// collecting findings in slot order.
    ///
    /// Failures are contained: a step error (or an active broken slot)
    /// becomes an Error finding on this target and the pass continues.
    pub fn run_execute(
        &self,
        ctx: &StepContext<'_>,
        target: BuildTarget,
        report: &BuildReport,
    ) -> Vec<ValidationResult> {
        let mut findings = Vec::new();
        for slot in &self.slots {
            if !slot.active {
                continue;
            }
            match &slot.state {
                SlotState::Resolved(step) => match step.execute(ctx, target, report) {
                    Ok(results) => findings.extend(results),
                    Err(e) => {
                        error!("post-build step '{}' failed: {}", step.display_name(), e);
                        findings.push(ValidationResult::error(format!(
                            "step '{}' failed: {}",
                            step.display_name(),
                            e
                        )));
                    }
                },
                SlotState::Broken { kind, reason } => {
                    findings.push(StepSlot::<dyn PostBuildStep>::structural_finding(
                        kind, reason,
                    ));
                }
            }
        }
        findings
    }
}

impl<S: BuildStep + ?Sized> fmt::Debug for StepPipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepPipeline")
            .field("phase", &self.phase)
            .field("slots", &self.slots)
            .finish()
    }
}
