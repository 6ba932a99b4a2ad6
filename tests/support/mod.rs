//! Shared test doubles for the orchestration tests

#![allow(dead_code)]

use async_trait::async_trait;
use multibuild::backend::{BackendError, BuildBackend, BuildReport, BuildRequest};
use multibuild::core::config::{BuildConfig, ConfigFile};
use multibuild::core::project::{ProjectMetadata, ProjectSnapshot};
use multibuild::core::step::{BuildStep, PostBuildStep, StepContext, StepError};
use multibuild::core::target::BuildTarget;
use multibuild::core::validation::ValidationResult;
use multibuild::execution::{OverwritePrompt, UnsavedWorkGuard};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Backend double: records every switch and build request, and reports a
/// failed build for scripted targets. Clones share the recorders, so a test
/// can keep one copy and hand the other to the orchestrator.
#[derive(Clone)]
pub struct MockBackend {
    initial: BuildTarget,
    fail_targets: Vec<BuildTarget>,
    switches: Arc<Mutex<Vec<BuildTarget>>>,
    requests: Arc<Mutex<Vec<BuildRequest>>>,
}

impl MockBackend {
    pub fn new(initial: BuildTarget) -> Self {
        Self {
            initial,
            fail_targets: Vec::new(),
            switches: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script the backend to report a failed build for `target`
    pub fn failing_on(mut self, target: BuildTarget) -> Self {
        self.fail_targets.push(target);
        self
    }

    /// Targets built so far, in invocation order
    pub fn built_targets(&self) -> Vec<BuildTarget> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.target)
            .collect()
    }

    /// Every build request received, in invocation order
    pub fn requests(&self) -> Vec<BuildRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Every switch performed, in invocation order
    pub fn switch_sequence(&self) -> Vec<BuildTarget> {
        self.switches.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildBackend for MockBackend {
    async fn active_target(&self) -> Result<BuildTarget, BackendError> {
        let switches = self.switches.lock().unwrap();
        Ok(*switches.last().unwrap_or(&self.initial))
    }

    async fn switch_active_target(&self, target: BuildTarget) -> Result<(), BackendError> {
        self.switches.lock().unwrap().push(target);
        Ok(())
    }

    async fn build(&self, request: &BuildRequest) -> Result<BuildReport, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_targets.contains(&request.target) {
            Ok(BuildReport {
                succeeded: false,
                elapsed_secs: 0.4,
                output_size_bytes: 0,
                diagnostics: format!("scripted failure for {}", request.target),
                output_path: request.output_path.clone(),
            })
        } else {
            Ok(BuildReport {
                succeeded: true,
                elapsed_secs: 30.0,
                output_size_bytes: 64 * 1024 * 1024,
                diagnostics: String::new(),
                output_path: request.output_path.clone(),
            })
        }
    }
}

/// Project double with a fixed snapshot and a countable increment
pub struct MockProject {
    increments: AtomicUsize,
}

impl MockProject {
    pub fn new() -> Self {
        Self {
            increments: AtomicUsize::new(0),
        }
    }

    pub fn increment_count(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }
}

impl ProjectMetadata for MockProject {
    fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            product_name: "Gravity Well".to_string(),
            version: "1.4.0".to_string(),
            build_number: "42".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        }
    }

    fn increment_build_number(&self) {
        self.increments.fetch_add(1, Ordering::SeqCst);
    }
}

/// Overwrite prompt scripted to accept or decline, recording what it was
/// shown
pub struct ScriptedPrompt {
    accept: bool,
    shown: Mutex<Vec<PathBuf>>,
}

impl ScriptedPrompt {
    pub fn accepting() -> Self {
        Self {
            accept: true,
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn declining() -> Self {
        Self {
            accept: false,
            shown: Mutex::new(Vec::new()),
        }
    }

    /// Paths presented for confirmation across all calls
    pub fn shown(&self) -> Vec<PathBuf> {
        self.shown.lock().unwrap().clone()
    }
}

impl OverwritePrompt for ScriptedPrompt {
    fn confirm_overwrite(&self, candidates: &[PathBuf]) -> bool {
        self.shown.lock().unwrap().extend(candidates.iter().cloned());
        self.accept
    }
}

/// Save guard scripted to accept or veto
pub struct ScriptedSaveGuard {
    accept: bool,
}

impl ScriptedSaveGuard {
    pub fn accepting() -> Self {
        Self { accept: true }
    }

    pub fn declining() -> Self {
        Self { accept: false }
    }
}

impl UnsavedWorkGuard for ScriptedSaveGuard {
    fn confirm_save_if_needed(&self) -> bool {
        self.accept
    }
}

/// Post-build double emitting one scripted finding for one target and
/// nothing for the others
pub struct ScriptedCheck {
    target: BuildTarget,
    finding: ValidationResult,
}

impl ScriptedCheck {
    pub fn error_on(target: BuildTarget, message: &str) -> Self {
        Self {
            target,
            finding: ValidationResult::error(message),
        }
    }

    pub fn info_on(target: BuildTarget, message: &str) -> Self {
        Self {
            target,
            finding: ValidationResult::info(message),
        }
    }
}

impl BuildStep for ScriptedCheck {
    fn kind(&self) -> &'static str {
        "scripted_check"
    }

    fn display_name(&self) -> String {
        "Scripted Check".to_string()
    }

    fn validate(&self, _ctx: &StepContext<'_>) -> Vec<ValidationResult> {
        Vec::new()
    }
}

impl PostBuildStep for ScriptedCheck {
    fn execute(
        &self,
        _ctx: &StepContext<'_>,
        target: BuildTarget,
        _report: &BuildReport,
    ) -> Result<Vec<ValidationResult>, StepError> {
        if target == self.target {
            Ok(vec![self.finding.clone()])
        } else {
            Ok(Vec::new())
        }
    }
}

/// Materialize a config with the standard project block and `{target}` as
/// the per-target subfolder, rooted at `root`
pub fn plain_config(targets: &str, root: &Path) -> BuildConfig {
    let yaml = format!(
        "project:\n  name: Gravity Well\n  version: 1.4.0\n  build_number: \"42\"\noutput_folder: builds\ncustom_path: \"{{target}}\"\ntargets: [{}]\n",
        targets
    );
    ConfigFile::from_yaml(&yaml)
        .unwrap()
        .into_config(root.to_path_buf(), None)
}

/// Parse and materialize an arbitrary config rooted at `root`
pub fn config_from_yaml(yaml: &str, root: &Path) -> BuildConfig {
    ConfigFile::from_yaml(yaml)
        .unwrap()
        .into_config(root.to_path_buf(), None)
}
