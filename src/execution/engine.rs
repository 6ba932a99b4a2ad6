//! Build orchestrator - drives the multi-target run end to end

use crate::backend::{BackendError, BuildBackend, BuildRequest};
use crate::core::config::BuildConfig;
use crate::core::project::ProjectMetadata;
use crate::core::step::{BuildOptions, StepContext, StepError};
use crate::core::target::{build_exists, BuildTarget};
use crate::execution::gates::{OverwritePrompt, UnsavedWorkGuard};
use crate::execution::outcome::{BuildOutcome, CancelReason, RunReport};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Directory name build output must never land in
const RESERVED_DIR: &str = "Assets";

/// Events that can occur during a build run
#[derive(Debug, Clone)]
pub enum BuildEvent {
    RunStarted {
        run_id: Uuid,
        targets: Vec<BuildTarget>,
    },
    RunCancelled {
        reason: CancelReason,
    },
    TargetStarted {
        target: BuildTarget,
        index: usize,
        total: usize,
    },
    TargetSwitched {
        from: BuildTarget,
        to: BuildTarget,
    },
    TargetBuilt {
        target: BuildTarget,
        output_path: PathBuf,
        elapsed_secs: f64,
        size_bytes: u64,
    },
    TargetFailed {
        target: BuildTarget,
        diagnostics: String,
    },
    ChecksFailed {
        target: BuildTarget,
        errors: usize,
    },
    RunCompleted {
        run_id: Uuid,
        succeeded: bool,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(BuildEvent) + Send + Sync>;

/// Hard failures that abort a run outright.
///
/// Gate cancellations are not errors; they come back as a cancelled
/// [`RunReport`]. A backend that reports a failed build is not an error
/// either, it becomes a failed outcome and aborts the batch.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("a pre-build step reports a validation error; fix the configuration first")]
    ValidationBlocked,

    #[error("refusing to build {} into a folder named '{}': {}", .target, RESERVED_DIR, .path.display())]
    ReservedPath { target: BuildTarget, path: PathBuf },

    #[error(transparent)]
    Step(#[from] StepError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// The multi-target build loop.
///
/// One orchestrator drives one backend; a configuration may be run through
/// it many times. The sequence per run: confirm overwrites, honor the
/// unsaved-work guard, apply pre-build steps once, reorder targets so the
/// backend's current one goes first, then build serially with post-build
/// checks per target, increment the build number, and restore the original
/// active target.
pub struct BuildOrchestrator<B> {
    backend: B,
    project: Arc<dyn ProjectMetadata>,
    overwrite: Arc<dyn OverwritePrompt>,
    save_guard: Arc<dyn UnsavedWorkGuard>,
    event_handlers: Mutex<Vec<EventHandler>>,
}

impl<B: BuildBackend> BuildOrchestrator<B> {
    pub fn new(
        backend: B,
        project: Arc<dyn ProjectMetadata>,
        overwrite: Arc<dyn OverwritePrompt>,
        save_guard: Arc<dyn UnsavedWorkGuard>,
    ) -> Self {
        Self {
            backend,
            project,
            overwrite,
            save_guard,
            event_handlers: Mutex::new(Vec::new()),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(BuildEvent) + Send + Sync + 'static,
    {
        if let Ok(mut handlers) = self.event_handlers.lock() {
            handlers.push(Arc::new(handler));
        }
    }

    /// Emit an event to all handlers
    fn emit(&self, event: BuildEvent) {
        if let Ok(handlers) = self.event_handlers.lock() {
            for handler in handlers.iter() {
                handler(event.clone());
            }
        }
    }

    /// Execute the full build sequence for `config`.
    ///
    /// `Ok` covers completed runs and gate cancellations; check the report.
    /// `Err` is reserved for hard aborts: blocked validation, a pre-build
    /// step failure, the reserved-path check and backend transport errors.
    pub async fn run(
        &self,
        config: &mut BuildConfig,
        auto_run: bool,
    ) -> Result<RunReport, BuildError> {
        let run_id = Uuid::new_v4();
        let snapshot = self.project.snapshot();
        let mut report = RunReport::new(run_id, snapshot.version.clone());

        info!(
            "starting build run {} for {} target(s)",
            run_id,
            config.targets.len()
        );

        // An Error on any pre-build step blocks the run outright. Post-build
        // findings never gate the start; they describe artifacts that do not
        // exist yet.
        config.run_validation(&snapshot);
        if config.pre_build.has_errors() {
            return Err(BuildError::ValidationBlocked);
        }

        let existing: Vec<PathBuf> = config
            .targets
            .iter()
            .map(|target| config.target_path(*target, &snapshot))
            .filter(|path| build_exists(path))
            .collect();
        if !existing.is_empty() && !self.overwrite.confirm_overwrite(&existing) {
            warn!("building cancelled: overwrite declined");
            self.emit(BuildEvent::RunCancelled {
                reason: CancelReason::OverwriteDeclined,
            });
            return Ok(RunReport::cancelled(
                run_id,
                snapshot.version,
                CancelReason::OverwriteDeclined,
            ));
        }

        if !self.save_guard.confirm_save_if_needed() {
            warn!("building cancelled: unsaved work was not saved");
            self.emit(BuildEvent::RunCancelled {
                reason: CancelReason::SaveDeclined,
            });
            return Ok(RunReport::cancelled(
                run_id,
                snapshot.version,
                CancelReason::SaveDeclined,
            ));
        }

        self.emit(BuildEvent::RunStarted {
            run_id,
            targets: config.targets.clone(),
        });

        // Apply pre-build steps exactly once so every target in the run
        // shares one build configuration.
        let ctx = StepContext {
            project: &snapshot,
            targets: &config.targets,
        };
        let mut options = BuildOptions::default();
        config.pre_build.run_apply(&ctx, &mut options)?;
        options.auto_run = auto_run;

        // Switching the active target is expensive; start with whichever
        // target needs no switch.
        let original_target = self.backend.active_target().await?;
        let targets = reorder_targets(&config.targets, original_target);
        let mut current_target = original_target;

        let mut fatal: Option<BuildError> = None;
        let total = targets.len();

        for (index, target) in targets.iter().copied().enumerate() {
            self.emit(BuildEvent::TargetStarted {
                target,
                index,
                total,
            });

            let output_path = config.target_path(target, &snapshot);

            // Never write build output into the live source tree.
            if lands_in_reserved_dir(&output_path) {
                error!(
                    "refusing to build {} into {}",
                    target,
                    output_path.display()
                );
                fatal = Some(BuildError::ReservedPath {
                    target,
                    path: output_path,
                });
                break;
            }

            if target != current_target {
                debug!("switching active target {} -> {}", current_target, target);
                match self.backend.switch_active_target(target).await {
                    Ok(()) => {
                        self.emit(BuildEvent::TargetSwitched {
                            from: current_target,
                            to: target,
                        });
                        current_target = target;
                    }
                    Err(e) => {
                        fatal = Some(BuildError::Backend(e));
                        break;
                    }
                }
            }

            info!("building {} to {}", target, output_path.display());
            let request = BuildRequest {
                target,
                output_path: output_path.clone(),
                scenes: config.scenes.clone(),
                options: options.clone(),
            };
            let build_report = match self.backend.build(&request).await {
                Ok(build_report) => build_report,
                Err(e) => {
                    fatal = Some(BuildError::Backend(e));
                    break;
                }
            };

            if !build_report.succeeded {
                // A broken compile state is assumed to poison the rest of
                // the batch; remaining targets are skipped, not attempted.
                error!("aborting builds because {} had errors", target);
                self.emit(BuildEvent::TargetFailed {
                    target,
                    diagnostics: build_report.diagnostics.clone(),
                });
                report
                    .outcomes
                    .push(BuildOutcome::new(target, output_path, &build_report, vec![]));
                break;
            }

            let findings = config.post_build.run_execute(&ctx, target, &build_report);
            let error_count = findings.iter().filter(|f| f.is_error()).count();
            let outcome = BuildOutcome::new(target, output_path, &build_report, findings);

            if error_count > 0 {
                error!(
                    "build {} v{} post-build checks failed!",
                    target, snapshot.version
                );
                self.emit(BuildEvent::ChecksFailed {
                    target,
                    errors: error_count,
                });
            } else {
                info!("build {} v{} successful!", target, snapshot.version);
                self.emit(BuildEvent::TargetBuilt {
                    target,
                    output_path: outcome.output_path.clone(),
                    elapsed_secs: outcome.elapsed_secs,
                    size_bytes: outcome.output_size_bytes,
                });
            }
            report.outcomes.push(outcome);
        }

        // The counter moves once per run and only after the loop, so every
        // target in the run renders the same paths. Hard aborts leave it
        // untouched.
        if fatal.is_none() {
            self.project.increment_build_number();
        }

        if current_target != original_target {
            info!("restoring active target to {}", original_target);
            match self.backend.switch_active_target(original_target).await {
                Ok(()) => self.emit(BuildEvent::TargetSwitched {
                    from: current_target,
                    to: original_target,
                }),
                Err(e) => {
                    // A fatal error from the loop outranks the failed restore.
                    if fatal.is_some() {
                        error!("failed to restore active target {}: {}", original_target, e);
                    } else {
                        fatal = Some(BuildError::Backend(e));
                    }
                }
            }
        }

        if let Some(fatal) = fatal {
            self.emit(BuildEvent::RunCompleted {
                run_id,
                succeeded: false,
            });
            return Err(fatal);
        }

        // Re-log the per-target results; backend output tends to bury the
        // originals.
        for outcome in report.outcomes.iter().filter(|o| o.succeeded()) {
            info!("{}", outcome.success_line(&report.product_version));
        }
        for outcome in &report.outcomes {
            if !outcome.findings.is_empty() {
                info!(
                    "post-build checks for {} v{}",
                    outcome.target, report.product_version
                );
                for finding in &outcome.findings {
                    finding.log();
                }
            }
        }

        let succeeded = report.succeeded();
        info!("build run {} finished: succeeded={}", run_id, succeeded);
        self.emit(BuildEvent::RunCompleted { run_id, succeeded });
        Ok(report)
    }
}

/// Move the backend's current target to the front so the first build needs
/// no switch. The rest keep their relative order.
fn reorder_targets(targets: &[BuildTarget], active: BuildTarget) -> Vec<BuildTarget> {
    let mut ordered = targets.to_vec();
    if let Some(index) = ordered.iter().position(|t| *t == active) {
        let target = ordered.remove(index);
        ordered.insert(0, target);
    }
    ordered
}

/// Whether any component of `path` is the reserved source-asset directory
fn lands_in_reserved_dir(path: &Path) -> bool {
    path.components()
        .any(|component| component.as_os_str() == RESERVED_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BuildReport;
    use crate::core::config::ConfigFile;
    use crate::core::project::ProjectSnapshot;
    use crate::execution::gates::{AutoConfirm, NoUnsavedWork};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingBackend {
        active: BuildTarget,
        switches: Mutex<Vec<BuildTarget>>,
        builds: Mutex<Vec<BuildTarget>>,
    }

    impl RecordingBackend {
        fn new(active: BuildTarget) -> Self {
            Self {
                active,
                switches: Mutex::new(Vec::new()),
                builds: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BuildBackend for RecordingBackend {
        async fn active_target(&self) -> Result<BuildTarget, BackendError> {
            let switches = self.switches.lock().unwrap();
            Ok(*switches.last().unwrap_or(&self.active))
        }

        async fn switch_active_target(&self, target: BuildTarget) -> Result<(), BackendError> {
            self.switches.lock().unwrap().push(target);
            Ok(())
        }

        async fn build(&self, request: &BuildRequest) -> Result<BuildReport, BackendError> {
            self.builds.lock().unwrap().push(request.target);
            Ok(BuildReport {
                succeeded: true,
                elapsed_secs: 1.0,
                output_size_bytes: 0,
                diagnostics: String::new(),
                output_path: request.output_path.clone(),
            })
        }
    }

    struct FixedProject {
        increments: AtomicUsize,
    }

    impl FixedProject {
        fn new() -> Self {
            Self {
                increments: AtomicUsize::new(0),
            }
        }
    }

    impl ProjectMetadata for FixedProject {
        fn snapshot(&self) -> ProjectSnapshot {
            ProjectSnapshot::fixture()
        }

        fn increment_build_number(&self) {
            self.increments.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn two_target_config() -> BuildConfig {
        ConfigFile::from_yaml(
            "project:\n  name: Game\noutput_folder: builds\ncustom_path: \"{target}\"\ntargets: [StandaloneWindows64, StandaloneOSX]\n",
        )
        .unwrap()
        .into_config(PathBuf::from("/proj"), None)
    }

    #[test]
    fn test_reorder_moves_active_to_front_preserving_rest() {
        let targets = [
            BuildTarget::Android,
            BuildTarget::Ios,
            BuildTarget::StandaloneOSX,
            BuildTarget::WebGL,
        ];
        let ordered = reorder_targets(&targets, BuildTarget::StandaloneOSX);
        assert_eq!(
            ordered,
            vec![
                BuildTarget::StandaloneOSX,
                BuildTarget::Android,
                BuildTarget::Ios,
                BuildTarget::WebGL,
            ]
        );
    }

    #[test]
    fn test_reorder_without_active_is_identity() {
        let targets = [BuildTarget::Android, BuildTarget::Ios];
        assert_eq!(
            reorder_targets(&targets, BuildTarget::WebGL),
            targets.to_vec()
        );
        assert_eq!(
            reorder_targets(&targets, BuildTarget::Android),
            targets.to_vec()
        );
    }

    #[test]
    fn test_reserved_dir_matches_components_not_substrings() {
        assert!(lands_in_reserved_dir(Path::new("/proj/Assets/Game")));
        assert!(lands_in_reserved_dir(Path::new("Assets")));
        assert!(!lands_in_reserved_dir(Path::new("/proj/MyAssets/Game")));
        assert!(!lands_in_reserved_dir(Path::new("/proj/builds/Game")));
    }

    #[tokio::test]
    async fn test_run_builds_active_target_first_and_restores() {
        let backend = RecordingBackend::new(BuildTarget::StandaloneOSX);
        let project = Arc::new(FixedProject::new());
        let orchestrator = BuildOrchestrator::new(
            backend,
            project.clone(),
            Arc::new(AutoConfirm),
            Arc::new(NoUnsavedWork),
        );

        let mut config = two_target_config();
        let report = orchestrator.run(&mut config, false).await.unwrap();

        assert!(report.succeeded());
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].target, BuildTarget::StandaloneOSX);
        assert_eq!(report.outcomes[1].target, BuildTarget::StandaloneWindows64);

        let builds = orchestrator.backend.builds.lock().unwrap().clone();
        assert_eq!(
            builds,
            vec![BuildTarget::StandaloneOSX, BuildTarget::StandaloneWindows64]
        );
        // one switch into Windows, one back to the original
        let switches = orchestrator.backend.switches.lock().unwrap().clone();
        assert_eq!(
            switches,
            vec![BuildTarget::StandaloneWindows64, BuildTarget::StandaloneOSX]
        );
        assert_eq!(project.increments.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_events_arrive_in_run_order() {
        let backend = RecordingBackend::new(BuildTarget::StandaloneOSX);
        let orchestrator = BuildOrchestrator::new(
            backend,
            Arc::new(FixedProject::new()),
            Arc::new(AutoConfirm),
            Arc::new(NoUnsavedWork),
        );

        let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        orchestrator.add_event_handler(move |event| {
            let tag = match event {
                BuildEvent::RunStarted { .. } => "run_started",
                BuildEvent::RunCancelled { .. } => "run_cancelled",
                BuildEvent::TargetStarted { .. } => "target_started",
                BuildEvent::TargetSwitched { .. } => "target_switched",
                BuildEvent::TargetBuilt { .. } => "target_built",
                BuildEvent::TargetFailed { .. } => "target_failed",
                BuildEvent::ChecksFailed { .. } => "checks_failed",
                BuildEvent::RunCompleted { .. } => "run_completed",
            };
            sink.lock().unwrap().push(tag.to_string());
        });

        let mut config = two_target_config();
        orchestrator.run(&mut config, false).await.unwrap();

        let events = events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "run_started",
                "target_started",
                "target_built",
                "target_started",
                "target_switched",
                "target_built",
                "target_switched", // restore
                "run_completed",
            ]
        );
    }
}
