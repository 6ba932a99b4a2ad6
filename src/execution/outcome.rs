//! Per-target outcomes and the run-level report

use crate::backend::BuildReport;
use crate::core::target::BuildTarget;
use crate::core::validation::ValidationResult;
use chrono::{DateTime, Local};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Why a run ended before the target loop started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    OverwriteDeclined,
    SaveDeclined,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::OverwriteDeclined => f.write_str("overwrite declined"),
            CancelReason::SaveDeclined => f.write_str("unsaved work was not saved"),
        }
    }
}

/// The recorded result of building one target.
///
/// Created during the run, consumed by the summary, not persisted.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub target: BuildTarget,
    pub output_path: PathBuf,
    pub backend_succeeded: bool,
    pub elapsed_secs: f64,
    pub output_size_bytes: u64,
    pub finished_at: DateTime<Local>,

    /// Post-build findings for this target, in step order
    pub findings: Vec<ValidationResult>,
}

impl BuildOutcome {
    pub fn new(
        target: BuildTarget,
        output_path: PathBuf,
        report: &BuildReport,
        findings: Vec<ValidationResult>,
    ) -> Self {
        Self {
            target,
            output_path,
            backend_succeeded: report.succeeded,
            elapsed_secs: report.elapsed_secs,
            output_size_bytes: report.output_size_bytes,
            finished_at: Local::now(),
            findings,
        }
    }

    pub fn has_error_findings(&self) -> bool {
        self.findings.iter().any(ValidationResult::is_error)
    }

    /// A target counts as built only when the backend succeeded and no
    /// post-build check found an Error
    pub fn succeeded(&self) -> bool {
        self.backend_succeeded && !self.has_error_findings()
    }

    /// One-line success message for the end-of-run summary
    pub fn success_line(&self, version: &str) -> String {
        format!(
            "[{}] Build {} v{} successful! ({:.1}s) {}MB. At {}",
            self.finished_at.format("%H:%M"),
            self.target,
            version,
            self.elapsed_secs,
            self.output_size_bytes / 1024 / 1024,
            self.output_path.display()
        )
    }
}

/// Everything one orchestration run produced
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Local>,
    pub product_version: String,

    /// Set when a pre-loop gate stopped the run
    pub cancelled: Option<CancelReason>,

    /// One entry per attempted target, in build order. Targets skipped by
    /// a batch abort have no entry.
    pub outcomes: Vec<BuildOutcome>,
}

impl RunReport {
    pub fn new(run_id: Uuid, product_version: impl Into<String>) -> Self {
        Self {
            run_id,
            started_at: Local::now(),
            product_version: product_version.into(),
            cancelled: None,
            outcomes: Vec::new(),
        }
    }

    pub fn cancelled(
        run_id: Uuid,
        product_version: impl Into<String>,
        reason: CancelReason,
    ) -> Self {
        let mut report = Self::new(run_id, product_version);
        report.cancelled = Some(reason);
        report
    }

    /// True only when no gate cancelled the run and every attempted target
    /// succeeded. Targets skipped by a batch abort never make the report,
    /// but the aborting target's failed outcome already fails the run.
    pub fn succeeded(&self) -> bool {
        self.cancelled.is_none() && self.outcomes.iter().all(BuildOutcome::succeeded)
    }

    /// The end-of-run summary: success lines re-stated per target (build
    /// output tends to bury the originals), then every target's post-build
    /// findings in order.
    pub fn summary_lines(&self) -> Vec<String> {
        if let Some(reason) = self.cancelled {
            return vec![format!("Build cancelled: {}", reason)];
        }

        let mut lines = Vec::new();
        for outcome in self.outcomes.iter().filter(|o| o.succeeded()) {
            lines.push(outcome.success_line(&self.product_version));
        }
        for outcome in &self.outcomes {
            if !outcome.backend_succeeded {
                lines.push(format!(
                    "Build {} failed: {}",
                    outcome.target,
                    if outcome.findings.is_empty() {
                        "backend reported errors"
                    } else {
                        "see findings below"
                    }
                ));
            }
        }
        for outcome in &self.outcomes {
            if outcome.findings.is_empty() {
                continue;
            }
            lines.push(format!(
                "Post-build checks for {} v{}",
                outcome.target, self.product_version
            ));
            for finding in &outcome.findings {
                lines.push(format!("  [{}] {}", finding.severity(), finding.message()));
            }
        }
        lines
    }
}
