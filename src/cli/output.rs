//! CLI output formatting

use crate::core::validation::{Severity, ValidationResult};
use crate::execution::BuildEvent;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar sized to the number of targets
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a severity tag for display
pub fn format_severity(severity: Severity) -> String {
    match severity {
        Severity::Info => style("INFO").dim().to_string(),
        Severity::Warning => style("WARNING").yellow().to_string(),
        Severity::Error => style("ERROR").red().to_string(),
    }
}

/// Format one validation finding, with its fix label when present
pub fn format_finding(finding: &ValidationResult) -> String {
    let icon = match finding.severity() {
        Severity::Error => CROSS,
        Severity::Warning => WARN,
        Severity::Info => INFO,
    };
    match finding.fix_label() {
        Some(label) => format!(
            "{}{}: {} {}",
            icon,
            format_severity(finding.severity()),
            finding.message(),
            style(format!("(fix available: {})", label)).dim()
        ),
        None => format!(
            "{}{}: {}",
            icon,
            format_severity(finding.severity()),
            finding.message()
        ),
    }
}

/// Format a build event for display
pub fn format_build_event(event: &BuildEvent) -> String {
    match event {
        BuildEvent::RunStarted { run_id, targets } => format!(
            "{} Starting build run ({}) for {} target(s)",
            ROCKET,
            style(&run_id.to_string()[..8]).dim(),
            style(targets.len()).cyan()
        ),
        BuildEvent::RunCancelled { reason } => {
            format!("{} Build cancelled: {}", WARN, style(reason).yellow())
        }
        BuildEvent::TargetStarted {
            target,
            index,
            total,
        } => format!(
            "{} Building {} ({}/{})",
            SPINNER,
            style(target).cyan(),
            index + 1,
            total
        ),
        BuildEvent::TargetSwitched { from, to } => format!(
            "{} Active target {} → {}",
            INFO,
            style(from).dim(),
            style(to).cyan()
        ),
        BuildEvent::TargetBuilt {
            target,
            output_path,
            elapsed_secs,
            size_bytes,
        } => format!(
            "{} {} ({:.1}s, {}MB) at {}",
            CHECK,
            style(target).green(),
            elapsed_secs,
            size_bytes / 1024 / 1024,
            style(output_path.display()).dim()
        ),
        BuildEvent::TargetFailed {
            target,
            diagnostics,
        } => {
            if diagnostics.is_empty() {
                format!("{} {} failed", CROSS, style(target).red())
            } else {
                format!(
                    "{} {} failed:\n{}",
                    CROSS,
                    style(target).red(),
                    format_diagnostics(diagnostics, 5)
                )
            }
        }
        BuildEvent::ChecksFailed { target, errors } => format!(
            "{} {} post-build checks failed ({} error(s))",
            CROSS,
            style(target).red(),
            errors
        ),
        BuildEvent::RunCompleted { run_id, succeeded } => {
            let status = if *succeeded {
                style("succeeded").green().to_string()
            } else {
                style("failed").red().to_string()
            };
            format!(
                "{} Build run ({}) {}",
                INFO,
                style(&run_id.to_string()[..8]).dim(),
                status
            )
        }
    }
}

/// Format backend diagnostics with truncation
pub fn format_diagnostics(diagnostics: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = diagnostics.lines().collect();

    if lines.len() <= max_lines {
        diagnostics.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}
