mod backend;
mod cli;
mod core;
mod execution;

use anyhow::{Context, Result};
use backend::CommandBackend;
use cli::commands::{ApplyCommand, BuildCommand, CheckCommand, TargetsCommand};
use cli::output::*;
use cli::{Cli, Command};
use crate::core::config::{BuildConfig, ConfigFile};
use crate::core::pipeline::StepSlot;
use crate::core::project::{ProjectMetadata, YamlProjectMetadata};
use crate::core::step::{BuildStep, StepDescriptor};
use crate::core::steps::REGISTRY;
use crate::core::target::build_exists;
use execution::{
    AutoConfirm, BuildError, BuildEvent, BuildOrchestrator, NoUnsavedWork, OverwritePrompt,
    RunReport, StdinPrompt,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_BUILDER: &str = "unity-builder";
const DEFAULT_TIMEOUT_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Build(cmd) => run_build(cmd, &cli).await?,
        Command::Apply(cmd) => apply_steps(cmd)?,
        Command::Check(cmd) => check_steps(cmd)?,
        Command::Targets(cmd) => list_targets(cmd)?,
    }

    Ok(())
}

/// Load the config file and split it into the runtime configuration and the
/// project metadata handle. The project root is the config file's directory.
fn load_config(
    file: &str,
    output_override: Option<PathBuf>,
) -> Result<(BuildConfig, Arc<YamlProjectMetadata>)> {
    let path = Path::new(file);
    let config_file = ConfigFile::from_file(path).context("Failed to load build config")?;

    let project_root = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let project = Arc::new(YamlProjectMetadata::new(path, config_file.project.clone()));
    Ok((config_file.into_config(project_root, output_override), project))
}

async fn run_build(cmd: &BuildCommand, cli: &Cli) -> Result<()> {
    let (mut config, project) = load_config(&cmd.file, cmd.output.clone())?;

    println!(
        "{} Loaded build config: {} ({} target(s))",
        INFO,
        style(&project.snapshot().product_name).bold(),
        style(config.targets.len()).cyan()
    );

    let backend = CommandBackend::new(
        cli.builder
            .clone()
            .unwrap_or_else(|| DEFAULT_BUILDER.to_string()),
        config.project_root.clone(),
        cli.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS),
    );

    let overwrite: Arc<dyn OverwritePrompt> = if cmd.yes {
        Arc::new(AutoConfirm)
    } else {
        Arc::new(StdinPrompt)
    };

    let orchestrator = BuildOrchestrator::new(backend, project, overwrite, Arc::new(NoUnsavedWork));

    // Per-event console output plus a bar tracking target progress
    let progress = create_progress_bar(config.targets.len());
    let bar = progress.clone();
    orchestrator.add_event_handler(move |event| {
        if let BuildEvent::TargetStarted {
            target,
            index,
            total,
        } = &event
        {
            bar.set_position(*index as u64);
            bar.set_message(format!("{} ({}/{})", target, index + 1, total));
        }
        bar.println(format_build_event(&event));
    });

    println!();
    let result = orchestrator.run(&mut config, cmd.and_run).await;
    progress.finish_and_clear();

    match result {
        Ok(report) => {
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
            } else {
                for line in report.summary_lines() {
                    println!("{}", line);
                }
                if report.succeeded() {
                    println!(
                        "\n{} Build run completed {}",
                        CHECK,
                        style("successfully").green()
                    );
                } else {
                    println!("\n{} Build run {}", CROSS, style("failed").red());
                }
            }

            if report.succeeded() && cmd.and_run {
                for outcome in &report.outcomes {
                    let executable = outcome.target.executable_path(&outcome.output_path);
                    println!("{} Launched {}", ROCKET, style(executable.display()).dim());
                }
            }

            if !report.succeeded() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            if matches!(e, BuildError::ValidationBlocked) {
                print_step_findings(config.pre_build.slots());
            }
            println!("\n{} Build run {}", CROSS, style("failed").red());
            error!("{}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn apply_steps(cmd: &ApplyCommand) -> Result<()> {
    let (mut config, project) = load_config(&cmd.file, None)?;
    let snapshot = project.snapshot();

    println!("{} Applying pre-build steps...", INFO);
    let options = match config.apply_steps(&snapshot) {
        Ok(options) => options,
        Err(e) => {
            print_step_findings(config.pre_build.slots());
            println!("{} Apply failed: {}", CROSS, style(e).red());
            std::process::exit(1);
        }
    };

    print_step_findings(config.pre_build.slots());

    let applied = config
        .pre_build
        .slots()
        .iter()
        .filter(|slot| slot.is_active())
        .count();
    println!("{} Applied {} step(s)", CHECK, style(applied).cyan());
    println!("  development: {}", style(options.development).cyan());
    println!("  allow_debugging: {}", style(options.allow_debugging).cyan());
    println!("  deep_profiling: {}", style(options.deep_profiling).cyan());
    println!(
        "  wait_for_debugger: {}",
        style(options.wait_for_debugger).cyan()
    );
    println!(
        "  define_symbols: [{}]",
        style(options.define_symbols.join(", ")).cyan()
    );

    Ok(())
}

fn check_steps(cmd: &CheckCommand) -> Result<()> {
    let (mut config, project) = load_config(&cmd.file, None)?;
    let snapshot = project.snapshot();

    config.run_validation(&snapshot);

    if cmd.fix {
        let fixed = config.run_remediations();
        if fixed > 0 {
            println!("{} Ran {} fix action(s), revalidating", INFO, fixed);
            config.run_validation(&snapshot);
        }
    }

    let has_errors = config.pre_build.has_errors() || config.post_build.has_errors();

    if cmd.json {
        let value = serde_json::json!({
            "pre_build": phase_json(config.pre_build.slots()),
            "post_build": phase_json(config.post_build.slots()),
            "buildable": !config.pre_build.has_errors(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_phase("Pre-build", config.pre_build.slots());
        print_phase("Post-build", config.post_build.slots());

        let broken = config.pre_build.slots().iter().any(|s| s.is_broken())
            || config.post_build.slots().iter().any(|s| s.is_broken());
        if broken {
            println!("\n{} Known step kinds:", INFO);
            for descriptor in REGISTRY {
                println!(
                    "  {} {} ({})",
                    style(descriptor.kind).cyan(),
                    style(descriptor.label).bold(),
                    phase_list(descriptor)
                );
            }
        }

        if has_errors {
            println!("\n{} Validation found errors", CROSS);
        } else {
            println!("\n{} Configuration is buildable", CHECK);
        }
    }

    if has_errors {
        std::process::exit(1);
    }
    Ok(())
}

fn list_targets(cmd: &TargetsCommand) -> Result<()> {
    let (config, project) = load_config(&cmd.file, cmd.output.clone())?;
    let snapshot = project.snapshot();

    if cmd.json {
        let data: Vec<_> = config
            .targets
            .iter()
            .map(|target| {
                let path = config.target_path(*target, &snapshot);
                serde_json::json!({
                    "target": target,
                    "output_path": path,
                    "exists": build_exists(&path),
                })
            })
            .collect();
        let value = serde_json::json!({ "targets": data });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{} Resolved output paths:", INFO);
    for target in &config.targets {
        let path = config.target_path(*target, &snapshot);
        if build_exists(&path) {
            println!(
                "  {} {} {}",
                style(target).cyan(),
                path.display(),
                style("(exists, would be overwritten)").yellow()
            );
        } else {
            println!("  {} {}", style(target).cyan(), path.display());
        }
    }

    Ok(())
}

/// Print every finding of every slot, prefixed by the slot's display name
fn print_step_findings<S: BuildStep + ?Sized>(slots: &[StepSlot<S>]) {
    for slot in slots {
        for finding in slot.findings() {
            println!(
                "  {} {}",
                style(slot.display_name()).bold(),
                format_finding(finding)
            );
        }
    }
}

/// Print one pipeline's slots with their state and findings
fn print_phase<S: BuildStep + ?Sized>(label: &str, slots: &[StepSlot<S>]) {
    println!("\n{} {} steps:", INFO, label);
    if slots.is_empty() {
        println!("  (none)");
        return;
    }
    for slot in slots {
        let state = if slot.is_broken() {
            style("broken").red().to_string()
        } else if slot.is_active() {
            style("active").green().to_string()
        } else {
            style("inactive").dim().to_string()
        };
        println!("  {} [{}]", style(slot.display_name()).bold(), state);
        for finding in slot.findings() {
            println!("    {}", format_finding(finding));
        }
    }
}

fn phase_list(descriptor: &StepDescriptor) -> &'static str {
    match (descriptor.pre_build, descriptor.post_build) {
        (true, true) => "pre-build, post-build",
        (true, false) => "pre-build",
        (false, true) => "post-build",
        (false, false) => "unusable",
    }
}

fn phase_json<S: BuildStep + ?Sized>(slots: &[StepSlot<S>]) -> serde_json::Value {
    let entries: Vec<_> = slots
        .iter()
        .map(|slot| {
            serde_json::json!({
                "kind": slot.kind(),
                "display_name": slot.display_name(),
                "active": slot.is_active(),
                "broken": slot.is_broken(),
                "findings": slot
                    .findings()
                    .iter()
                    .map(|finding| serde_json::json!({
                        "severity": finding.severity(),
                        "message": finding.message(),
                        "fix": finding.fix_label(),
                    }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    serde_json::Value::from(entries)
}

fn report_json(report: &RunReport) -> serde_json::Value {
    serde_json::json!({
        "run_id": report.run_id,
        "started_at": report.started_at.to_rfc3339(),
        "product_version": report.product_version,
        "succeeded": report.succeeded(),
        "cancelled": report.cancelled.map(|reason| reason.to_string()),
        "outcomes": report
            .outcomes
            .iter()
            .map(|outcome| serde_json::json!({
                "target": outcome.target,
                "output_path": outcome.output_path,
                "succeeded": outcome.succeeded(),
                "backend_succeeded": outcome.backend_succeeded,
                "elapsed_secs": outcome.elapsed_secs,
                "output_size_bytes": outcome.output_size_bytes,
                "findings": outcome
                    .findings
                    .iter()
                    .map(|finding| serde_json::json!({
                        "severity": finding.severity(),
                        "message": finding.message(),
                    }))
                    .collect::<Vec<_>>(),
            }))
            .collect::<Vec<_>>(),
    })
}
