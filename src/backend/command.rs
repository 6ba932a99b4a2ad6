//! Builder CLI subprocess backend

use crate::backend::{BackendError, BuildBackend, BuildReport, BuildRequest};
use crate::core::target::BuildTarget;
use async_trait::async_trait;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Backend that drives an external builder executable.
///
/// One invocation per operation: `active-target` prints the current target,
/// `switch-target <t>` changes it, `build ...` produces an artifact and
/// prints a JSON report on stdout. The builder owns a single process-wide
/// active target, so invocations are serialized behind a mutex.
#[derive(Debug)]
pub struct CommandBackend {
    /// Path to the builder executable
    builder_path: String,

    /// Project the builder operates on
    project_root: PathBuf,

    /// Timeout for one invocation in seconds
    timeout_secs: u64,

    gate: Mutex<()>,
}

impl CommandBackend {
    /// Create a new subprocess backend
    ///
    /// # Arguments
    /// * `builder_path` - Path to the builder executable (e.g., "unity-builder")
    /// * `project_root` - Root of the project to build
    /// * `timeout_secs` - Timeout for one invocation in seconds
    pub fn new(builder_path: String, project_root: PathBuf, timeout_secs: u64) -> Self {
        Self {
            builder_path,
            project_root,
            timeout_secs,
            gate: Mutex::new(()),
        }
    }

    /// Run the builder with `args`, enforcing the timeout.
    ///
    /// Exit status is left to the caller: `build` treats a bad exit as a
    /// failed report, the target operations treat it as a backend error.
    async fn invoke(&self, args: &[String]) -> Result<std::process::Output, BackendError> {
        debug!("invoking builder: {} {}", self.builder_path, args.join(" "));

        let timeout_duration = Duration::from_secs(self.timeout_secs);

        let result = timeout(
            timeout_duration,
            Command::new(&self.builder_path)
                .arg("--project")
                .arg(&self.project_root)
                .args(args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| BackendError::Timeout(self.timeout_secs))?;

        result.map_err(|e| BackendError::Internal(format!("failed to spawn builder: {}", e)))
    }
}

#[async_trait]
impl BuildBackend for CommandBackend {
    async fn active_target(&self) -> Result<BuildTarget, BackendError> {
        let _gate = self.gate.lock().await;
        let output = self.invoke(&["active-target".to_string()]).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::Builder(format!(
                "active-target exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        BuildTarget::from_str(stdout.trim()).map_err(BackendError::Builder)
    }

    async fn switch_active_target(&self, target: BuildTarget) -> Result<(), BackendError> {
        let _gate = self.gate.lock().await;
        debug!("switching builder to {}", target);
        let output = self
            .invoke(&["switch-target".to_string(), target.as_str().to_string()])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::Builder(format!(
                "switch to {} exited with code {}: {}",
                target,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn build(&self, request: &BuildRequest) -> Result<BuildReport, BackendError> {
        let _gate = self.gate.lock().await;
        let args = build_args(request);
        let started = Instant::now();

        let output = self.invoke(&args).await?;
        let elapsed = started.elapsed().as_secs_f64();

        let report = decode_report(
            &output.stdout,
            &output.stderr,
            output.status.success(),
            request,
            elapsed,
        );
        if !report.succeeded {
            warn!(
                "builder reported failure for {} after {:.1}s",
                request.target, elapsed
            );
        }
        Ok(report)
    }
}

/// Command-line arguments for one build invocation
fn build_args(request: &BuildRequest) -> Vec<String> {
    let mut args = vec![
        "build".to_string(),
        "--target".to_string(),
        request.target.as_str().to_string(),
        "--output".to_string(),
        request.output_path.to_string_lossy().into_owned(),
    ];
    for scene in &request.scenes {
        args.push("--scene".to_string());
        args.push(scene.clone());
    }
    let options = &request.options;
    if options.development {
        args.push("--development".to_string());
    }
    if options.allow_debugging {
        args.push("--allow-debugging".to_string());
    }
    if options.deep_profiling {
        args.push("--deep-profiling".to_string());
    }
    if options.wait_for_debugger {
        args.push("--wait-for-debugger".to_string());
    }
    if options.auto_run {
        args.push("--run".to_string());
    }
    for symbol in &options.define_symbols {
        args.push("--define".to_string());
        args.push(symbol.clone());
    }
    args
}

/// Turn a finished build invocation into a report.
///
/// Preferred form is a JSON report on stdout. Builders that print nothing
/// useful fall back to the exit status, with stderr as the diagnostics.
fn decode_report(
    stdout: &[u8],
    stderr: &[u8],
    exit_ok: bool,
    request: &BuildRequest,
    elapsed_secs: f64,
) -> BuildReport {
    match serde_json::from_slice::<BuildReport>(stdout) {
        Ok(mut report) => {
            if report.output_path.as_os_str().is_empty() {
                report.output_path = request.output_path.clone();
            }
            report
        }
        Err(_) => BuildReport {
            succeeded: exit_ok,
            elapsed_secs,
            output_size_bytes: 0,
            diagnostics: String::from_utf8_lossy(stderr).trim().to_string(),
            output_path: request.output_path.clone(),
        },
    }
}
