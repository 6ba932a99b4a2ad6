//! Post-build check that an expected file or folder was produced

use crate::backend::BuildReport;
use crate::core::step::{BuildStep, PostBuildStep, StepContext, StepError};
use crate::core::target::BuildTarget;
use crate::core::validation::ValidationResult;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// Directory the relative path is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// The folder the artifact itself landed in
    BuildFolder,
    /// The target family's game data directory next to the artifact
    GameData,
}

/// Kind of filesystem entry expected at the path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expect {
    File,
    Folder,
}

impl fmt::Display for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expect::File => f.write_str("File"),
            Expect::Folder => f.write_str("Folder"),
        }
    }
}

/// Probes the produced artifact for a file or folder that must ship with it.
///
/// A missing entry is an Error finding on that target's outcome; a present
/// one is reported as Info so the summary shows the probe ran.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyFileExists {
    relative_path: String,
    location: Location,
    expect: Expect,
}

impl Default for VerifyFileExists {
    fn default() -> Self {
        Self {
            relative_path: String::new(),
            location: Location::BuildFolder,
            expect: Expect::File,
        }
    }
}

impl VerifyFileExists {
    pub fn new(relative_path: impl Into<String>, location: Location, expect: Expect) -> Self {
        Self {
            relative_path: relative_path.into(),
            location,
            expect,
        }
    }

    pub fn from_params(params: &Mapping) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_value(Value::Mapping(params.clone()))
    }

    /// Directory `relative_path` is resolved against for one target.
    ///
    /// The game data directory is a platform convention: macOS keeps it
    /// inside the `.app` bundle, Windows next to the executable in
    /// `<product>_Data`. Targets without a known convention fall back to
    /// the build folder.
    fn base_dir(
        &self,
        ctx: &StepContext<'_>,
        target: BuildTarget,
        output: &Path,
    ) -> Result<PathBuf, String> {
        let build_dir = output
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| format!("unable to get directory from output path: {}", output.display()))?;

        Ok(match self.location {
            Location::BuildFolder => build_dir,
            Location::GameData => match target {
                BuildTarget::StandaloneOSX => target
                    .executable_path(output)
                    .join("Contents")
                    .join("Resources")
                    .join("Data"),
                BuildTarget::StandaloneWindows | BuildTarget::StandaloneWindows64 => {
                    build_dir.join(format!("{}_Data", ctx.project.product_name))
                }
                _ => build_dir,
            },
        })
    }
}

impl BuildStep for VerifyFileExists {
    fn kind(&self) -> &'static str {
        "verify_file_exists"
    }

    fn display_name(&self) -> String {
        let path = if self.relative_path.trim().is_empty() {
            "(not set)"
        } else {
            self.relative_path.as_str()
        };
        format!("Verify {} Exists: {}", self.expect, path)
    }

    fn validate(&self, _ctx: &StepContext<'_>) -> Vec<ValidationResult> {
        if self.relative_path.trim().is_empty() {
            vec![ValidationResult::error(
                "no path specified; set a relative path to check after the build",
            )]
        } else {
            Vec::new()
        }
    }
}

impl PostBuildStep for VerifyFileExists {
    fn execute(
        &self,
        ctx: &StepContext<'_>,
        target: BuildTarget,
        report: &BuildReport,
    ) -> Result<Vec<ValidationResult>, StepError> {
        if self.relative_path.trim().is_empty() {
            return Ok(Vec::new());
        }

        let base = match self.base_dir(ctx, target, &report.output_path) {
            Ok(base) => base,
            Err(message) => return Ok(vec![ValidationResult::error(message)]),
        };
        let full = base.join(&self.relative_path);

        let present = match self.expect {
            Expect::File => full.is_file(),
            Expect::Folder => full.is_dir(),
        };

        Ok(vec![if present {
            ValidationResult::info(format!("{} exists: {}", self.expect, full.display()))
        } else {
            ValidationResult::error(format!("{} not found: {}", self.expect, full.display()))
        }])
    }
}
