//! Project identity and the build-number counter

use crate::core::target::BuildTarget;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The `project:` block of a build config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSection {
    /// Product name, used as the artifact leaf name
    pub name: String,

    /// Version string rendered into templates and summaries
    #[serde(default = "default_version")]
    pub version: String,

    /// Monotonic build counter. Kept as a string because non-numeric
    /// values are tolerated (they just never increment).
    #[serde(default = "default_build_number")]
    pub build_number: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_build_number() -> String {
    "1".to_string()
}

/// Read-only view of the project taken once at the start of a run.
///
/// Every path rendered during one run comes from the same snapshot, so a
/// counter increment mid-run can never split the output across folders.
#[derive(Debug, Clone)]
pub struct ProjectSnapshot {
    pub product_name: String,
    pub version: String,
    pub build_number: String,
    pub date: NaiveDate,
}

impl ProjectSnapshot {
    /// Substitution values for [`crate::core::template::render`], keyed by
    /// the placeholder names accepted in `custom_path` templates.
    pub fn template_context(&self, target: BuildTarget) -> HashMap<String, String> {
        HashMap::from([
            ("date".to_string(), self.date.format("%Y-%m-%d").to_string()),
            ("name".to_string(), self.product_name.clone()),
            ("version".to_string(), self.version.clone()),
            ("target".to_string(), target.as_str().to_string()),
            ("buildnum".to_string(), self.build_number.clone()),
        ])
    }

    #[cfg(test)]
    pub(crate) fn fixture() -> Self {
        Self {
            product_name: "Gravity Well".to_string(),
            version: "1.4.0".to_string(),
            build_number: "42".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        }
    }
}

/// Source of project identity and owner of the build-number counter
pub trait ProjectMetadata: Send + Sync {
    /// Capture the per-run snapshot. The date is stamped here, not by the
    /// orchestration engine.
    fn snapshot(&self) -> ProjectSnapshot;

    /// Advance the build counter by one. A non-numeric counter is left
    /// untouched; failures are logged, never fatal.
    fn increment_build_number(&self);
}

/// Project metadata stored in the `project:` block of the config file.
///
/// Incrementing rewrites only that block's `build_number` key and leaves
/// the rest of the document as serde_yaml re-emits it.
pub struct YamlProjectMetadata {
    path: PathBuf,
    project: ProjectSection,
}

impl YamlProjectMetadata {
    pub fn new(path: impl Into<PathBuf>, project: ProjectSection) -> Self {
        Self {
            path: path.into(),
            project,
        }
    }
}

impl ProjectMetadata for YamlProjectMetadata {
    fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            product_name: self.project.name.clone(),
            version: self.project.version.clone(),
            build_number: self.project.build_number.clone(),
            date: Local::now().date_naive(),
        }
    }

    fn increment_build_number(&self) {
        let number: u64 = match self.project.build_number.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                warn!(
                    "build number '{}' is not numeric, skipping increment",
                    self.project.build_number
                );
                return;
            }
        };
        match persist_build_number(&self.path, number + 1) {
            Ok(()) => debug!("build number advanced to {}", number + 1),
            Err(e) => warn!("could not persist build number: {}", e),
        }
    }
}

fn persist_build_number(path: &Path, value: u64) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)?;
    let mut doc: serde_yaml::Value = serde_yaml::from_str(&text)?;
    if let Some(project) = doc.get_mut("project").and_then(|p| p.as_mapping_mut()) {
        project.insert(
            serde_yaml::Value::from("build_number"),
            serde_yaml::Value::from(value.to_string()),
        );
    } else {
        anyhow::bail!("config file has no project block");
    }
    std::fs::write(path, serde_yaml::to_string(&doc)?)?;
    Ok(())
}
