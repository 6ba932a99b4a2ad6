//! Build configuration from YAML

use crate::core::pipeline::{PostBuildPipeline, PreBuildPipeline, StepPipeline, StepSlot};
use crate::core::project::{ProjectSection, ProjectSnapshot};
use crate::core::step::{BuildOptions, StepContext, StepError};
use crate::core::target::BuildTarget;
use crate::core::template;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

fn default_custom_path() -> String {
    "{date} {name}/{target}".to_string()
}

fn default_active() -> bool {
    true
}

/// One step slot as written in the config file: a kind, an active flag and
/// whatever parameters the kind accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEntry {
    pub kind: String,

    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(flatten)]
    pub params: Mapping,
}

/// Top-level build configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Project identity and the build counter
    pub project: ProjectSection,

    /// Folder all artifacts land under, relative to the project root
    /// unless absolute
    pub output_folder: String,

    /// Template for the per-target subfolder under the output folder
    #[serde(default = "default_custom_path")]
    pub custom_path: String,

    /// Targets to build, in order
    pub targets: Vec<BuildTarget>,

    /// Scene manifest handed to the backend untouched
    #[serde(default)]
    pub scenes: Vec<String>,

    /// Steps applied once before the first target builds
    #[serde(default)]
    pub pre_build: Vec<StepEntry>,

    /// Checks run against each target's artifact
    #[serde(default)]
    pub post_build: Vec<StepEntry>,
}

impl ConfigFile {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ConfigFile =
            serde_yaml::from_str(yaml).context("Failed to parse build config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants that serde cannot express
    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(*target) {
                anyhow::bail!("duplicate target in config: {}", target);
            }
        }
        Ok(())
    }

    /// Materialize the runtime configuration.
    ///
    /// Step entries that cannot be resolved (unknown kind, wrong phase,
    /// single-instance violation, bad parameters) become broken slots rather
    /// than load errors, so one bad entry never hides the rest of the
    /// config.
    pub fn into_config(self, project_root: PathBuf, output_override: Option<PathBuf>) -> BuildConfig {
        let mut pre_build = StepPipeline::pre_build();
        for entry in &self.pre_build {
            let slot = match pre_build.descriptor_for(&entry.kind) {
                Ok(descriptor) => match descriptor.construct_pre(&entry.params) {
                    Ok(step) => StepSlot::resolved(step),
                    Err(e) => StepSlot::broken(&entry.kind, format!("invalid parameters: {}", e)),
                },
                Err(e) => StepSlot::broken(&entry.kind, e.to_string()),
            };
            pre_build.push(slot.with_active(entry.active));
        }

        let mut post_build = StepPipeline::post_build();
        for entry in &self.post_build {
            let slot = match post_build.descriptor_for(&entry.kind) {
                Ok(descriptor) => match descriptor.construct_post(&entry.params) {
                    Ok(step) => StepSlot::resolved(step),
                    Err(e) => StepSlot::broken(&entry.kind, format!("invalid parameters: {}", e)),
                },
                Err(e) => StepSlot::broken(&entry.kind, e.to_string()),
            };
            post_build.push(slot.with_active(entry.active));
        }

        BuildConfig {
            project_root,
            output_folder: self.output_folder,
            output_override,
            custom_path: self.custom_path,
            targets: self.targets,
            scenes: self.scenes,
            pre_build,
            post_build,
        }
    }
}

/// Runtime build configuration: resolved pipelines plus everything needed
/// to turn a target into an output path.
#[derive(Debug)]
pub struct BuildConfig {
    pub project_root: PathBuf,
    pub output_folder: String,
    /// Replaces the configured output folder entirely when set
    pub output_override: Option<PathBuf>,
    pub custom_path: String,
    pub targets: Vec<BuildTarget>,
    pub scenes: Vec<String>,
    pub pre_build: PreBuildPipeline,
    pub post_build: PostBuildPipeline,
}

impl BuildConfig {
    /// The folder all target paths resolve under
    pub fn effective_output_folder(&self) -> PathBuf {
        match &self.output_override {
            Some(path) => path.clone(),
            None => self.project_root.join(&self.output_folder),
        }
    }

    /// Resolve the full artifact path for one target:
    /// `<output folder>/<rendered custom path>/<product name>` plus the
    /// target's artifact suffix.
    pub fn target_path(&self, target: BuildTarget, snapshot: &ProjectSnapshot) -> PathBuf {
        let context = snapshot.template_context(target);
        let custom = template::render(&self.custom_path, &context);

        let mut path = self.effective_output_folder();
        path.push(custom);
        path.push(&snapshot.product_name);
        target.artifact_path(&path)
    }

    /// Revalidate both pipelines, refreshing every slot's findings
    pub fn run_validation(&mut self, snapshot: &ProjectSnapshot) {
        let ctx = StepContext {
            project: snapshot,
            targets: &self.targets,
        };
        self.pre_build.run_validation(&ctx);
        self.post_build.run_validation(&ctx);
    }

    /// Run remediations across both pipelines, returning how many actions
    /// ran. Callers revalidate afterwards.
    pub fn run_remediations(&self) -> usize {
        self.pre_build.run_remediations() + self.post_build.run_remediations()
    }

    /// Apply the pre-build steps without building anything.
    ///
    /// Validation findings are refreshed but do not gate this entry point;
    /// only an actual apply failure does.
    pub fn apply_steps(&mut self, snapshot: &ProjectSnapshot) -> Result<BuildOptions, StepError> {
        self.run_validation(snapshot);
        let ctx = StepContext {
            project: snapshot,
            targets: &self.targets,
        };
        let mut options = BuildOptions::default();
        self.pre_build.run_apply(&ctx, &mut options)?;
        Ok(options)
    }
}
