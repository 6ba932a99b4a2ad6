//! Pre-build step switching the whole run to a development build

use crate::core::step::{BuildOptions, BuildStep, PreBuildStep, StepContext, StepError};
use crate::core::validation::ValidationResult;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

/// Marks every target in the run as a development build.
///
/// Only one instance is allowed per pipeline; the debugger-related flags
/// fold into the aggregated options alongside the development flag itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DevelopmentBuild {
    script_debugging: bool,
    deep_profiling: bool,
    wait_for_debugger: bool,
}

impl Default for DevelopmentBuild {
    fn default() -> Self {
        Self {
            script_debugging: true,
            deep_profiling: true,
            wait_for_debugger: false,
        }
    }
}

impl DevelopmentBuild {
    pub fn new(script_debugging: bool, deep_profiling: bool, wait_for_debugger: bool) -> Self {
        Self {
            script_debugging,
            deep_profiling,
            wait_for_debugger,
        }
    }

    pub fn from_params(params: &Mapping) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_value(Value::Mapping(params.clone()))
    }
}

impl BuildStep for DevelopmentBuild {
    fn kind(&self) -> &'static str {
        "development_build"
    }

    fn display_name(&self) -> String {
        "Development Build".to_string()
    }

    fn validate(&self, _ctx: &StepContext<'_>) -> Vec<ValidationResult> {
        if self.wait_for_debugger && !self.script_debugging {
            vec![ValidationResult::warning(
                "wait_for_debugger has no effect without script_debugging",
            )]
        } else {
            Vec::new()
        }
    }
}

impl PreBuildStep for DevelopmentBuild {
    fn apply(&self, _ctx: &StepContext<'_>, options: &mut BuildOptions) -> Result<(), StepError> {
        options.development = true;
        if self.script_debugging {
            options.allow_debugging = true;
        }
        if self.deep_profiling {
            options.deep_profiling = true;
        }
        options.wait_for_debugger = self.wait_for_debugger;
        Ok(())
    }
}
