//! Pre-build step toggling one scripting define symbol

use crate::core::step::{BuildOptions, BuildStep, PreBuildStep, StepContext, StepError};
use crate::core::validation::ValidationResult;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

/// Adds or removes a scripting define symbol in the aggregated options.
///
/// Multiple instances may coexist in one pipeline, applied in list order, so
/// a later step can undo an earlier one.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SetScriptingSymbol {
    symbol: String,
    define: bool,
}

impl Default for SetScriptingSymbol {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            define: true,
        }
    }
}

impl SetScriptingSymbol {
    pub fn new(symbol: impl Into<String>, define: bool) -> Self {
        Self {
            symbol: symbol.into(),
            define,
        }
    }

    pub fn from_params(params: &Mapping) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_value(Value::Mapping(params.clone()))
    }
}

impl BuildStep for SetScriptingSymbol {
    fn kind(&self) -> &'static str {
        "set_scripting_symbol"
    }

    fn display_name(&self) -> String {
        if self.define {
            format!("Set Symbol '{}'", self.symbol)
        } else {
            format!("Remove Symbol '{}'", self.symbol)
        }
    }

    fn validate(&self, _ctx: &StepContext<'_>) -> Vec<ValidationResult> {
        if self.symbol.trim().is_empty() {
            vec![ValidationResult::error(
                "scripting symbol step has no symbol configured",
            )]
        } else {
            Vec::new()
        }
    }
}

impl PreBuildStep for SetScriptingSymbol {
    fn apply(&self, _ctx: &StepContext<'_>, options: &mut BuildOptions) -> Result<(), StepError> {
        if self.define {
            options.define_symbol(&self.symbol);
        } else {
            options.remove_symbol(&self.symbol);
        }
        Ok(())
    }
}
