//! Built-in step kinds and the identity registry

pub mod development_build;
pub mod set_scripting_symbol;
pub mod verify_file_exists;

pub use development_build::DevelopmentBuild;
pub use set_scripting_symbol::SetScriptingSymbol;
pub use verify_file_exists::VerifyFileExists;

use crate::core::step::{PostBuildStep, PreBuildStep, StepDescriptor};
use serde_yaml::Mapping;

fn make_set_scripting_symbol(params: &Mapping) -> anyhow::Result<Box<dyn PreBuildStep>> {
    Ok(Box::new(SetScriptingSymbol::from_params(params)?))
}

fn make_development_build(params: &Mapping) -> anyhow::Result<Box<dyn PreBuildStep>> {
    Ok(Box::new(DevelopmentBuild::from_params(params)?))
}

fn make_verify_file_exists(params: &Mapping) -> anyhow::Result<Box<dyn PostBuildStep>> {
    Ok(Box::new(VerifyFileExists::from_params(params)?))
}

/// All step identities known to this build, with their add-time policies
pub const REGISTRY: &[StepDescriptor] = &[
    StepDescriptor {
        kind: "set_scripting_symbol",
        label: "Set Scripting Symbol",
        pre_build: true,
        post_build: false,
        allow_multiple: true,
        make_pre: Some(make_set_scripting_symbol),
        make_post: None,
    },
    StepDescriptor {
        kind: "development_build",
        label: "Development Build",
        pre_build: true,
        post_build: false,
        allow_multiple: false,
        make_pre: Some(make_development_build),
        make_post: None,
    },
    StepDescriptor {
        kind: "verify_file_exists",
        label: "Verify File Exists",
        pre_build: false,
        post_build: true,
        allow_multiple: true,
        make_pre: None,
        make_post: Some(make_verify_file_exists),
    },
];

/// Look up a step identity in the registry
pub fn descriptor(kind: &str) -> Option<&'static StepDescriptor> {
    REGISTRY.iter().find(|d| d.kind == kind)
}
