//! Integration tests for the apply-only entry point
//!
//! Applying pre-build steps is deliberately looser than building: validation
//! findings are surfaced but only an actual apply failure stops it, while
//! the build entry point refuses to start on any Error finding.

mod support;

use multibuild::core::project::ProjectMetadata;
use multibuild::core::step::StepError;
use multibuild::core::target::BuildTarget;
use multibuild::execution::{BuildError, BuildOrchestrator};
use std::sync::Arc;
use support::{config_from_yaml, MockBackend, MockProject, ScriptedPrompt, ScriptedSaveGuard};

#[test]
fn test_apply_accumulates_options_in_step_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_from_yaml(
        r#"
project:
  name: Gravity Well
output_folder: builds
targets: [StandaloneWindows64]
pre_build:
  - kind: set_scripting_symbol
    symbol: DEMO
  - kind: set_scripting_symbol
    symbol: CHEATS
  - kind: development_build
    deep_profiling: false
  - kind: set_scripting_symbol
    symbol: CHEATS
    define: false
"#,
        dir.path(),
    );

    let options = config
        .apply_steps(&MockProject::new().snapshot())
        .unwrap();

    // the later remove undoes the earlier define
    assert_eq!(options.define_symbols, vec!["DEMO"]);
    assert!(options.development);
    assert!(options.allow_debugging);
    assert!(!options.deep_profiling);
    assert!(!options.wait_for_debugger);
}

#[test]
fn test_apply_skips_inactive_steps() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_from_yaml(
        r#"
project:
  name: Gravity Well
output_folder: builds
targets: [StandaloneWindows64]
pre_build:
  - kind: set_scripting_symbol
    symbol: KEEP
  - kind: set_scripting_symbol
    symbol: DROPPED
    active: false
  - kind: development_build
    active: false
"#,
        dir.path(),
    );

    let options = config
        .apply_steps(&MockProject::new().snapshot())
        .unwrap();

    assert_eq!(options.define_symbols, vec!["KEEP"]);
    assert!(!options.development);
}

#[tokio::test]
async fn test_validation_errors_block_the_build_but_not_apply() {
    let dir = tempfile::tempdir().unwrap();
    // a symbol-less step validates as an Error
    let yaml = r#"
project:
  name: Gravity Well
output_folder: builds
targets: [StandaloneWindows64]
pre_build:
  - kind: set_scripting_symbol
"#;

    let mut config = config_from_yaml(yaml, dir.path());
    let options = config
        .apply_steps(&MockProject::new().snapshot())
        .unwrap();
    assert!(config.pre_build.has_errors());
    assert_eq!(options.define_symbols, vec![""]);

    let backend = MockBackend::new(BuildTarget::StandaloneWindows64);
    let orchestrator = BuildOrchestrator::new(
        backend.clone(),
        Arc::new(MockProject::new()),
        Arc::new(ScriptedPrompt::accepting()),
        Arc::new(ScriptedSaveGuard::accepting()),
    );

    let mut config = config_from_yaml(yaml, dir.path());
    let err = orchestrator.run(&mut config, false).await.unwrap_err();

    assert!(matches!(err, BuildError::ValidationBlocked));
    assert!(backend.built_targets().is_empty());
}

#[test]
fn test_apply_fails_on_active_broken_slot() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_from_yaml(
        r#"
project:
  name: Gravity Well
output_folder: builds
targets: [StandaloneWindows64]
pre_build:
  - kind: wash_the_car
"#,
        dir.path(),
    );

    let err = config
        .apply_steps(&MockProject::new().snapshot())
        .unwrap_err();
    assert!(matches!(err, StepError::Unresolved { .. }));
}

#[tokio::test]
async fn test_wait_without_debugging_warns_but_still_builds() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockBackend::new(BuildTarget::StandaloneWindows64);
    let orchestrator = BuildOrchestrator::new(
        backend.clone(),
        Arc::new(MockProject::new()),
        Arc::new(ScriptedPrompt::accepting()),
        Arc::new(ScriptedSaveGuard::accepting()),
    );

    let mut config = config_from_yaml(
        r#"
project:
  name: Gravity Well
output_folder: builds
targets: [StandaloneWindows64]
pre_build:
  - kind: development_build
    script_debugging: false
    wait_for_debugger: true
"#,
        dir.path(),
    );

    let report = orchestrator.run(&mut config, false).await.unwrap();
    assert!(report.succeeded());

    // the misconfiguration is a warning on the slot, not a gate
    let findings = config.pre_build.slots()[0].findings();
    assert_eq!(findings.len(), 1);
    assert!(!findings[0].is_error());

    let request = &backend.requests()[0];
    assert!(request.options.development);
    assert!(!request.options.allow_debugging);
    assert!(request.options.wait_for_debugger);
}
