//! Reload coordination against a real file on disk.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bridge::config::{ConfigReloadCoordinator, ReloadOutcome, load_config};
use bridge::input::Button;

use crate::common::fixtures::{FULL_CONFIG, TestWorkspace};
use crate::common::init_test_logging;

/// Rewrite `path` and push its mtime forward so coarse filesystem clocks
/// still register the change.
fn rewrite(path: &Path, contents: &str, offset_secs: u64) {
    std::fs::write(path, contents).unwrap();
    let file: File = OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(offset_secs))
        .unwrap();
}

fn coordinator(ws: &TestWorkspace) -> ConfigReloadCoordinator {
    let path = ws.config(FULL_CONFIG);
    let initial = Arc::new(load_config(&path).unwrap());
    ConfigReloadCoordinator::new(path, initial)
}

#[test]
fn edited_file_is_reloaded_once() {
    init_test_logging();
    let ws = TestWorkspace::new();
    let mut reload = coordinator(&ws);
    assert!(matches!(reload.poll(), ReloadOutcome::Unchanged));

    let edited = FULL_CONFIG.replace("\"emergencyToggleButton\": \"home\"", "\"emergencyToggleButton\": \"options\"");
    rewrite(reload.path(), &edited, 5);

    let ReloadOutcome::Reloaded(model) = reload.poll() else {
        panic!("expected a reload");
    };
    assert_eq!(model.safety.emergency_toggle_button, Some(Button::Options));
    assert!(reload.last_reload().is_some());
    assert!(Arc::ptr_eq(&model, &reload.current()));
    assert!(matches!(reload.poll(), ReloadOutcome::Unchanged));
}

#[test]
fn invalid_edit_keeps_previous_model() {
    let ws = TestWorkspace::new();
    let mut reload = coordinator(&ws);
    let before = reload.current();

    rewrite(reload.path(), r#"{ "profiles": {}, "safety": { "dryRun": true, "emergencyToggleButton": "nope" } }"#, 5);
    assert!(matches!(reload.poll(), ReloadOutcome::Failed(_)));
    assert!(Arc::ptr_eq(&before, &reload.current()));

    // Not retried until the file changes again.
    assert!(matches!(reload.poll(), ReloadOutcome::Unchanged));

    rewrite(reload.path(), FULL_CONFIG, 10);
    // Same content as the active model.
    assert!(matches!(reload.poll(), ReloadOutcome::Unchanged));
}

#[test]
fn touched_but_identical_file_is_unchanged() {
    let ws = TestWorkspace::new();
    let mut reload = coordinator(&ws);
    rewrite(reload.path(), FULL_CONFIG, 5);
    assert!(matches!(reload.poll(), ReloadOutcome::Unchanged));
}

#[test]
fn deleted_file_is_reported_once() {
    let ws = TestWorkspace::new();
    let mut reload = coordinator(&ws);
    std::fs::remove_file(reload.path()).unwrap();

    assert!(matches!(reload.poll(), ReloadOutcome::Failed(_)));
    assert!(matches!(reload.poll(), ReloadOutcome::Unchanged));

    let path = reload.path().to_path_buf();
    rewrite(&path, &FULL_CONFIG.replace("\"dryRun\": true", "\"dryRun\": false"), 5);
    let ReloadOutcome::Reloaded(model) = reload.poll() else {
        panic!("expected the recreated file to load");
    };
    assert!(!model.safety.dry_run);
}
