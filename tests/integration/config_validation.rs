//! Loading and rejecting config files from disk.

use std::path::PathBuf;

use bridge::config::{Action, KeyChord, Modifier, load_config, resolve_path};
use bridge::error::BridgeError;
use bridge::input::Button;
use bridge::profile::ProfileResolver;

use crate::common::fixtures::{FULL_CONFIG, TestWorkspace};
use crate::common::init_test_logging;

#[test]
fn full_config_loads_every_action_family() {
    init_test_logging();
    let ws = TestWorkspace::new();
    let config = load_config(&ws.config(FULL_CONFIG)).unwrap();

    assert_eq!(config.profiles.len(), 3);
    assert_eq!(config.safety.emergency_toggle_button, Some(Button::Home));
    assert!(config.safety.dry_run);
    assert_eq!(config.digest().len(), 64);

    let browser = config.profile("browser").unwrap();
    let shoulder = browser.mapping(Button::RightShoulder).unwrap();
    assert!(!shoulder.edge_trigger);
    assert_eq!(shoulder.debounce_ms, 50);
    assert_eq!(
        shoulder.action,
        Action::Keystroke(KeyChord::new(48).with_modifiers(&[Modifier::Control]))
    );
    assert!(browser.analog.is_some());

    let terminal = config.profile("terminal").unwrap();
    let Action::TypedText(typed) = &terminal.mapping(Button::Y).unwrap().action else {
        panic!("expected typed text");
    };
    assert!(typed.press_enter);
    assert_eq!(typed.delay_ms, 30);

    let resolver = ProfileResolver::new(&config);
    assert_eq!(resolver.resolve(Some("com.apple.Terminal")), Some("terminal"));
    assert_eq!(resolver.resolve(Some("com.example.Other")), Some("default"));
}

#[test]
fn shipped_sample_config_is_valid() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/mappings.json");
    let config = load_config(&path).unwrap();
    assert!(config.safety.dry_run, "the sample config must start in dry-run");
    assert!(config.profile("default").is_some());
}

#[test]
fn every_violation_is_reported_together() {
    let ws = TestWorkspace::new();
    let path = ws.config(
        r#"{
          "appProfiles": { "com.example.App": "missing" },
          "profiles": {
            "default": {
              "analog": { "leftStickVerticalScroll": { "deadzone": 1.5 } },
              "mappings": {
                "jump": { "action": { "type": "keystroke", "keyCode": 1 } },
                "a": { "action": { "type": "shell", "command": "" } },
                "b": { "action": { "type": "keystroke", "keyCode": 70000 } },
                "x": { "action": { "type": "teleport" } }
              }
            }
          },
          "safety": { "dryRun": true, "emergencyToggleButton": "select" }
        }"#,
    );

    let Err(BridgeError::ConfigInvalid { errors }) = load_config(&path) else {
        panic!("expected ConfigInvalid");
    };
    assert_eq!(errors.len(), 7, "{errors:#?}");
    let joined = errors.join("\n");
    for fragment in [
        "appProfiles.com.example.App",
        "profiles.default.analog.leftStickVerticalScroll",
        "profiles.default.mappings.jump",
        "profiles.default.mappings.a.action",
        "profiles.default.mappings.b.action",
        "profiles.default.mappings.x.action",
        "safety.emergencyToggleButton",
    ] {
        assert!(joined.contains(fragment), "missing {fragment} in:\n{joined}");
    }
}

#[test]
fn malformed_json_is_a_parse_error() {
    let ws = TestWorkspace::new();
    let path = ws.config(r#"{ "profiles": { "#);
    assert!(matches!(load_config(&path), Err(BridgeError::ConfigParse(_))));
}

#[test]
fn missing_file_is_not_found_with_hint() {
    let ws = TestWorkspace::new();
    let err = load_config(&ws.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, BridgeError::ConfigNotFound { .. }));
    assert!(err.is_user_recoverable());
    assert!(err.suggestion().is_some());
}

#[test]
fn relative_config_paths_resolve_against_base() {
    let ws = TestWorkspace::new();
    let resolved = resolve_path(&PathBuf::from("config/mappings.json"), ws.path()).unwrap();
    assert_eq!(resolved, ws.path().join("config/mappings.json"));
}
