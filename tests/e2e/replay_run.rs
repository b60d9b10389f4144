//! Full runs of the binary against replay files in dry-run and live mode.

use std::time::Duration;

use crate::common::cli::CliRunner;
use crate::common::fixtures::{FULL_CONFIG, TestWorkspace, arg, press_tick};

const CHROME: &str = "com.google.Chrome";

#[test]
fn dry_run_logs_simulated_actions() {
    let ws = TestWorkspace::new();
    let config = ws.config(FULL_CONFIG);
    let replay = ws.replay(&[&press_tick("pad", &["a"]), &press_tick("pad", &[])]);

    let result = CliRunner::new().run_replay(&arg(&config), &arg(&replay), &[]);
    let _ = result.assert_success().assert_duration_under(Duration::from_secs(20));

    let logs = result.logs();
    let _ = logs
        .assert_message("INFO", "Simulated action")
        .assert_message("INFO", "Controller connected")
        .assert_no_errors();
    assert_eq!(logs.in_category("dry_run").len(), 1);
}

#[test]
fn pinned_app_selects_profile() {
    let ws = TestWorkspace::new();
    let config = ws.config(FULL_CONFIG);
    let replay = ws.replay(&[&press_tick("pad", &["x"]), &press_tick("pad", &[])]);

    let default_run = CliRunner::new().run_replay(&arg(&config), &arg(&replay), &[]);
    assert_eq!(default_run.assert_success().logs().count_message("Simulated action"), 0);

    let chrome_run = CliRunner::new().run_replay(&arg(&config), &arg(&replay), &["--app", CHROME]);
    assert_eq!(chrome_run.assert_success().logs().count_message("Simulated action"), 1);
}

#[test]
fn open_hold_is_released_when_replay_ends() {
    let ws = TestWorkspace::new();
    let config = ws.config(FULL_CONFIG);
    let replay = ws.replay(&[&press_tick("pad", &["leftTrigger"])]);

    let result = CliRunner::new().run_replay(&arg(&config), &arg(&replay), &["--app", CHROME, "--dispatch", "inline"]);
    let _ = result
        .assert_success()
        .logs()
        .assert_message("INFO", "Simulated hold begin")
        .assert_message("INFO", "Releasing hold at shutdown")
        .assert_message("INFO", "Simulated hold end");
}

#[test]
fn emergency_toggle_silences_presses() {
    let ws = TestWorkspace::new();
    let config = ws.config(FULL_CONFIG);
    let replay = ws.replay(&[
        &press_tick("pad", &["home"]),
        &press_tick("pad", &[]),
        &press_tick("pad", &["a"]),
    ]);

    let result = CliRunner::new().run_replay(&arg(&config), &arg(&replay), &[]);
    let logs = result.assert_success().logs();
    let _ = logs.assert_message("WARN", "Emergency toggle: bridge disabled");
    assert_eq!(logs.count_message("Simulated action"), 0);
}

#[test]
fn replay_reads_stdin() {
    let ws = TestWorkspace::new();
    let config = ws.config(FULL_CONFIG);
    let input = format!("{}\n{}\n", press_tick("pad", &["b"]), press_tick("pad", &[]));

    let result = CliRunner::new()
        .with_stdin(&input)
        .run_replay(&arg(&config), "-", &[]);
    assert_eq!(result.assert_success().logs().count_message("Simulated action"), 1);
}

#[test]
fn malformed_replay_line_is_fatal() {
    let ws = TestWorkspace::new();
    let config = ws.config(FULL_CONFIG);
    let replay = ws.replay(&[&press_tick("pad", &["a"]), "{ not json"]);

    let _ = CliRunner::new()
        .run_replay(&arg(&config), &arg(&replay), &[])
        .assert_exit_code(1)
        .assert_stderr_matches(r"Error.*line 2");
}

#[cfg(unix)]
#[test]
fn no_dry_run_executes_shell_actions() {
    let ws = TestWorkspace::new();
    let marker = ws.path().join("ran.txt");
    let config = ws.config(&format!(
        r#"{{
          "profiles": {{ "default": {{ "mappings": {{
            "a": {{ "action": {{ "type": "shell", "command": "echo ok > '{}'" }} }}
          }} }} }},
          "safety": {{ "dryRun": true }}
        }}"#,
        marker.display()
    ));
    let replay = ws.replay(&[&press_tick("pad", &["a"]), &press_tick("pad", &[])]);

    let result = CliRunner::new().run_replay(&arg(&config), &arg(&replay), &["--no-dry-run"]);
    let _ = result.assert_success().logs().assert_message("INFO", "Action executed");
    assert_eq!(std::fs::read_to_string(&marker).unwrap().trim(), "ok");
}
