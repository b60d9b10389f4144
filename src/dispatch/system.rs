//! Dispatcher that acts on the real host, or only logs in dry-run mode.

use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use super::{ActionDispatcher, KeyInjector};
use crate::config::{Action, KeyChord, TypedText};
use crate::error::{BridgeError, Result};
use crate::input::{Button, DeviceId};
use crate::logging::category;

#[cfg(target_os = "macos")]
const SHELL: (&str, &str) = ("/bin/zsh", "-lc");
#[cfg(not(target_os = "macos"))]
const SHELL: (&str, &str) = ("/bin/sh", "-c");

const OSASCRIPT: &str = "osascript";

/// macOS virtual key code for Return.
const RETURN_KEY_CODE: u16 = 36;

/// Performs actions with a key injector and child processes.
///
/// The dry-run flag can be flipped at runtime (config reload) from any
/// thread; each call reads it once.
pub struct SystemDispatcher {
    dry_run: AtomicBool,
    injector: Arc<dyn KeyInjector>,
}

impl SystemDispatcher {
    pub fn new(dry_run: bool, injector: Arc<dyn KeyInjector>) -> Self {
        info!(
            category = category::SAFETY,
            mode = if dry_run { "dry-run" } else { "live" },
            injector = injector.name(),
            "Dispatcher ready"
        );
        Self {
            dry_run: AtomicBool::new(dry_run),
            injector,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run.load(Ordering::SeqCst)
    }

    /// Switch modes, returning the previous one.
    pub fn switch_dry_run(&self, dry_run: bool) -> bool {
        let previous = self.dry_run.swap(dry_run, Ordering::SeqCst);
        if previous != dry_run {
            info!(
                category = category::SAFETY,
                mode = if dry_run { "dry-run" } else { "live" },
                "Dispatcher mode switched"
            );
        }
        previous
    }

    fn type_text(&self, typed: &TypedText) -> Result<()> {
        if let Some(pre_key) = &typed.pre_key {
            self.injector.tap(pre_key)?;
            sleep_ms(typed.pre_delay_ms);
        }
        let script = format!(
            "tell application \"System Events\" to keystroke \"{}\"",
            applescript_escape(&typed.text)
        );
        run_process(OSASCRIPT, &["-e", script.as_str()])?;
        if typed.press_enter {
            sleep_ms(typed.delay_ms);
            let script = format!("tell application \"System Events\" to key code {RETURN_KEY_CODE}");
            run_process(OSASCRIPT, &["-e", script.as_str()])?;
        }
        Ok(())
    }
}

impl ActionDispatcher for SystemDispatcher {
    fn execute(&self, action: &Action, profile: &str, button: Button) -> Result<()> {
        if self.is_dry_run() {
            info!(
                category = category::DRY_RUN,
                profile,
                button = %button,
                action = %action.summary(),
                "Simulated action"
            );
            return Ok(());
        }

        match action {
            Action::Keystroke(chord) | Action::HoldKeystroke(chord) => self.injector.tap(chord)?,
            Action::Shell { command } => run_process(SHELL.0, &[SHELL.1, command.as_str()])?,
            Action::AppleScript { script } => run_process(OSASCRIPT, &["-e", script.as_str()])?,
            Action::TypedText(typed) => self.type_text(typed)?,
        }
        info!(
            category = category::DISPATCH,
            profile,
            button = %button,
            action = %action.summary(),
            "Action executed"
        );
        Ok(())
    }

    fn begin_hold(&self, chord: &KeyChord, profile: &str, button: Button) -> Result<()> {
        if self.is_dry_run() {
            info!(category = category::DRY_RUN, profile, button = %button, chord = %chord, "Simulated hold begin");
            return Ok(());
        }
        self.injector.key_down(chord)?;
        debug!(category = category::DISPATCH, profile, button = %button, chord = %chord, "Hold begun");
        Ok(())
    }

    fn end_hold(&self, chord: &KeyChord, profile: &str, button: Button) -> Result<()> {
        if self.is_dry_run() {
            info!(category = category::DRY_RUN, profile, button = %button, chord = %chord, "Simulated hold end");
            return Ok(());
        }
        self.injector.key_up(chord)?;
        debug!(category = category::DISPATCH, profile, button = %button, chord = %chord, "Hold ended");
        Ok(())
    }

    fn scroll(&self, lines: i32, profile: &str, source: DeviceId) -> Result<()> {
        if self.is_dry_run() {
            debug!(category = category::DRY_RUN, profile, source = %source, lines, "Simulated scroll");
            return Ok(());
        }
        self.injector.scroll(lines)
    }

    fn set_dry_run(&self, dry_run: bool) {
        self.switch_dry_run(dry_run);
    }
}

fn sleep_ms(ms: u64) {
    if ms > 0 {
        thread::sleep(Duration::from_millis(ms));
    }
}

/// Run a program to completion, mapping a non-zero exit to `ProcessFailed`.
fn run_process(program: &str, args: &[&str]) -> Result<()> {
    debug!(program, ?args, "Spawning process");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| BridgeError::ActionFailed(format!("failed to start {program}: {e}")))?;

    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(program, stderr = %stderr.trim(), "Process failed");
    Err(BridgeError::ProcessFailed {
        program: program.to_string(),
        status: output.status.code(),
    })
}

/// Quote `text` for an AppleScript string literal.
fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
