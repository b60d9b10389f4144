//! Accessibility permission checks.
//!
//! Keystroke and scroll injection on macOS need the Accessibility grant.
//! Nothing here is fatal: a missing grant only makes live actions fail.

use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result, ResultExt};
use crate::logging::category;

/// System Settings deep link to the Accessibility privacy pane.
pub const ACCESSIBILITY_PANE: &str =
    "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility";

const UI_ELEMENTS_SCRIPT: &str = "tell application \"System Events\" to get UI elements enabled";

/// Whether this process may inject input. `None` when it cannot be determined.
pub fn accessibility_granted() -> Option<bool> {
    if !cfg!(target_os = "macos") {
        return None;
    }
    let output = Command::new("osascript")
        .args(["-e", UI_ELEMENTS_SCRIPT])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_flag(&String::from_utf8_lossy(&output.stdout))
}

fn parse_flag(stdout: &str) -> Option<bool> {
    match stdout.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Open the Accessibility settings pane so the user can grant access.
pub fn prompt_accessibility() -> Result<()> {
    if !cfg!(target_os = "macos") {
        return Err(BridgeError::Other(
            "--prompt-accessibility is only supported on macOS".to_string(),
        ));
    }
    let status = Command::new("open")
        .arg(ACCESSIBILITY_PANE)
        .status()
        .with_context(|| "failed to open System Settings")?;
    if !status.success() {
        return Err(BridgeError::ProcessFailed {
            program: "open".to_string(),
            status: status.code(),
        });
    }
    info!(category = category::SAFETY, "Opened Accessibility settings");
    Ok(())
}

/// Log a warning when live mode starts without the Accessibility grant.
pub fn warn_if_untrusted(dry_run: bool) {
    if dry_run {
        return;
    }
    match accessibility_granted() {
        Some(false) => warn!(
            category = category::SAFETY,
            "Accessibility permission is not granted; keystroke actions will fail until enabled"
        ),
        Some(true) => debug!("Accessibility permission granted"),
        None => debug!("Accessibility permission state unknown"),
    }
}
