//! Test fixture helpers for creating temporary config and replay files.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A browser profile with every action family plus analog scroll, a
/// terminal profile, and `home` as the emergency button.
pub const FULL_CONFIG: &str = r#"{
  "appProfiles": {
    "com.google.Chrome": "browser",
    "com.apple.Terminal": "terminal"
  },
  "profiles": {
    "default": {
      "mappings": {
        "a": { "action": { "type": "keystroke", "keyCode": 36 } },
        "b": { "action": { "type": "keystroke", "keyCode": 53, "description": "Escape" }, "debounceMs": 0 }
      }
    },
    "browser": {
      "analog": {
        "leftStickVerticalScroll": {
          "deadzone": 0.2, "intervalMs": 40, "minLinesPerTick": 1, "maxLinesPerTick": 8, "responseExponent": 1.0
        }
      },
      "mappings": {
        "leftTrigger": { "action": { "type": "holdKeystroke", "keyCode": 55 } },
        "rightShoulder": {
          "action": { "type": "keystroke", "keyCode": 48, "modifiers": ["control"] },
          "edgeTrigger": false,
          "debounceMs": 50
        },
        "x": { "action": { "type": "shell", "command": "echo hi" } }
      }
    },
    "terminal": {
      "mappings": {
        "y": { "action": { "type": "text", "text": "git status", "pressEnter": true, "delayMs": 30 } },
        "menu": { "action": { "type": "applescript", "script": "beep" } }
      }
    }
  },
  "safety": { "dryRun": true, "emergencyToggleButton": "home" }
}"#;

/// A temporary directory holding a config and optional replay files.
pub struct TestWorkspace {
    pub dir: TempDir,
}

impl TestWorkspace {
    /// # Panics
    ///
    /// Panics if the temp directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `name` and return its absolute path.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        std::fs::write(&path, contents).unwrap_or_else(|_| panic!("Failed to write {path:?}"));
        path
    }

    /// Write a config file at `mappings.json`.
    pub fn config(&self, json: &str) -> PathBuf {
        self.write("mappings.json", json)
    }

    /// Write a replay file, one tick per entry.
    pub fn replay(&self, ticks: &[&str]) -> PathBuf {
        self.write("input.jsonl", &(ticks.join("\n") + "\n"))
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// One replay line sampling `device` with `pressed` buttons.
#[must_use]
pub fn press_tick(device: &str, pressed: &[&str]) -> String {
    let list = pressed
        .iter()
        .map(|b| format!("\"{b}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(r#"{{"events": [{{"type": "sample", "device": "{device}", "pressed": [{list}]}}]}}"#)
}

/// Path string for CLI arguments.
#[must_use]
pub fn arg(path: &Path) -> String {
    path.display().to_string()
}
