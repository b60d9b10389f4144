//! Raw JSON document types for the mappings config file.
//!
//! These mirror the file layout one-to-one and keep every action field
//! optional. Required-field and range checks happen when the document is
//! turned into a [`ConfigModel`](super::ConfigModel), so a missing `keyCode`
//! is reported as a validation error with its location rather than as a
//! generic decode failure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level config document.
///
/// # Example
///
/// ```json
/// {
///   "appProfiles": { "com.apple.Safari": "browser" },
///   "profiles": {
///     "default": {
///       "mappings": {
///         "a": { "action": { "type": "keystroke", "keyCode": 36 } }
///       }
///     },
///     "browser": {
///       "analog": { "leftStickVerticalScroll": { "deadzone": 0.2 } },
///       "mappings": {
///         "leftTrigger": { "action": { "type": "holdKeystroke", "keyCode": 55 } }
///       }
///     }
///   },
///   "safety": { "dryRun": true, "emergencyToggleButton": "home" }
/// }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    /// Application identifier to profile name.
    #[serde(default)]
    pub app_profiles: BTreeMap<String, String>,

    /// Profile name to profile.
    pub profiles: BTreeMap<String, ProfileDocument>,

    pub safety: SafetyDocument,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument {
    #[serde(default)]
    pub enabled: Option<bool>,

    #[serde(default)]
    pub analog: Option<AnalogDocument>,

    /// Button name to mapping.
    pub mappings: BTreeMap<String, MappingDocument>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalogDocument {
    #[serde(default)]
    pub left_stick_vertical_scroll: Option<ScrollDocument>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollDocument {
    pub enabled: Option<bool>,
    pub deadzone: Option<f64>,
    pub interval_ms: Option<i64>,
    pub min_lines_per_tick: Option<i64>,
    pub max_lines_per_tick: Option<i64>,
    pub response_exponent: Option<f64>,
    pub invert: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingDocument {
    pub action: ActionDocument,
    #[serde(default)]
    pub debounce_ms: Option<i64>,
    #[serde(default)]
    pub edge_trigger: Option<bool>,
}

/// Action object; `type` selects which of the other fields are required.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDocument {
    #[serde(rename = "type")]
    pub kind: String,
    pub key_code: Option<i64>,
    pub modifiers: Option<Vec<String>>,
    pub command: Option<String>,
    pub script: Option<String>,
    pub text: Option<String>,
    pub press_enter: Option<bool>,
    pub delay_ms: Option<i64>,
    pub pre_key_code: Option<i64>,
    pub pre_modifiers: Option<Vec<String>>,
    pub pre_delay_ms: Option<i64>,
    /// Free-form label used in log lines.
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyDocument {
    pub dry_run: bool,
    #[serde(default)]
    pub emergency_toggle_button: Option<String>,
}
