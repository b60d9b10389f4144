//! Validated, immutable configuration model.
//!
//! A [`ConfigModel`] is only ever built whole from a [`ConfigDocument`];
//! reloads replace it wholesale and never patch a profile in place.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, trace};

use super::schema::{ActionDocument, ConfigDocument, MappingDocument, ProfileDocument, ScrollDocument};
use crate::error::{BridgeError, Result};
use crate::input::Button;

/// Debounce applied when a mapping does not set `debounceMs`.
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Profile used when the frontmost app has no entry in `appProfiles`.
pub const DEFAULT_PROFILE: &str = "default";

/// Keyboard modifier held around a key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Command,
    Shift,
    Option,
    Control,
    Function,
}

impl Modifier {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Shift => "shift",
            Self::Option => "option",
            Self::Control => "control",
            Self::Function => "function",
        }
    }
}

impl FromStr for Modifier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "command" | "cmd" => Ok(Self::Command),
            "shift" => Ok(Self::Shift),
            "option" | "alt" => Ok(Self::Option),
            "control" | "ctrl" => Ok(Self::Control),
            "function" | "fn" => Ok(Self::Function),
            _ => Err(format!("unknown modifier '{s}'")),
        }
    }
}

/// A virtual key code plus the modifiers held while it is pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyChord {
    pub key_code: u16,
    pub modifiers: Vec<Modifier>,
}

impl KeyChord {
    pub const fn new(key_code: u16) -> Self {
        Self {
            key_code,
            modifiers: Vec::new(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: &[Modifier]) -> Self {
        self.modifiers = modifiers.to_vec();
        self
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier.name())?;
        }
        write!(f, "{}", self.key_code)
    }
}

/// Text typed into the focused app, optionally preceded by a key chord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypedText {
    pub text: String,
    pub press_enter: bool,
    /// Pause between typing and the Enter press.
    pub delay_ms: u64,
    /// Chord sent before typing, e.g. to focus a search field.
    pub pre_key: Option<KeyChord>,
    /// Pause between the pre-chord and typing.
    pub pre_delay_ms: u64,
}

/// What a mapping does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    Keystroke(KeyChord),
    HoldKeystroke(KeyChord),
    Shell { command: String },
    AppleScript { script: String },
    TypedText(TypedText),
}

impl Action {
    /// Config-file name of the action type.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Keystroke(_) => "keystroke",
            Self::HoldKeystroke(_) => "holdKeystroke",
            Self::Shell { .. } => "shell",
            Self::AppleScript { .. } => "applescript",
            Self::TypedText(_) => "text",
        }
    }

    /// One-line description for logs.
    pub fn summary(&self) -> String {
        match self {
            Self::Keystroke(chord) => format!("keystroke {chord}"),
            Self::HoldKeystroke(chord) => format!("hold {chord}"),
            Self::Shell { command } => format!("shell `{command}`"),
            Self::AppleScript { .. } => "applescript".to_string(),
            Self::TypedText(typed) => format!("text ({} chars)", typed.text.chars().count()),
        }
    }
}

/// A button binding inside a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mapping {
    pub action: Action,
    pub debounce_ms: u64,
    /// When false, a held button re-dispatches every tick, subject to debounce.
    pub edge_trigger: bool,
    pub description: Option<String>,
}

impl Mapping {
    /// A mapping with default debounce and edge triggering.
    pub const fn new(action: Action) -> Self {
        Self {
            action,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            edge_trigger: true,
            description: None,
        }
    }

    pub const fn with_debounce(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub const fn with_edge_trigger(mut self, edge_trigger: bool) -> Self {
        self.edge_trigger = edge_trigger;
        self
    }

    /// The description if one was configured, else the action summary.
    pub fn label(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| self.action.summary())
    }
}

/// Left-stick vertical scroll settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalogScrollConfig {
    pub enabled: bool,
    pub deadzone: f32,
    pub interval_ms: u64,
    pub min_lines_per_tick: u32,
    pub max_lines_per_tick: u32,
    pub response_exponent: f32,
    pub invert: bool,
}

impl Default for AnalogScrollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            deadzone: 0.22,
            interval_ms: 45,
            min_lines_per_tick: 1,
            max_lines_per_tick: 8,
            response_exponent: 1.8,
            invert: false,
        }
    }
}

/// Named set of button mappings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub enabled: bool,
    pub mappings: BTreeMap<Button, Mapping>,
    pub analog: Option<AnalogScrollConfig>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            enabled: true,
            mappings: BTreeMap::new(),
            analog: None,
        }
    }
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mapping(mut self, button: Button, mapping: Mapping) -> Self {
        self.mappings.insert(button, mapping);
        self
    }

    pub fn with_analog(mut self, analog: AnalogScrollConfig) -> Self {
        self.analog = Some(analog);
        self
    }

    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn mapping(&self, button: Button) -> Option<&Mapping> {
        self.mappings.get(&button)
    }
}

/// Global safety settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SafetySettings {
    pub dry_run: bool,
    pub emergency_toggle_button: Option<Button>,
}

/// Validated snapshot of the whole config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigModel {
    pub app_profiles: BTreeMap<String, String>,
    pub profiles: BTreeMap<String, Profile>,
    pub safety: SafetySettings,
    /// SHA-256 of the source bytes, empty for models built in code.
    #[serde(skip)]
    digest: String,
}

impl ConfigModel {
    /// An empty model with the given safety settings.
    pub fn new(safety: SafetySettings) -> Self {
        Self {
            safety,
            ..Self::default()
        }
    }

    pub fn with_profile(mut self, name: &str, profile: Profile) -> Self {
        self.profiles.insert(name.to_string(), profile);
        self
    }

    pub fn with_app(mut self, app_id: &str, profile: &str) -> Self {
        self.app_profiles
            .insert(app_id.to_string(), profile.to_string());
        self
    }

    pub fn with_digest(mut self, digest: String) -> Self {
        self.digest = digest;
        self
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Validate a decoded document.
    ///
    /// Every violation is collected, so one failed load reports all of them.
    pub fn from_document(doc: ConfigDocument) -> Result<Self> {
        let mut violations = Violations::default();
        let names: BTreeSet<String> = doc.profiles.keys().cloned().collect();

        for (app, profile) in &doc.app_profiles {
            if !names.contains(profile) {
                violations.push(
                    &format!("appProfiles.{app}"),
                    format!("references unknown profile '{profile}'"),
                );
            }
        }

        let mut profiles = BTreeMap::new();
        for (name, profile) in doc.profiles {
            let validated = validate_profile(&name, profile, &mut violations);
            profiles.insert(name, validated);
        }

        let emergency_toggle_button = doc
            .safety
            .emergency_toggle_button
            .as_deref()
            .and_then(|name| match name.parse::<Button>() {
                Ok(button) => Some(button),
                Err(e) => {
                    violations.push("safety.emergencyToggleButton", e);
                    None
                }
            });

        violations.into_result()?;

        debug!(
            profiles = profiles.len(),
            apps = doc.app_profiles.len(),
            "Config validated"
        );
        Ok(Self {
            app_profiles: doc.app_profiles,
            profiles,
            safety: SafetySettings {
                dry_run: doc.safety.dry_run,
                emergency_toggle_button,
            },
            digest: String::new(),
        })
    }
}

#[derive(Debug, Default)]
struct Violations {
    errors: Vec<String>,
}

impl Violations {
    fn push(&mut self, path: &str, message: impl fmt::Display) {
        trace!(path, %message, "Config violation");
        self.errors.push(format!("{path}: {message}"));
    }

    fn into_result(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(BridgeError::ConfigInvalid {
                errors: self.errors,
            })
        }
    }
}

fn validate_profile(name: &str, doc: ProfileDocument, v: &mut Violations) -> Profile {
    let path = format!("profiles.{name}");
    let mut mappings = BTreeMap::new();

    for (button_name, mapping) in doc.mappings {
        let mapping_path = format!("{path}.mappings.{button_name}");
        let button = match button_name.parse::<Button>() {
            Ok(button) => button,
            Err(e) => {
                v.push(&mapping_path, e);
                continue;
            }
        };
        if let Some(mapping) = validate_mapping(&mapping_path, mapping, v) {
            mappings.insert(button, mapping);
        }
    }

    let analog = doc
        .analog
        .and_then(|analog| analog.left_stick_vertical_scroll)
        .map(|scroll| validate_scroll(&format!("{path}.analog.leftStickVerticalScroll"), &scroll, v));

    Profile {
        enabled: doc.enabled.unwrap_or(true),
        mappings,
        analog,
    }
}

fn validate_mapping(path: &str, doc: MappingDocument, v: &mut Violations) -> Option<Mapping> {
    let debounce_ms = non_negative(path, "debounceMs", doc.debounce_ms, DEFAULT_DEBOUNCE_MS, v);
    let description = doc.action.description.clone();
    let action = validate_action(&format!("{path}.action"), doc.action, v)?;

    Some(Mapping {
        action,
        debounce_ms,
        edge_trigger: doc.edge_trigger.unwrap_or(true),
        description,
    })
}

fn validate_action(path: &str, doc: ActionDocument, v: &mut Violations) -> Option<Action> {
    let before = v.errors.len();
    let action = match doc.kind.as_str() {
        "keystroke" => Action::Keystroke(chord(path, "keyCode", doc.key_code, doc.modifiers, "modifiers", v)?),
        "holdKeystroke" => {
            Action::HoldKeystroke(chord(path, "keyCode", doc.key_code, doc.modifiers, "modifiers", v)?)
        }
        "shell" => Action::Shell {
            command: required_text(path, "command", doc.command, "shell", v)?,
        },
        "applescript" => Action::AppleScript {
            script: required_text(path, "script", doc.script, "applescript", v)?,
        },
        "text" => {
            let text = required_text(path, "text", doc.text, "text", v);
            let delay_ms = non_negative(path, "delayMs", doc.delay_ms, 0, v);
            let pre_delay_ms = non_negative(path, "preDelayMs", doc.pre_delay_ms, 0, v);
            let pre_key = match (doc.pre_key_code, doc.pre_modifiers) {
                (None, None) => None,
                (None, Some(_)) => {
                    v.push(path, "preModifiers given without preKeyCode");
                    None
                }
                (code, modifiers) => chord(path, "preKeyCode", code, modifiers, "preModifiers", v),
            };
            if v.errors.len() > before {
                return None;
            }
            Action::TypedText(TypedText {
                text: text?,
                press_enter: doc.press_enter.unwrap_or(false),
                delay_ms,
                pre_key,
                pre_delay_ms,
            })
        }
        other => {
            v.push(
                &format!("{path}.type"),
                format!(
                    "unknown action type '{other}' (expected keystroke, holdKeystroke, shell, applescript or text)"
                ),
            );
            return None;
        }
    };
    Some(action)
}

fn chord(
    path: &str,
    code_field: &str,
    code: Option<i64>,
    modifiers: Option<Vec<String>>,
    modifiers_field: &str,
    v: &mut Violations,
) -> Option<KeyChord> {
    let modifiers = parse_modifiers(&format!("{path}.{modifiers_field}"), modifiers, v);
    let Some(code) = code else {
        v.push(path, format!("action requires {code_field}"));
        return None;
    };
    let Ok(key_code) = u16::try_from(code) else {
        v.push(
            &format!("{path}.{code_field}"),
            format!("{code} is outside 0..=65535"),
        );
        return None;
    };
    Some(KeyChord {
        key_code,
        modifiers: modifiers?,
    })
}

fn parse_modifiers(path: &str, list: Option<Vec<String>>, v: &mut Violations) -> Option<Vec<Modifier>> {
    let mut seen = Vec::new();
    let mut ok = true;
    for name in list.unwrap_or_default() {
        match name.parse::<Modifier>() {
            Ok(modifier) if !seen.contains(&modifier) => seen.push(modifier),
            Ok(_) => {}
            Err(e) => {
                v.push(path, e);
                ok = false;
            }
        }
    }
    ok.then_some(seen)
}

fn required_text(
    path: &str,
    field: &str,
    value: Option<String>,
    kind: &str,
    v: &mut Violations,
) -> Option<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Some(text),
        _ => {
            v.push(path, format!("{kind} action requires non-empty {field}"));
            None
        }
    }
}

fn non_negative(path: &str, field: &str, value: Option<i64>, default: u64, v: &mut Violations) -> u64 {
    match value {
        None => default,
        Some(n) => u64::try_from(n).unwrap_or_else(|_| {
            v.push(&format!("{path}.{field}"), format!("{n} must be >= 0"));
            default
        }),
    }
}

fn at_least_one(path: &str, field: &str, value: Option<i64>, default: u32, v: &mut Violations) -> Option<u32> {
    let Some(n) = value else {
        return Some(default);
    };
    match u32::try_from(n) {
        Ok(n) if n >= 1 => Some(n),
        _ => {
            v.push(&format!("{path}.{field}"), format!("{n} must be >= 1"));
            None
        }
    }
}

#[allow(clippy::cast_possible_truncation)] // Config floats are small, f32 precision is plenty
fn validate_scroll(path: &str, doc: &ScrollDocument, v: &mut Violations) -> AnalogScrollConfig {
    let defaults = AnalogScrollConfig::default();

    let deadzone = match doc.deadzone {
        None => defaults.deadzone,
        Some(d) if d.is_finite() && (0.0..1.0).contains(&d) => d as f32,
        Some(d) => {
            v.push(&format!("{path}.deadzone"), format!("{d} must be in [0, 1)"));
            defaults.deadzone
        }
    };

    let response_exponent = match doc.response_exponent {
        None => defaults.response_exponent,
        Some(e) if e.is_finite() && e > 0.0 => e as f32,
        Some(e) => {
            v.push(&format!("{path}.responseExponent"), format!("{e} must be > 0"));
            defaults.response_exponent
        }
    };

    let default_interval = u32::try_from(defaults.interval_ms).unwrap_or(u32::MAX);
    let interval_ms = at_least_one(path, "intervalMs", doc.interval_ms, default_interval, v)
        .map_or(defaults.interval_ms, u64::from);
    let min = at_least_one(path, "minLinesPerTick", doc.min_lines_per_tick, defaults.min_lines_per_tick, v);
    let max = at_least_one(path, "maxLinesPerTick", doc.max_lines_per_tick, defaults.max_lines_per_tick, v);

    if let (Some(min), Some(max)) = (min, max) {
        if max < min {
            v.push(
                &format!("{path}.maxLinesPerTick"),
                format!("{max} must be >= minLinesPerTick ({min})"),
            );
        }
    }

    AnalogScrollConfig {
        enabled: doc.enabled.unwrap_or(true),
        deadzone,
        interval_ms,
        min_lines_per_tick: min.unwrap_or(defaults.min_lines_per_tick),
        max_lines_per_tick: max.unwrap_or(defaults.max_lines_per_tick),
        response_exponent,
        invert: doc.invert.unwrap_or(false),
    }
}
