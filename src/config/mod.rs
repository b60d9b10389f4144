//! Mappings configuration.
//!
//! The JSON file is decoded into [`schema`] documents, validated into an
//! immutable [`ConfigModel`], and swapped wholesale by the
//! [`ConfigReloadCoordinator`] when the file changes.

mod loader;
mod model;
mod path;
mod reload;
pub mod schema;

pub use loader::{content_digest, load_config, parse_config, read_config};
pub use model::{
    Action, AnalogScrollConfig, ConfigModel, DEFAULT_DEBOUNCE_MS, DEFAULT_PROFILE, KeyChord,
    Mapping, Modifier, Profile, SafetySettings, TypedText,
};
pub use path::{DEFAULT_CONFIG_PATH, home_dir, resolve_config_path, resolve_path};
pub use reload::{ConfigReloadCoordinator, ConfigWatcher, FsConfigWatcher, ReloadOutcome};
