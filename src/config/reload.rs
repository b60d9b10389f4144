//! Hot reload of the mappings file.
//!
//! The coordinator never hands out a partially applied model: a reload either
//! produces a complete, validated replacement or leaves the current one alone.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use super::loader::{parse_config, read_config};
use super::model::ConfigModel;
use crate::error::BridgeError;
use crate::logging::category;

/// Reports when the config source last changed.
pub trait ConfigWatcher: Send {
    fn last_modified(&self, path: &Path) -> Option<SystemTime>;
}

/// Filesystem mtime watcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsConfigWatcher;

impl ConfigWatcher for FsConfigWatcher {
    fn last_modified(&self, path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|meta| meta.modified()).ok()
    }
}

/// Result of one reload check.
#[derive(Debug)]
pub enum ReloadOutcome {
    /// Nothing to apply.
    Unchanged,
    /// A new validated model is active.
    Reloaded(Arc<ConfigModel>),
    /// The source changed but could not be applied; the previous model stays.
    Failed(BridgeError),
}

/// Detects config changes and builds whole replacement models.
pub struct ConfigReloadCoordinator<W = FsConfigWatcher> {
    path: PathBuf,
    watcher: W,
    current: Arc<ConfigModel>,
    seen_modified: Option<SystemTime>,
    missing_reported: bool,
    last_reload: Option<DateTime<Local>>,
}

impl ConfigReloadCoordinator<FsConfigWatcher> {
    /// Watch `path` by mtime, starting from the model loaded at startup.
    pub fn new(path: PathBuf, initial: Arc<ConfigModel>) -> Self {
        Self::with_watcher(path, initial, FsConfigWatcher)
    }
}

impl<W: ConfigWatcher> ConfigReloadCoordinator<W> {
    pub fn with_watcher(path: PathBuf, initial: Arc<ConfigModel>, watcher: W) -> Self {
        let seen_modified = watcher.last_modified(&path);
        Self {
            path,
            watcher,
            current: initial,
            seen_modified,
            missing_reported: false,
            last_reload: None,
        }
    }

    /// The model most recently loaded successfully.
    pub fn current(&self) -> Arc<ConfigModel> {
        Arc::clone(&self.current)
    }

    /// Wall-clock time of the last applied reload.
    pub const fn last_reload(&self) -> Option<DateTime<Local>> {
        self.last_reload
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check the source once and reload it if it changed.
    ///
    /// A file that fails to load is not retried until its mtime moves again,
    /// and a missing file is reported once until it reappears.
    pub fn poll(&mut self) -> ReloadOutcome {
        let Some(modified) = self.watcher.last_modified(&self.path) else {
            self.seen_modified = None;
            if self.missing_reported {
                return ReloadOutcome::Unchanged;
            }
            self.missing_reported = true;
            let err = BridgeError::ConfigNotFound {
                path: self.path.display().to_string(),
            };
            warn!(
                category = category::RELOAD,
                error = %err,
                "Config source disappeared, keeping previous config"
            );
            return ReloadOutcome::Failed(err);
        };
        self.missing_reported = false;

        if self.seen_modified == Some(modified) {
            return ReloadOutcome::Unchanged;
        }
        self.seen_modified = Some(modified);

        match read_config(&self.path).and_then(|bytes| parse_config(&bytes)) {
            Ok(model) if model.digest() == self.current.digest() => {
                debug!(category = category::RELOAD, "Config touched without content change");
                ReloadOutcome::Unchanged
            }
            Ok(model) => {
                let model = Arc::new(model);
                self.current = Arc::clone(&model);
                let now = Local::now();
                self.last_reload = Some(now);
                info!(
                    category = category::RELOAD,
                    path = %self.path.display(),
                    profiles = model.profiles.len(),
                    at = %now.to_rfc3339(),
                    "Config reloaded"
                );
                ReloadOutcome::Reloaded(model)
            }
            Err(err) => {
                warn!(
                    category = category::RELOAD,
                    path = %self.path.display(),
                    error = %err,
                    "Config reload failed, keeping previous config"
                );
                ReloadOutcome::Failed(err)
            }
        }
    }
}
