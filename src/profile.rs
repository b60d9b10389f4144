//! App-scoped profile selection.
//!
//! [`ProfileResolver`] is a pure lookup in `appProfiles`. The fallback to the
//! profile named `default` lives in [`active_profile`], which is the only
//! place the engine asks "which profile applies right now".

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, trace};

use crate::config::{ConfigModel, DEFAULT_PROFILE};

/// Looks up the profile bound to an application identifier.
#[derive(Debug, Clone, Copy)]
pub struct ProfileResolver<'a> {
    config: &'a ConfigModel,
}

impl<'a> ProfileResolver<'a> {
    pub const fn new(config: &'a ConfigModel) -> Self {
        Self { config }
    }

    /// Direct lookup; an absent identifier or unknown app yields `None`.
    ///
    /// The profile's `enabled` flag is not consulted here.
    pub fn resolve(&self, app_id: Option<&str>) -> Option<&'a str> {
        let app_id = app_id?;
        self.config.app_profiles.get(app_id).map(String::as_str)
    }
}

/// Profile that applies to `app_id`: its bound profile, else `default` when the
/// config defines one, else none.
pub fn active_profile<'a>(config: &'a ConfigModel, app_id: Option<&str>) -> Option<&'a str> {
    ProfileResolver::new(config).resolve(app_id).or_else(|| {
        config
            .profiles
            .get_key_value(DEFAULT_PROFILE)
            .map(|(name, _)| name.as_str())
    })
}

/// Source of the foreground application identifier.
pub trait FrontmostAppProvider: Send + Sync {
    fn current_app_identifier(&self) -> Option<String>;
}

/// Always reports the same identifier (`--app`), or nothing.
#[derive(Debug, Clone, Default)]
pub struct FixedApp(Option<String>);

impl FixedApp {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self(Some(app_id.into()))
    }

    /// A provider that never reports an app.
    pub const fn none() -> Self {
        Self(None)
    }
}

impl FrontmostAppProvider for FixedApp {
    fn current_app_identifier(&self) -> Option<String> {
        self.0.clone()
    }
}

const FRONTMOST_SCRIPT: &str = "id of application (path to frontmost application as text)";

/// Polls `osascript` on a background task and caches the last answer.
///
/// Reads never block the sequencer; they see whatever the poller stored last.
#[derive(Debug)]
pub struct MacFrontmostApp {
    current: watch::Receiver<Option<String>>,
}

impl MacFrontmostApp {
    /// Start polling every `interval`. Must be called inside a tokio runtime.
    pub fn spawn(interval: Duration) -> Self {
        let (tx, rx) = watch::channel(None);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let app = query_frontmost().await;
                let changed = tx.send_if_modified(|current| {
                    if *current == app {
                        false
                    } else {
                        *current = app.clone();
                        true
                    }
                });
                if changed {
                    debug!(app = ?app, "Frontmost app changed");
                }
                if tx.is_closed() {
                    trace!("Frontmost app poller stopping");
                    break;
                }
            }
        });
        info!(interval_ms = interval.as_millis(), "Polling frontmost app");
        Self { current: rx }
    }
}

impl FrontmostAppProvider for MacFrontmostApp {
    fn current_app_identifier(&self) -> Option<String> {
        self.current.borrow().clone()
    }
}

async fn query_frontmost() -> Option<String> {
    let output = Command::new("osascript")
        .args(["-e", FRONTMOST_SCRIPT])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!id.is_empty()).then_some(id)
}

/// Pick the provider for this run: `--app` wins, then macOS polling, then none.
pub fn frontmost_provider(pinned: Option<String>) -> Box<dyn FrontmostAppProvider> {
    match pinned {
        Some(app) => {
            info!(app = %app, "Frontmost app pinned");
            Box::new(FixedApp::new(app))
        }
        None if cfg!(target_os = "macos") => Box::new(MacFrontmostApp::spawn(Duration::from_millis(500))),
        None => {
            debug!("No frontmost app source on this platform; using the default profile");
            Box::new(FixedApp::none())
        }
    }
}
