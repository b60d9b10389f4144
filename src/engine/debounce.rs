//! Minimum re-trigger interval per (profile, button).
//!
//! Clocks are not keyed by device: two controllers on the same profile share
//! one clock per button.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::input::Button;

#[derive(Debug, Default)]
pub struct DebounceGate {
    last_trigger: HashMap<(String, Button), Instant>,
}

impl DebounceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and records `now` when no trigger is on record or the
    /// last one is at least `min_interval` old.
    pub fn allow(&mut self, profile: &str, button: Button, now: Instant, min_interval: Duration) -> bool {
        let key = (profile.to_string(), button);
        if let Some(last) = self.last_trigger.get(&key) {
            if now.saturating_duration_since(*last) < min_interval {
                return false;
            }
        }
        self.last_trigger.insert(key, now);
        true
    }

    /// When (profile, button) last passed the gate.
    pub fn last_trigger(&self, profile: &str, button: Button) -> Option<Instant> {
        self.last_trigger.get(&(profile.to_string(), button)).copied()
    }
}
