//! Level-to-edge conversion per (device, button).

use std::collections::HashMap;

use crate::input::{Button, DeviceId};

/// Transition observed for one button on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Released on the previous tick, pressed now.
    Press,
    /// Pressed on the previous tick, released now.
    Release,
    /// Still pressed after the press edge.
    Repeat,
    NoChange,
}

impl Edge {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Press => "press",
            Self::Release => "release",
            Self::Repeat => "repeat",
            Self::NoChange => "none",
        }
    }
}

/// Remembers the last raw level of every observed button.
#[derive(Debug, Default)]
pub struct ButtonEdgeTracker {
    levels: HashMap<(DeviceId, Button), bool>,
}

impl ButtonEdgeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `pressed` with the stored level, then store it.
    ///
    /// A button never seen before counts as released.
    pub fn observe(&mut self, device: DeviceId, button: Button, pressed: bool) -> Edge {
        let previous = self.levels.insert((device, button), pressed).unwrap_or(false);
        match (previous, pressed) {
            (false, true) => Edge::Press,
            (true, false) => Edge::Release,
            (true, true) => Edge::Repeat,
            (false, false) => Edge::NoChange,
        }
    }

    pub fn is_pressed(&self, device: DeviceId, button: Button) -> bool {
        self.levels.get(&(device, button)).copied().unwrap_or(false)
    }

    /// Forget every level recorded for `device`. Returns how many were dropped.
    pub fn purge_device(&mut self, device: DeviceId) -> usize {
        let before = self.levels.len();
        self.levels.retain(|(owner, _), _| *owner != device);
        before - self.levels.len()
    }

    /// Number of levels recorded for `device`.
    pub fn entries_for(&self, device: DeviceId) -> usize {
        self.levels.keys().filter(|(owner, _)| *owner == device).count()
    }
}
