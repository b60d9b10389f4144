//! Begin/end pairing for hold actions.

use std::collections::BTreeMap;

use crate::config::KeyChord;
use crate::input::{Button, DeviceId};

/// What an open hold will release: the profile it began under and its chord.
///
/// Stored at begin time so a config reload between press and release still
/// ends exactly what was begun.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldBinding {
    pub profile: String,
    pub chord: KeyChord,
}

/// Tracks which (device, button) keys are currently `Held`.
#[derive(Debug, Default)]
pub struct HoldLifecycleManager {
    active: BTreeMap<(DeviceId, Button), HoldBinding>,
}

impl HoldLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle -> Held. Returns false, leaving the existing hold alone, when the
    /// key is already held.
    #[must_use]
    pub fn begin(&mut self, device: DeviceId, button: Button, binding: HoldBinding) -> bool {
        if self.active.contains_key(&(device, button)) {
            return false;
        }
        self.active.insert((device, button), binding);
        true
    }

    /// Held -> Idle, returning what to release. `None` for an idle key.
    pub fn end(&mut self, device: DeviceId, button: Button) -> Option<HoldBinding> {
        self.active.remove(&(device, button))
    }

    pub fn is_held(&self, device: DeviceId, button: Button) -> bool {
        self.active.contains_key(&(device, button))
    }

    /// Drop every hold owned by `device` without releasing anything.
    pub fn purge_device(&mut self, device: DeviceId) -> usize {
        let before = self.active.len();
        self.active.retain(|(owner, _), _| *owner != device);
        before - self.active.len()
    }

    /// Take every open hold, ordered by device then button.
    pub fn drain(&mut self) -> Vec<(DeviceId, Button, HoldBinding)> {
        std::mem::take(&mut self.active)
            .into_iter()
            .map(|((device, button), binding)| (device, button, binding))
            .collect()
    }

    pub fn entries_for(&self, device: DeviceId) -> usize {
        self.active.keys().filter(|(owner, _)| *owner == device).count()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
