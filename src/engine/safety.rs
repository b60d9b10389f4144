//! Global enable/disable switch driven by the emergency button.

use super::edge::Edge;
use crate::input::Button;

/// What the toggle did with an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyVerdict {
    /// The emergency button was pressed; carries the new enabled state.
    Toggled(bool),
    /// A repeat of the emergency button; consumed without effect.
    Swallowed,
    /// Not the emergency button, or a release.
    Pass,
}

#[derive(Debug)]
pub struct SafetyToggle {
    enabled: bool,
}

impl Default for SafetyToggle {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl SafetyToggle {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flip the state and return the new value.
    pub const fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Checked before any profile or mapping lookup.
    ///
    /// Releases pass through so a hold that was open on the emergency button
    /// can still be closed.
    pub fn intercept(&mut self, button: Button, edge: Edge, emergency: Option<Button>) -> SafetyVerdict {
        let Some(emergency) = emergency else {
            return SafetyVerdict::Pass;
        };
        if button != emergency {
            return SafetyVerdict::Pass;
        }
        match edge {
            Edge::Press => SafetyVerdict::Toggled(self.toggle()),
            Edge::Repeat => SafetyVerdict::Swallowed,
            Edge::Release | Edge::NoChange => SafetyVerdict::Pass,
        }
    }
}
