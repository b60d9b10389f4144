//! Resolved work handed from the engine to a dispatch sink.

use std::fmt;

use super::ActionDispatcher;
use crate::config::{Action, KeyChord};
use crate::error::Result;
use crate::input::{Button, DeviceId};

/// One action the engine decided to perform.
///
/// Carries everything the dispatcher needs, so a command queued before a
/// config reload still runs against the snapshot it was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchCommand {
    Execute {
        device: DeviceId,
        profile: String,
        button: Button,
        action: Action,
        /// Mapping description, or the action summary.
        label: String,
    },
    BeginHold {
        device: DeviceId,
        profile: String,
        button: Button,
        chord: KeyChord,
    },
    EndHold {
        device: DeviceId,
        profile: String,
        button: Button,
        chord: KeyChord,
    },
    Scroll {
        device: DeviceId,
        profile: String,
        lines: i32,
    },
}

impl DispatchCommand {
    pub const fn device(&self) -> DeviceId {
        match self {
            Self::Execute { device, .. }
            | Self::BeginHold { device, .. }
            | Self::EndHold { device, .. }
            | Self::Scroll { device, .. } => *device,
        }
    }

    pub fn profile(&self) -> &str {
        match self {
            Self::Execute { profile, .. }
            | Self::BeginHold { profile, .. }
            | Self::EndHold { profile, .. }
            | Self::Scroll { profile, .. } => profile,
        }
    }

    /// The button behind the command; scrolls come from the stick.
    pub const fn button(&self) -> Option<Button> {
        match self {
            Self::Execute { button, .. } | Self::BeginHold { button, .. } | Self::EndHold { button, .. } => {
                Some(*button)
            }
            Self::Scroll { .. } => None,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Execute { .. } => "execute",
            Self::BeginHold { .. } => "beginHold",
            Self::EndHold { .. } => "endHold",
            Self::Scroll { .. } => "scroll",
        }
    }

    /// Perform the command with `dispatcher`.
    pub fn run(&self, dispatcher: &dyn ActionDispatcher) -> Result<()> {
        match self {
            Self::Execute {
                profile,
                button,
                action,
                ..
            } => dispatcher.execute(action, profile, *button),
            Self::BeginHold {
                profile, button, chord, ..
            } => dispatcher.begin_hold(chord, profile, *button),
            Self::EndHold {
                profile, button, chord, ..
            } => dispatcher.end_hold(chord, profile, *button),
            Self::Scroll {
                device,
                profile,
                lines,
            } => dispatcher.scroll(*lines, profile, *device),
        }
    }
}

impl fmt::Display for DispatchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Execute {
                device,
                button,
                label,
                ..
            } => write!(f, "{device}/{button}: {label}"),
            Self::BeginHold {
                device, button, chord, ..
            } => write!(f, "{device}/{button}: hold {chord}"),
            Self::EndHold {
                device, button, chord, ..
            } => write!(f, "{device}/{button}: release {chord}"),
            Self::Scroll { device, lines, .. } => write!(f, "{device}/stick: scroll {lines:+}"),
        }
    }
}
