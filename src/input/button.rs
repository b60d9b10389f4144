//! Logical gamepad buttons.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A logical controller button, named the way config files name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Button {
    A,
    B,
    X,
    Y,
    LeftShoulder,
    RightShoulder,
    LeftTrigger,
    RightTrigger,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    Menu,
    Options,
    LeftThumbstickButton,
    RightThumbstickButton,
    Home,
}

impl Button {
    /// Every button, in the order a tick processes them.
    pub const ALL: [Self; 17] = [
        Self::A,
        Self::B,
        Self::X,
        Self::Y,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftTrigger,
        Self::RightTrigger,
        Self::DpadUp,
        Self::DpadDown,
        Self::DpadLeft,
        Self::DpadRight,
        Self::Menu,
        Self::Options,
        Self::LeftThumbstickButton,
        Self::RightThumbstickButton,
        Self::Home,
    ];

    /// The config-file name of this button.
    pub const fn name(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
            Self::X => "x",
            Self::Y => "y",
            Self::LeftShoulder => "leftShoulder",
            Self::RightShoulder => "rightShoulder",
            Self::LeftTrigger => "leftTrigger",
            Self::RightTrigger => "rightTrigger",
            Self::DpadUp => "dpadUp",
            Self::DpadDown => "dpadDown",
            Self::DpadLeft => "dpadLeft",
            Self::DpadRight => "dpadRight",
            Self::Menu => "menu",
            Self::Options => "options",
            Self::LeftThumbstickButton => "leftThumbstickButton",
            Self::RightThumbstickButton => "rightThumbstickButton",
            Self::Home => "home",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a button name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownButton(pub String);

impl fmt::Display for UnknownButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown button '{}'", self.0)
    }
}

impl std::error::Error for UnknownButton {}

impl FromStr for Button {
    type Err = UnknownButton;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.name() == s)
            .ok_or_else(|| UnknownButton(s.to_string()))
    }
}
