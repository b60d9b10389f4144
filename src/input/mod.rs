//! Controller input abstraction.
//!
//! Samplers turn whatever the platform offers (callbacks, event pumps, a replay
//! file) into one FIFO batch of [`InputEvent`]s per tick, so the engine never
//! sees connect/disconnect notifications racing its own processing.

mod button;
#[cfg(feature = "gamepad")]
pub mod gamepad;
pub mod mock;
pub mod replay;

pub use button::{Button, UnknownButton};

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::error::Result;

/// Stable handle for a connected controller.
///
/// Handles are allocated from a counter at connect time and never reused
/// within a process, so a reconnect is a new device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeviceId(u64);

impl DeviceId {
    /// Wrap a raw handle value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw handle value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pad-{}", self.0)
    }
}

/// Monotonic source of [`DeviceId`]s.
#[derive(Debug, Default)]
pub struct DeviceIdAllocator {
    next: u64,
}

impl DeviceIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next unused handle.
    pub fn allocate(&mut self) -> DeviceId {
        self.next += 1;
        DeviceId(self.next)
    }
}

/// Everything a sampler observed for one device during one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSample {
    pub device: DeviceId,
    /// Buttons whose raw level is pressed.
    pub pressed: BTreeSet<Button>,
    /// Left stick vertical axis in [-1, 1], positive is up.
    pub left_stick_y: f32,
}

impl DeviceSample {
    /// A sample with nothing pressed and the stick centered.
    pub fn idle(device: DeviceId) -> Self {
        Self {
            device,
            pressed: BTreeSet::new(),
            left_stick_y: 0.0,
        }
    }

    /// A sample with the given buttons held.
    pub fn pressing(device: DeviceId, buttons: &[Button]) -> Self {
        Self {
            device,
            pressed: buttons.iter().copied().collect(),
            left_stick_y: 0.0,
        }
    }

    /// Set the stick deflection.
    pub fn with_stick(mut self, left_stick_y: f32) -> Self {
        self.left_stick_y = left_stick_y;
        self
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.pressed.contains(&button)
    }
}

/// One inbound notification, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Connected { device: DeviceId, name: String },
    Disconnected { device: DeviceId },
    Sample(DeviceSample),
}

impl InputEvent {
    /// The device this event concerns.
    pub const fn device(&self) -> DeviceId {
        match self {
            Self::Connected { device, .. } | Self::Disconnected { device } => *device,
            Self::Sample(sample) => sample.device,
        }
    }
}

/// Source of per-tick input batches.
pub trait InputSampler {
    /// Drain everything observed since the last call.
    ///
    /// Returns `Ok(None)` once the source is exhausted and will never
    /// produce more events.
    fn poll(&mut self) -> Result<Option<Vec<InputEvent>>>;

    /// Short description for startup logs.
    fn describe(&self) -> String;
}

/// Type alias for boxed trait object.
pub type BoxedSampler = Box<dyn InputSampler>;
