//! Scripted sampler for tests.
//!
//! Feeds pre-built tick batches to the runtime, then reports exhaustion.
//!
//! # Example
//!
//! ```rust,ignore
//! use bridge::input::mock::ScriptedSampler;
//! use bridge::input::{Button, DeviceSample};
//!
//! let mut script = ScriptedSampler::new();
//! let pad = script.connect("Stadia");
//! script.tick(vec![script.sample(DeviceSample::pressing(pad, &[Button::A]))]);
//! script.tick_idle(pad);
//! ```

use std::collections::VecDeque;

use tracing::trace;

use super::{DeviceId, DeviceIdAllocator, DeviceSample, InputEvent, InputSampler};
use crate::error::Result;

/// Replays queued ticks in order.
#[derive(Debug, Default)]
pub struct ScriptedSampler {
    ids: DeviceIdAllocator,
    pending: Vec<InputEvent>,
    ticks: VecDeque<Vec<InputEvent>>,
}

impl ScriptedSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a connect notification for the next tick and return the new handle.
    pub fn connect(&mut self, name: &str) -> DeviceId {
        let device = self.ids.allocate();
        self.pending.push(InputEvent::Connected {
            device,
            name: name.to_string(),
        });
        device
    }

    /// Wrap a sample as an event.
    pub fn sample(&self, sample: DeviceSample) -> InputEvent {
        InputEvent::Sample(sample)
    }

    /// Close a tick made of any pending connects plus `events`.
    pub fn tick(&mut self, events: Vec<InputEvent>) {
        let mut batch = std::mem::take(&mut self.pending);
        batch.extend(events);
        self.ticks.push_back(batch);
    }

    /// Close a tick where `device` reports nothing pressed.
    pub fn tick_idle(&mut self, device: DeviceId) {
        self.tick(vec![InputEvent::Sample(DeviceSample::idle(device))]);
    }

    /// Close a tick carrying a disconnect for `device`.
    pub fn disconnect(&mut self, device: DeviceId) {
        self.tick(vec![InputEvent::Disconnected { device }]);
    }

    /// Number of ticks not yet polled.
    pub fn remaining(&self) -> usize {
        self.ticks.len()
    }
}

impl InputSampler for ScriptedSampler {
    fn poll(&mut self) -> Result<Option<Vec<InputEvent>>> {
        let next = self.ticks.pop_front();
        trace!(events = next.as_ref().map_or(0, Vec::len), "Scripted tick");
        Ok(next)
    }

    fn describe(&self) -> String {
        format!("scripted ({} ticks)", self.ticks.len())
    }
}
