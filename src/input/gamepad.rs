//! Physical controller sampler backed by gilrs.

use std::collections::{BTreeSet, HashMap};

use gilrs::{Axis, Event, EventType, GamepadId, Gilrs};
use tracing::{debug, info, warn};

use super::{Button, DeviceId, DeviceIdAllocator, DeviceSample, InputEvent, InputSampler};
use crate::error::{BridgeError, Result};
use crate::logging::category;

/// Polls every connected gamepad once per tick.
pub struct GamepadSampler {
    gilrs: Gilrs,
    ids: DeviceIdAllocator,
    devices: HashMap<GamepadId, DeviceId>,
    pending: Vec<InputEvent>,
}

impl GamepadSampler {
    /// Initialize gilrs and register controllers that are already connected.
    pub fn new() -> Result<Self> {
        let gilrs = Gilrs::new()
            .map_err(|e| BridgeError::Input(format!("gilrs initialization failed: {e}")))?;

        let mut sampler = Self {
            gilrs,
            ids: DeviceIdAllocator::new(),
            devices: HashMap::new(),
            pending: Vec::new(),
        };

        let existing: Vec<(GamepadId, String)> = sampler
            .gilrs
            .gamepads()
            .filter(|(_, pad)| pad.is_connected())
            .map(|(id, pad)| (id, pad.name().to_string()))
            .collect();
        if existing.is_empty() {
            info!(category = category::CONNECTION, "No controller currently connected, waiting");
        }
        for (id, name) in existing {
            sampler.register(id, name);
        }

        Ok(sampler)
    }

    fn register(&mut self, id: GamepadId, name: String) {
        if self.devices.contains_key(&id) {
            return;
        }
        let device = self.ids.allocate();
        debug!(gilrs_id = ?id, device = %device, "Assigned device handle");
        self.devices.insert(id, device);
        self.pending.push(InputEvent::Connected { device, name });
    }

    fn sample(&self, id: GamepadId, device: DeviceId) -> DeviceSample {
        let pad = self.gilrs.gamepad(id);
        let pressed: BTreeSet<Button> = BUTTON_MAP
            .iter()
            .filter(|(native, _)| pad.is_pressed(*native))
            .map(|(_, button)| *button)
            .collect();

        DeviceSample {
            device,
            pressed,
            left_stick_y: pad.value(Axis::LeftStickY),
        }
    }
}

/// gilrs uses positional names; config files use the controller's labels.
const BUTTON_MAP: [(gilrs::Button, Button); 17] = [
    (gilrs::Button::South, Button::A),
    (gilrs::Button::East, Button::B),
    (gilrs::Button::West, Button::X),
    (gilrs::Button::North, Button::Y),
    (gilrs::Button::LeftTrigger, Button::LeftShoulder),
    (gilrs::Button::RightTrigger, Button::RightShoulder),
    (gilrs::Button::LeftTrigger2, Button::LeftTrigger),
    (gilrs::Button::RightTrigger2, Button::RightTrigger),
    (gilrs::Button::DPadUp, Button::DpadUp),
    (gilrs::Button::DPadDown, Button::DpadDown),
    (gilrs::Button::DPadLeft, Button::DpadLeft),
    (gilrs::Button::DPadRight, Button::DpadRight),
    (gilrs::Button::Start, Button::Menu),
    (gilrs::Button::Select, Button::Options),
    (gilrs::Button::LeftThumb, Button::LeftThumbstickButton),
    (gilrs::Button::RightThumb, Button::RightThumbstickButton),
    (gilrs::Button::Mode, Button::Home),
];

impl InputSampler for GamepadSampler {
    fn poll(&mut self) -> Result<Option<Vec<InputEvent>>> {
        let mut batch = std::mem::take(&mut self.pending);

        // Pump gilrs so connection changes and cached state are current.
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected => {
                    let name = self.gilrs.gamepad(id).name().to_string();
                    self.register(id, name);
                    batch.append(&mut self.pending);
                }
                EventType::Disconnected => {
                    if let Some(device) = self.devices.remove(&id) {
                        batch.push(InputEvent::Disconnected { device });
                    } else {
                        warn!(gilrs_id = ?id, "Disconnect for unknown gamepad");
                    }
                }
                _ => {}
            }
        }

        let mut connected: Vec<(GamepadId, DeviceId)> =
            self.devices.iter().map(|(id, device)| (*id, *device)).collect();
        connected.sort_by_key(|(_, device)| *device);
        for (id, device) in connected {
            batch.push(InputEvent::Sample(self.sample(id, device)));
        }

        Ok(Some(batch))
    }

    fn describe(&self) -> String {
        format!("gamepad ({} connected)", self.devices.len())
    }
}
