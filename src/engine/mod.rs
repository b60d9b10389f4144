//! The dispatch engine.
//!
//! All runtime state lives in one [`EngineState`] owned by the sequencer and
//! threaded through [`tick`]. A tick processes one FIFO batch of input events
//! against one config snapshot; nothing else mutates the state.
//!
//! Per sample, buttons are handled in [`Button::ALL`] order and the stick
//! after them. For each button edge:
//!
//! 1. the emergency button is intercepted before any profile lookup
//! 2. releases close an open hold, even while disabled
//! 3. while disabled, presses are suppressed
//! 4. the active profile and its mapping are resolved
//! 5. repeats are suppressed for edge-triggered mappings
//! 6. hold actions begin without debounce; everything else is debounced

mod analog;
mod debounce;
mod edge;
mod hold;
mod safety;

pub use analog::{AnalogScrollEngine, scroll_lines};
pub use debounce::DebounceGate;
pub use edge::{ButtonEdgeTracker, Edge};
pub use hold::{HoldBinding, HoldLifecycleManager};
pub use safety::{SafetyToggle, SafetyVerdict};

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::config::{Action, ConfigModel};
use crate::dispatch::{DispatchCommand, DispatchSink};
use crate::input::{Button, DeviceId, DeviceSample, InputEvent};
use crate::logging::category;
use crate::profile::active_profile;

/// Why an edge produced no dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Inside the mapping's debounce window.
    Debounced,
    /// Held button on an edge-triggered mapping.
    Repeat,
    /// No profile, a disabled profile, or no mapping for the button.
    NoMapping,
    /// The emergency toggle has the bridge disabled.
    Disabled,
    /// Hold begin on a key that is already held.
    HoldAlreadyActive,
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debounced => "debounced",
            Self::Repeat => "repeat",
            Self::NoMapping => "no mapping",
            Self::Disabled => "bridge disabled",
            Self::HoldAlreadyActive => "hold already active",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suppression {
    pub device: DeviceId,
    pub button: Button,
    pub reason: SuppressReason,
}

/// What one tick did.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Commands handed to the sink.
    pub dispatched: usize,
    pub suppressed: Vec<Suppression>,
    /// New enabled state after each emergency toggle, in order.
    pub safety_toggles: Vec<bool>,
}

impl TickReport {
    /// Number of suppressions with `reason`.
    pub fn suppressed_for(&self, reason: SuppressReason) -> usize {
        self.suppressed.iter().filter(|s| s.reason == reason).count()
    }
}

/// Inputs that are constant for the duration of one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub now: Instant,
    pub config: &'a ConfigModel,
    /// Frontmost application, read once per tick.
    pub app_id: Option<&'a str>,
}

/// Every piece of mutable runtime state.
#[derive(Debug, Default)]
pub struct EngineState {
    edges: ButtonEdgeTracker,
    debounce: DebounceGate,
    holds: HoldLifecycleManager,
    scroll: AnalogScrollEngine,
    safety: SafetyToggle,
    devices: BTreeMap<DeviceId, String>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn is_enabled(&self) -> bool {
        self.safety.is_enabled()
    }

    pub fn is_held(&self, device: DeviceId, button: Button) -> bool {
        self.holds.is_held(device, button)
    }

    pub fn open_holds(&self) -> usize {
        self.holds.len()
    }

    pub fn connected_devices(&self) -> Vec<DeviceId> {
        self.devices.keys().copied().collect()
    }

    /// Runtime entries keyed by `device`: button levels, holds and scroll clocks.
    pub fn entries_for(&self, device: DeviceId) -> usize {
        self.edges.entries_for(device) + self.holds.entries_for(device) + self.scroll.entries_for(device)
    }

    pub const fn debounce(&self) -> &DebounceGate {
        &self.debounce
    }
}

/// Process one batch of input events in arrival order.
pub fn tick(
    state: &mut EngineState,
    ctx: &TickContext<'_>,
    events: Vec<InputEvent>,
    sink: &mut dyn DispatchSink,
) -> TickReport {
    let mut report = TickReport::default();
    let profile = active_profile(ctx.config, ctx.app_id);

    for event in events {
        match event {
            InputEvent::Connected { device, name } => connect(state, device, name),
            InputEvent::Disconnected { device } => disconnect(state, device, sink),
            InputEvent::Sample(sample) => {
                if !state.devices.contains_key(&sample.device) {
                    connect(state, sample.device, sample.device.to_string());
                }
                process_sample(state, ctx, profile, &sample, sink, &mut report);
            }
        }
    }

    if report.dispatched > 0 || !report.suppressed.is_empty() {
        trace!(
            dispatched = report.dispatched,
            suppressed = report.suppressed.len(),
            "Tick complete"
        );
    }
    report
}

/// End every open hold. Called once when the sequencer stops.
pub fn shutdown(state: &mut EngineState, sink: &mut dyn DispatchSink) -> usize {
    let open = state.holds.drain();
    let count = open.len();
    for (device, button, binding) in open {
        info!(
            category = category::DISPATCH,
            device = %device,
            button = %button,
            "Releasing hold at shutdown"
        );
        sink.submit(DispatchCommand::EndHold {
            device,
            profile: binding.profile,
            button,
            chord: binding.chord,
        });
    }
    count
}

fn connect(state: &mut EngineState, device: DeviceId, name: String) {
    info!(category = category::CONNECTION, device = %device, name = %name, "Controller connected");
    state.devices.insert(device, name);
}

fn disconnect(state: &mut EngineState, device: DeviceId, sink: &mut dyn DispatchSink) {
    let levels = state.edges.purge_device(device);
    let holds = state.holds.purge_device(device);
    let clocks = state.scroll.purge_device(device);
    let name = state.devices.remove(&device);
    info!(
        category = category::CONNECTION,
        device = %device,
        name = name.as_deref().unwrap_or("unknown"),
        dropped_holds = holds,
        "Controller disconnected"
    );
    debug!(device = %device, levels, holds, clocks, "Purged device state");
    sink.device_disconnected(device);
}

fn process_sample(
    state: &mut EngineState,
    ctx: &TickContext<'_>,
    profile: Option<&str>,
    sample: &DeviceSample,
    sink: &mut dyn DispatchSink,
    report: &mut TickReport,
) {
    let device = sample.device;
    // The emergency button is settled before any other button in the same sample.
    let emergency = ctx.config.safety.emergency_toggle_button;
    let order = emergency
        .into_iter()
        .chain(Button::ALL.into_iter().filter(|b| Some(*b) != emergency));
    for button in order {
        let edge = state.edges.observe(device, button, sample.is_pressed(button));
        if edge != Edge::NoChange {
            handle_edge(state, ctx, profile, device, button, edge, sink, report);
        }
    }
    handle_stick(state, ctx, profile, sample, sink, report);
}

#[allow(clippy::too_many_arguments)]
fn handle_edge(
    state: &mut EngineState,
    ctx: &TickContext<'_>,
    profile: Option<&str>,
    device: DeviceId,
    button: Button,
    edge: Edge,
    sink: &mut dyn DispatchSink,
    report: &mut TickReport,
) {
    match state
        .safety
        .intercept(button, edge, ctx.config.safety.emergency_toggle_button)
    {
        SafetyVerdict::Toggled(enabled) => {
            warn!(
                category = category::SAFETY,
                device = %device,
                button = %button,
                enabled,
                "Emergency toggle: bridge {}",
                if enabled { "enabled" } else { "disabled" }
            );
            report.safety_toggles.push(enabled);
            return;
        }
        SafetyVerdict::Swallowed => return,
        SafetyVerdict::Pass => {}
    }

    if edge == Edge::Release {
        if let Some(binding) = state.holds.end(device, button) {
            submit(
                sink,
                report,
                DispatchCommand::EndHold {
                    device,
                    profile: binding.profile,
                    button,
                    chord: binding.chord,
                },
            );
        }
        return;
    }

    if !state.safety.is_enabled() {
        if edge == Edge::Press {
            suppress(report, device, button, SuppressReason::Disabled);
        }
        return;
    }

    let resolved = profile.and_then(|name| {
        let p = ctx.config.profile(name)?;
        if !p.enabled {
            return None;
        }
        p.mapping(button).map(|mapping| (name, mapping))
    });
    let Some((profile, mapping)) = resolved else {
        if edge == Edge::Press {
            debug!(
                category = category::MAPPING,
                device = %device,
                button = %button,
                profile = profile.unwrap_or("none"),
                "No mapping"
            );
            suppress(report, device, button, SuppressReason::NoMapping);
        }
        return;
    };

    let is_hold = matches!(mapping.action, Action::HoldKeystroke(_));
    if edge == Edge::Repeat && (mapping.edge_trigger || is_hold) {
        trace!(category = category::SUPPRESSED, device = %device, button = %button, "Repeat suppressed");
        report.suppressed.push(Suppression {
            device,
            button,
            reason: SuppressReason::Repeat,
        });
        return;
    }

    debug!(
        category = category::MAPPING,
        device = %device,
        button = %button,
        profile,
        action = mapping.action.kind(),
        edge = edge.name(),
        "Resolved mapping"
    );

    if let Action::HoldKeystroke(chord) = &mapping.action {
        let binding = HoldBinding {
            profile: profile.to_string(),
            chord: chord.clone(),
        };
        if state.holds.begin(device, button, binding) {
            submit(
                sink,
                report,
                DispatchCommand::BeginHold {
                    device,
                    profile: profile.to_string(),
                    button,
                    chord: chord.clone(),
                },
            );
        } else {
            warn!(
                category = category::SUPPRESSED,
                device = %device,
                button = %button,
                "Hold begin ignored, key already held"
            );
            report.suppressed.push(Suppression {
                device,
                button,
                reason: SuppressReason::HoldAlreadyActive,
            });
        }
        return;
    }

    let window = Duration::from_millis(mapping.debounce_ms);
    if !state.debounce.allow(profile, button, ctx.now, window) {
        suppress(report, device, button, SuppressReason::Debounced);
        return;
    }

    submit(
        sink,
        report,
        DispatchCommand::Execute {
            device,
            profile: profile.to_string(),
            button,
            action: mapping.action.clone(),
            label: mapping.label(),
        },
    );
}

fn handle_stick(
    state: &mut EngineState,
    ctx: &TickContext<'_>,
    profile: Option<&str>,
    sample: &DeviceSample,
    sink: &mut dyn DispatchSink,
    report: &mut TickReport,
) {
    if !state.safety.is_enabled() {
        return;
    }
    let Some(name) = profile else {
        return;
    };
    let Some(analog) = ctx
        .config
        .profile(name)
        .filter(|p| p.enabled)
        .and_then(|p| p.analog.as_ref())
    else {
        return;
    };

    if let Some(lines) = state
        .scroll
        .step(sample.device, name, sample.left_stick_y, analog, ctx.now)
    {
        submit(
            sink,
            report,
            DispatchCommand::Scroll {
                device: sample.device,
                profile: name.to_string(),
                lines,
            },
        );
    }
}

fn submit(sink: &mut dyn DispatchSink, report: &mut TickReport, command: DispatchCommand) {
    if matches!(command, DispatchCommand::Scroll { .. }) {
        trace!(category = category::DISPATCH, command = %command, "Dispatching");
    } else {
        info!(
            category = category::DISPATCH,
            kind = command.kind(),
            profile = command.profile(),
            command = %command,
            "Dispatching"
        );
    }
    sink.submit(command);
    report.dispatched += 1;
}

fn suppress(report: &mut TickReport, device: DeviceId, button: Button, reason: SuppressReason) {
    debug!(
        category = category::SUPPRESSED,
        device = %device,
        button = %button,
        reason = %reason,
        "Suppressed"
    );
    report.suppressed.push(Suppression { device, button, reason });
}
