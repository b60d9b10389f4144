//! Left-stick deflection to throttled scroll ticks.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::AnalogScrollConfig;
use crate::input::DeviceId;

/// Floor for the deadzone span so a deadzone near 1.0 cannot divide by zero.
const MIN_SPAN: f32 = 1e-4;

/// Signed scroll lines for one stick sample, before throttling.
///
/// `None` at or inside the deadzone. Positive follows the stick's positive
/// direction unless `invert` is set.
#[allow(clippy::cast_possible_truncation)] // Bounded by max_lines_per_tick
pub fn scroll_lines(sample: f32, config: &AnalogScrollConfig) -> Option<i32> {
    if !sample.is_finite() {
        return None;
    }
    let magnitude = sample.abs();
    if magnitude <= config.deadzone {
        return None;
    }

    let span = (1.0 - config.deadzone).max(MIN_SPAN);
    let normalized = ((magnitude - config.deadzone) / span).clamp(0.0, 1.0);
    let curved = normalized.powf(config.response_exponent);

    let min = f64::from(config.min_lines_per_tick);
    let max = f64::from(config.max_lines_per_tick);
    let lines = (f64::from(curved).mul_add(max - min, min)).round().max(1.0) as i32;

    let direction = if (sample < 0.0) == config.invert { 1 } else { -1 };
    Some(direction * lines)
}

/// Applies [`scroll_lines`] and the per-(device, profile) throttle.
#[derive(Debug, Default)]
pub struct AnalogScrollEngine {
    last_scroll: HashMap<(DeviceId, String), Instant>,
}

impl AnalogScrollEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to scroll this tick, advancing the throttle clock when non-empty.
    pub fn step(
        &mut self,
        device: DeviceId,
        profile: &str,
        sample: f32,
        config: &AnalogScrollConfig,
        now: Instant,
    ) -> Option<i32> {
        if !config.enabled {
            return None;
        }
        let lines = scroll_lines(sample, config)?;

        let key = (device, profile.to_string());
        let interval = Duration::from_millis(config.interval_ms);
        if let Some(last) = self.last_scroll.get(&key) {
            if now.saturating_duration_since(*last) < interval {
                return None;
            }
        }
        self.last_scroll.insert(key, now);
        Some(lines)
    }

    pub fn purge_device(&mut self, device: DeviceId) -> usize {
        let before = self.last_scroll.len();
        self.last_scroll.retain(|(owner, _), _| *owner != device);
        before - self.last_scroll.len()
    }

    pub fn entries_for(&self, device: DeviceId) -> usize {
        self.last_scroll.keys().filter(|(owner, _)| *owner == device).count()
    }
}
