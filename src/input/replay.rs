//! JSON-lines replay sampler.
//!
//! Each non-blank line is one tick. Lines starting with `#` are comments.
//!
//! ```text
//! {"events": [{"type": "connect", "device": "left", "name": "Stadia"}]}
//! {"events": [{"type": "sample", "device": "left", "pressed": ["a"]}], "repeat": 3}
//! {"events": [{"type": "sample", "device": "left", "leftStickY": -0.9}]}
//! {"events": [{"type": "disconnect", "device": "left"}]}
//! {}
//! ```
//!
//! Device names in the file are aliases; the sampler allocates a fresh
//! [`DeviceId`] for each connect. A sample for an alias that was never
//! connected implies a connect.

use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, trace};

use super::{Button, DeviceId, DeviceIdAllocator, DeviceSample, InputEvent, InputSampler};
use crate::error::{BridgeError, Result};

/// One line of a replay file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReplayTick {
    #[serde(default)]
    events: Vec<ReplayEvent>,
    /// Emit this tick this many times. Connects and disconnects only fire once.
    #[serde(default = "one")]
    repeat: u32,
}

const fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ReplayEvent {
    Connect {
        device: String,
        #[serde(default)]
        name: Option<String>,
    },
    Disconnect {
        device: String,
    },
    #[serde(rename_all = "camelCase")]
    Sample {
        device: String,
        #[serde(default)]
        pressed: Vec<Button>,
        #[serde(default)]
        left_stick_y: f32,
    },
}

/// Sampler reading ticks from a line-oriented reader.
pub struct ReplaySampler<R> {
    source: String,
    lines: io::Lines<R>,
    line_no: usize,
    ids: DeviceIdAllocator,
    aliases: HashMap<String, DeviceId>,
    queued: VecDeque<Vec<InputEvent>>,
}

impl ReplaySampler<Box<dyn BufRead>> {
    /// Open a replay file, or stdin when `path` is `-`.
    pub fn open(path: &Path) -> Result<Self> {
        if path.as_os_str() == "-" {
            debug!("Replaying input from stdin");
            let reader: Box<dyn BufRead> = Box::new(BufReader::new(io::stdin()));
            return Ok(Self::new(reader, "stdin"));
        }

        let file = File::open(path).map_err(|e| {
            BridgeError::Input(format!("Failed to open replay file {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "Replaying input from file");
        let reader: Box<dyn BufRead> = Box::new(BufReader::new(file));
        Ok(Self::new(reader, &path.display().to_string()))
    }
}

impl<R: BufRead> ReplaySampler<R> {
    /// Wrap any buffered reader.
    pub fn new(reader: R, source: &str) -> Self {
        Self {
            source: source.to_string(),
            lines: reader.lines(),
            line_no: 0,
            ids: DeviceIdAllocator::new(),
            aliases: HashMap::new(),
            queued: VecDeque::new(),
        }
    }

    fn resolve_alias(&mut self, alias: &str, batch: &mut Vec<InputEvent>) -> DeviceId {
        if let Some(device) = self.aliases.get(alias) {
            return *device;
        }
        let device = self.ids.allocate();
        self.aliases.insert(alias.to_string(), device);
        batch.push(InputEvent::Connected {
            device,
            name: alias.to_string(),
        });
        device
    }

    fn expand(&mut self, tick: ReplayTick) -> Result<()> {
        let mut first = Vec::with_capacity(tick.events.len());
        let mut samples = Vec::new();

        for event in tick.events {
            match event {
                ReplayEvent::Connect { device, name } => {
                    if self.aliases.contains_key(&device) {
                        return Err(self.line_error(&format!("device '{device}' is already connected")));
                    }
                    let id = self.ids.allocate();
                    self.aliases.insert(device.clone(), id);
                    first.push(InputEvent::Connected {
                        device: id,
                        name: name.unwrap_or(device),
                    });
                }
                ReplayEvent::Disconnect { device } => {
                    let id = self.aliases.remove(&device).ok_or_else(|| {
                        self.line_error(&format!("device '{device}' is not connected"))
                    })?;
                    first.push(InputEvent::Disconnected { device: id });
                }
                ReplayEvent::Sample {
                    device,
                    pressed,
                    left_stick_y,
                } => {
                    let id = self.resolve_alias(&device, &mut first);
                    let sample = InputEvent::Sample(DeviceSample {
                        device: id,
                        pressed: pressed.into_iter().collect(),
                        left_stick_y: left_stick_y.clamp(-1.0, 1.0),
                    });
                    samples.push(sample.clone());
                    first.push(sample);
                }
            }
        }

        self.queued.push_back(first);
        for _ in 1..tick.repeat {
            self.queued.push_back(samples.clone());
        }
        Ok(())
    }

    fn line_error(&self, message: &str) -> BridgeError {
        BridgeError::Input(format!("{} line {}: {message}", self.source, self.line_no))
    }
}

impl<R: BufRead> InputSampler for ReplaySampler<R> {
    fn poll(&mut self) -> Result<Option<Vec<InputEvent>>> {
        loop {
            if let Some(batch) = self.queued.pop_front() {
                trace!(events = batch.len(), "Replay tick");
                return Ok(Some(batch));
            }

            let Some(line) = self.lines.next() else {
                debug!(source = %self.source, "Replay exhausted");
                return Ok(None);
            };
            self.line_no += 1;
            let line = line.map_err(|e| self.line_error(&e.to_string()))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let tick: ReplayTick =
                serde_json::from_str(trimmed).map_err(|e| self.line_error(&e.to_string()))?;
            self.expand(tick)?;
        }
    }

    fn describe(&self) -> String {
        format!("replay ({})", self.source)
    }
}
