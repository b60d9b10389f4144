//! Recording dispatcher for unit testing.
//!
//! Records every call for later assertion and can inject failures or slow
//! actions down to exercise error recovery and worker ordering.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bridge::dispatch::mock::{DispatchCall, RecordingDispatcher};
//! use bridge::dispatch::{DispatchSink, InlineSink};
//!
//! let recorder = Arc::new(RecordingDispatcher::new());
//! let mut sink = InlineSink::new(recorder.clone());
//! // ... run engine ticks into `sink` ...
//! assert_eq!(recorder.count(|c| matches!(c, DispatchCall::BeginHold { .. })), 1);
//! ```

use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use tracing::trace;

use super::ActionDispatcher;
use crate::config::{Action, KeyChord};
use crate::error::{BridgeError, Result};
use crate::input::{Button, DeviceId};

/// Recorded call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchCall {
    Execute {
        profile: String,
        button: Button,
        action: Action,
    },
    BeginHold {
        profile: String,
        button: Button,
        chord: KeyChord,
    },
    EndHold {
        profile: String,
        button: Button,
        chord: KeyChord,
    },
    Scroll {
        profile: String,
        lines: i32,
        source: DeviceId,
    },
}

/// Dispatcher that only records.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    calls: Mutex<Vec<DispatchCall>>,
    error_injection: Mutex<Option<BridgeError>>,
    delay: Option<Duration>,
}

impl RecordingDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call before recording it.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next call with `error`. The call is still recorded.
    pub fn fail_next(&self, error: BridgeError) {
        *self.error_injection.lock().unwrap() = Some(error);
    }

    /// Snapshot of all recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<DispatchCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&DispatchCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| pred(call)).count()
    }

    fn record(&self, call: DispatchCall) -> Result<()> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        trace!(?call, "Recorded dispatch");
        self.calls.lock().unwrap().push(call);
        self.error_injection.lock().unwrap().take().map_or(Ok(()), Err)
    }
}

impl ActionDispatcher for RecordingDispatcher {
    fn execute(&self, action: &Action, profile: &str, button: Button) -> Result<()> {
        self.record(DispatchCall::Execute {
            profile: profile.to_string(),
            button,
            action: action.clone(),
        })
    }

    fn begin_hold(&self, chord: &KeyChord, profile: &str, button: Button) -> Result<()> {
        self.record(DispatchCall::BeginHold {
            profile: profile.to_string(),
            button,
            chord: chord.clone(),
        })
    }

    fn end_hold(&self, chord: &KeyChord, profile: &str, button: Button) -> Result<()> {
        self.record(DispatchCall::EndHold {
            profile: profile.to_string(),
            button,
            chord: chord.clone(),
        })
    }

    fn scroll(&self, lines: i32, profile: &str, source: DeviceId) -> Result<()> {
        self.record(DispatchCall::Scroll {
            profile: profile.to_string(),
            lines,
            source,
        })
    }
}
