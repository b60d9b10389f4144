//! Action dispatch.
//!
//! The engine decides *what* to do and emits [`DispatchCommand`]s into a
//! [`DispatchSink`]. Sinks decide *where* the work runs (inline on the
//! sequencer or on per-device workers) and hand each command to an
//! [`ActionDispatcher`], which performs it or, in dry-run mode, only logs it.

mod command;
mod keys;
pub mod mock;
mod system;
mod worker;

pub use command::DispatchCommand;
pub use keys::{KeyInjector, UnavailableInjector, default_injector};
#[cfg(feature = "inject")]
pub use keys::RdevInjector;
pub use system::SystemDispatcher;
pub use worker::DispatchWorkers;

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::{Action, KeyChord};
use crate::error::Result;
use crate::input::{Button, DeviceId};
use crate::logging::category;

/// Performs resolved actions against the host.
///
/// Implementations are shared between worker threads, so every method takes
/// `&self`.
///
/// # Implementation Notes
///
/// - In dry-run mode every method logs the simulated action and returns `Ok`
/// - `begin_hold` presses the chord's modifiers then key; `end_hold` releases
///   them in reverse order
pub trait ActionDispatcher: Send + Sync {
    /// Run a one-shot action.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when input injection is not allowed,
    /// `ProcessFailed` when a child process exits non-zero.
    fn execute(&self, action: &Action, profile: &str, button: Button) -> Result<()>;

    /// Press and keep holding `chord`.
    fn begin_hold(&self, chord: &KeyChord, profile: &str, button: Button) -> Result<()>;

    /// Release a chord previously passed to `begin_hold`.
    fn end_hold(&self, chord: &KeyChord, profile: &str, button: Button) -> Result<()>;

    /// Scroll vertically by `lines`; positive scrolls up.
    fn scroll(&self, lines: i32, profile: &str, source: DeviceId) -> Result<()>;

    /// Switch dry-run mode after a config reload. Dispatchers without a
    /// dry-run mode ignore it.
    fn set_dry_run(&self, _dry_run: bool) {}
}

/// Type alias for a shared dispatcher.
pub type SharedDispatcher = Arc<dyn ActionDispatcher>;

/// Receives commands from the engine in the order they were decided.
pub trait DispatchSink {
    fn submit(&mut self, command: DispatchCommand);

    /// The device is gone; its queued work may finish, then its resources go.
    fn device_disconnected(&mut self, _device: DeviceId) {}

    /// Finish all queued work.
    fn shutdown(&mut self) {}
}

/// Collecting sink, used by tests and dry inspections of a tick.
impl DispatchSink for Vec<DispatchCommand> {
    fn submit(&mut self, command: DispatchCommand) {
        self.push(command);
    }
}

/// Runs every command on the calling thread.
///
/// Blocks the sequencer for the duration of each action.
pub struct InlineSink {
    dispatcher: SharedDispatcher,
}

impl InlineSink {
    pub fn new(dispatcher: SharedDispatcher) -> Self {
        Self { dispatcher }
    }
}

impl DispatchSink for InlineSink {
    fn submit(&mut self, command: DispatchCommand) {
        run_command(self.dispatcher.as_ref(), &command);
    }
}

/// Run one command and log its outcome. Failures never propagate.
pub fn run_command(dispatcher: &dyn ActionDispatcher, command: &DispatchCommand) {
    match command.run(dispatcher) {
        Ok(()) => debug!(
            category = category::DISPATCH,
            device = %command.device(),
            kind = command.kind(),
            "Action completed"
        ),
        Err(e) if e.is_action_error() => warn!(
            category = category::ERROR,
            device = %command.device(),
            profile = command.profile(),
            kind = command.kind(),
            error = %e,
            hint = e.suggestion().unwrap_or(""),
            "Action failed"
        ),
        Err(e) => error!(
            category = category::ERROR,
            device = %command.device(),
            kind = command.kind(),
            error = %e,
            "Unexpected dispatch failure"
        ),
    }
}
