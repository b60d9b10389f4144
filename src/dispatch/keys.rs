//! Synthetic keyboard and scroll-wheel events.

use std::sync::Arc;

use crate::config::{KeyChord, Modifier};
use crate::error::{BridgeError, Result};

/// One raw key transition within a chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Press(KeyTarget),
    Release(KeyTarget),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTarget {
    Modifier(Modifier),
    Key(u16),
}

fn chord_targets(chord: &KeyChord) -> impl DoubleEndedIterator<Item = KeyTarget> + '_ {
    chord
        .modifiers
        .iter()
        .map(|m| KeyTarget::Modifier(*m))
        .chain(std::iter::once(KeyTarget::Key(chord.key_code)))
}

/// Press modifiers then the key. If a press fails, everything already
/// pressed is released before the error is returned.
pub fn press_chord(chord: &KeyChord, mut post: impl FnMut(KeyEvent) -> Result<()>) -> Result<()> {
    let mut pressed = Vec::new();
    for target in chord_targets(chord) {
        if let Err(e) = post(KeyEvent::Press(target)) {
            for done in pressed.into_iter().rev() {
                let _ = post(KeyEvent::Release(done));
            }
            return Err(e);
        }
        pressed.push(target);
    }
    Ok(())
}

/// Release the key then the modifiers in reverse order. Every release is
/// attempted; the first failure is returned.
pub fn release_chord(chord: &KeyChord, mut post: impl FnMut(KeyEvent) -> Result<()>) -> Result<()> {
    let mut first_error = None;
    for target in chord_targets(chord).rev() {
        if let Err(e) = post(KeyEvent::Release(target)) {
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Posts raw input events to the host.
pub trait KeyInjector: Send + Sync {
    /// Press the chord's modifiers, then its key. Nothing is left pressed on failure.
    fn key_down(&self, chord: &KeyChord) -> Result<()>;

    /// Release the key, then the modifiers in reverse order.
    fn key_up(&self, chord: &KeyChord) -> Result<()>;

    /// Press and release.
    fn tap(&self, chord: &KeyChord) -> Result<()> {
        self.key_down(chord)?;
        self.key_up(chord)
    }

    /// Vertical wheel movement; positive scrolls up.
    fn scroll(&self, lines: i32) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Injector used when the binary was built without injection support.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableInjector;

impl UnavailableInjector {
    fn unavailable() -> BridgeError {
        BridgeError::ActionFailed(
            "keyboard injection is not available in this build (enable the `inject` feature)".to_string(),
        )
    }
}

impl KeyInjector for UnavailableInjector {
    fn key_down(&self, _chord: &KeyChord) -> Result<()> {
        Err(Self::unavailable())
    }

    fn key_up(&self, _chord: &KeyChord) -> Result<()> {
        Err(Self::unavailable())
    }

    fn scroll(&self, _lines: i32) -> Result<()> {
        Err(Self::unavailable())
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

#[cfg(feature = "inject")]
mod rdev_impl {
    use std::thread;
    use std::time::Duration;

    use rdev::{EventType, Key, simulate};
    use tracing::trace;

    use super::{KeyEvent, KeyInjector, KeyTarget, press_chord, release_chord};
    use crate::config::{KeyChord, Modifier};
    use crate::error::{BridgeError, Result};

    /// Gap between posted events; macOS drops events posted back to back.
    const EVENT_GAP: Duration = Duration::from_millis(2);

    /// Injector backed by rdev's event simulation.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RdevInjector;

    const fn modifier_key(modifier: Modifier) -> Key {
        match modifier {
            Modifier::Command => Key::MetaLeft,
            Modifier::Shift => Key::ShiftLeft,
            Modifier::Option => Key::Alt,
            Modifier::Control => Key::ControlLeft,
            Modifier::Function => Key::Function,
        }
    }

    fn rdev_key(target: KeyTarget) -> Key {
        match target {
            KeyTarget::Modifier(modifier) => modifier_key(modifier),
            KeyTarget::Key(code) => Key::Unknown(u32::from(code)),
        }
    }

    fn post_key(event: KeyEvent) -> Result<()> {
        post(&match event {
            KeyEvent::Press(target) => EventType::KeyPress(rdev_key(target)),
            KeyEvent::Release(target) => EventType::KeyRelease(rdev_key(target)),
        })
    }

    fn post(event: &EventType) -> Result<()> {
        trace!(?event, "Posting synthetic event");
        simulate(event).map_err(|_| {
            BridgeError::PermissionDenied(format!("the host rejected synthetic event {event:?}"))
        })?;
        thread::sleep(EVENT_GAP);
        Ok(())
    }

    impl KeyInjector for RdevInjector {
        fn key_down(&self, chord: &KeyChord) -> Result<()> {
            press_chord(chord, post_key)
        }

        fn key_up(&self, chord: &KeyChord) -> Result<()> {
            release_chord(chord, post_key)
        }

        fn scroll(&self, lines: i32) -> Result<()> {
            post(&EventType::Wheel {
                delta_x: 0,
                delta_y: i64::from(lines),
            })
        }

        fn name(&self) -> &'static str {
            "rdev"
        }
    }
}

#[cfg(feature = "inject")]
pub use rdev_impl::RdevInjector;

/// The best injector this build supports.
pub fn default_injector() -> Arc<dyn KeyInjector> {
    #[cfg(feature = "inject")]
    {
        Arc::new(RdevInjector)
    }
    #[cfg(not(feature = "inject"))]
    {
        Arc::new(UnavailableInjector)
    }
}
