//! Multi-tick sessions through the sequencer with a recording dispatcher.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bridge::config::{ConfigModel, KeyChord, parse_config};
use bridge::dispatch::mock::{DispatchCall, RecordingDispatcher};
use bridge::dispatch::{InlineSink, SharedDispatcher};
use bridge::engine::{SuppressReason, TickReport};
use bridge::input::{Button, DeviceId, DeviceSample, InputEvent};
use bridge::runtime::Sequencer;
use tokio::sync::watch;

use crate::common::fixtures::FULL_CONFIG;
use crate::common::init_test_logging;

const CHROME: Option<&str> = Some("com.google.Chrome");
const TERMINAL: Option<&str> = Some("com.apple.Terminal");
const PAD: DeviceId = DeviceId::new(1);
const PAD2: DeviceId = DeviceId::new(2);

struct Session {
    seq: Sequencer,
    recorder: Arc<RecordingDispatcher>,
    _config_tx: watch::Sender<Arc<ConfigModel>>,
    now: Instant,
}

impl Session {
    fn new() -> Self {
        init_test_logging();
        let config = Arc::new(parse_config(FULL_CONFIG.as_bytes()).unwrap());
        let (tx, rx) = watch::channel(config);
        let recorder = Arc::new(RecordingDispatcher::new());
        let dispatcher: SharedDispatcher = recorder.clone();
        let sink = Box::new(InlineSink::new(SharedDispatcher::clone(&dispatcher)));
        Self {
            seq: Sequencer::new(rx, sink, dispatcher, None),
            recorder,
            _config_tx: tx,
            now: Instant::now(),
        }
    }

    fn advance(&mut self, ms: u64) {
        self.now += Duration::from_millis(ms);
    }

    /// One 16ms tick with a single sample for `device`.
    fn press(&mut self, device: DeviceId, buttons: &[Button], app: Option<&str>) -> TickReport {
        self.advance(16);
        let sample = InputEvent::Sample(DeviceSample::pressing(device, buttons));
        self.seq.step(vec![sample], app, self.now)
    }

    fn stick(&mut self, device: DeviceId, y: f32, app: Option<&str>) -> TickReport {
        self.advance(16);
        let sample = InputEvent::Sample(DeviceSample::idle(device).with_stick(y));
        self.seq.step(vec![sample], app, self.now)
    }

    fn calls(&self) -> Vec<DispatchCall> {
        self.recorder.calls()
    }
}

#[test]
fn hold_survives_app_switch_and_releases_in_its_profile() {
    let mut s = Session::new();
    s.press(PAD, &[Button::LeftTrigger], CHROME);
    s.press(PAD, &[Button::LeftTrigger], TERMINAL);
    s.press(PAD, &[], TERMINAL);

    assert_eq!(
        s.calls(),
        vec![
            DispatchCall::BeginHold {
                profile: "browser".to_string(),
                button: Button::LeftTrigger,
                chord: KeyChord::new(55),
            },
            DispatchCall::EndHold {
                profile: "browser".to_string(),
                button: Button::LeftTrigger,
                chord: KeyChord::new(55),
            },
        ]
    );
    assert!(!s.seq.state().is_held(PAD, Button::LeftTrigger));
}

#[test]
fn unknown_app_uses_default_profile() {
    let mut s = Session::new();
    let report = s.press(PAD, &[Button::A], Some("org.example.Unmapped"));
    assert_eq!(report.dispatched, 1);
    assert!(matches!(
        &s.calls()[0],
        DispatchCall::Execute { profile, button: Button::A, .. } if profile == "default"
    ));

    s.press(PAD, &[], None);
    s.advance(500);
    let report = s.press(PAD, &[Button::X], None);
    assert_eq!(report.suppressed_for(SuppressReason::NoMapping), 1);
}

#[test]
fn emergency_toggle_gates_presses_but_not_releases() {
    let mut s = Session::new();
    s.press(PAD, &[Button::LeftTrigger], CHROME);

    let report = s.press(PAD, &[Button::LeftTrigger, Button::Home], CHROME);
    assert_eq!(report.safety_toggles, vec![false]);
    assert!(!s.seq.state().is_enabled());

    // Holding home does not toggle again.
    let report = s.press(PAD, &[Button::LeftTrigger, Button::Home], CHROME);
    assert!(report.safety_toggles.is_empty());

    let report = s.press(PAD, &[Button::X], CHROME);
    assert_eq!(report.suppressed_for(SuppressReason::Disabled), 1);
    assert_eq!(
        s.recorder.count(|c| matches!(c, DispatchCall::EndHold { .. })),
        1,
        "releasing the trigger while disabled still ends the hold"
    );

    s.press(PAD, &[], CHROME);
    let report = s.press(PAD, &[Button::Home], CHROME);
    assert_eq!(report.safety_toggles, vec![true]);
    s.press(PAD, &[], CHROME);
    s.advance(500);
    let report = s.press(PAD, &[Button::X], CHROME);
    assert_eq!(report.dispatched, 1);
}

#[test]
fn debounce_window_applies_per_mapping() {
    let mut s = Session::new();
    assert_eq!(s.press(PAD, &[Button::A], None).dispatched, 1);
    s.press(PAD, &[], None);
    let report = s.press(PAD, &[Button::A], None);
    assert_eq!(report.suppressed_for(SuppressReason::Debounced), 1);

    s.press(PAD, &[], None);
    s.advance(250);
    assert_eq!(s.press(PAD, &[Button::A], None).dispatched, 1);

    // debounceMs 0 lets every press through.
    for _ in 0..3 {
        assert_eq!(s.press(PAD, &[Button::B], None).dispatched, 1);
        s.press(PAD, &[], None);
    }
}

#[test]
fn level_triggered_mapping_repeats_at_debounce_rate() {
    let mut s = Session::new();
    let mut dispatched = 0;
    for _ in 0..10 {
        dispatched += s.press(PAD, &[Button::RightShoulder], CHROME).dispatched;
    }
    // 10 ticks of 16ms span 144ms after the press; a 50ms window lets the
    // press plus two repeats through.
    assert_eq!(dispatched, 3);
}

#[test]
fn edge_triggered_mapping_ignores_repeats() {
    let mut s = Session::new();
    let mut dispatched = 0;
    let mut repeats = 0;
    for _ in 0..5 {
        s.advance(300);
        let report = s.press(PAD, &[Button::X], CHROME);
        dispatched += report.dispatched;
        repeats += report.suppressed_for(SuppressReason::Repeat);
    }
    assert_eq!(dispatched, 1);
    assert_eq!(repeats, 4);
}

#[test]
fn disconnect_drops_device_state_without_releasing() {
    let mut s = Session::new();
    s.press(PAD, &[Button::LeftTrigger], CHROME);
    s.advance(16);
    let sample = DeviceSample::pressing(PAD, &[Button::LeftTrigger]).with_stick(1.0);
    assert_eq!(s.seq.step(vec![InputEvent::Sample(sample)], CHROME, s.now).dispatched, 1);
    assert!(s.seq.state().is_held(PAD, Button::LeftTrigger));
    assert!(s.seq.state().entries_for(PAD) > 0);

    s.advance(16);
    s.seq.step(vec![InputEvent::Disconnected { device: PAD }], CHROME, s.now);

    assert_eq!(s.seq.state().entries_for(PAD), 0);
    assert_eq!(s.recorder.count(|c| matches!(c, DispatchCall::EndHold { .. })), 0);
    assert!(s.seq.state().connected_devices().is_empty());
}

#[test]
fn stick_scrolls_only_in_profiles_with_analog() {
    let mut s = Session::new();
    assert_eq!(s.stick(PAD, 1.0, None).dispatched, 0, "default profile has no analog config");

    s.advance(100);
    assert_eq!(s.stick(PAD, 1.0, CHROME).dispatched, 1);
    // 16ms later is inside the 40ms interval.
    assert_eq!(s.stick(PAD, 1.0, CHROME).dispatched, 0);
    s.advance(40);
    assert_eq!(s.stick(PAD, -1.0, CHROME).dispatched, 1);
    // Inside the deadzone.
    s.advance(100);
    assert_eq!(s.stick(PAD, 0.1, CHROME).dispatched, 0);

    let scrolls: Vec<i32> = s
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            DispatchCall::Scroll { lines, .. } => Some(lines),
            _ => None,
        })
        .collect();
    assert_eq!(scrolls, vec![8, -8]);
}

#[test]
fn devices_hold_independently() {
    let mut s = Session::new();
    s.advance(16);
    s.seq.step(
        vec![
            InputEvent::Sample(DeviceSample::pressing(PAD, &[Button::LeftTrigger])),
            InputEvent::Sample(DeviceSample::pressing(PAD2, &[Button::LeftTrigger])),
        ],
        CHROME,
        s.now,
    );
    assert!(s.seq.state().is_held(PAD, Button::LeftTrigger));
    assert!(s.seq.state().is_held(PAD2, Button::LeftTrigger));

    s.press(PAD, &[], CHROME);
    assert!(!s.seq.state().is_held(PAD, Button::LeftTrigger));
    assert!(s.seq.state().is_held(PAD2, Button::LeftTrigger));

    let summary = s.seq.finish();
    assert_eq!(summary.released_at_shutdown, 1);
    assert_eq!(s.recorder.count(|c| matches!(c, DispatchCall::EndHold { .. })), 2);
}
