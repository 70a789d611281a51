//! Unit tests for the hotkey engine.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use super::*;
use crate::keys::{KeyId, MouseButton};
use crate::rawinput::{
    RI_KEY_BREAK, RI_MOUSE_BUTTON_1_DOWN, RI_MOUSE_BUTTON_2_UP, Transition, WM_KEYDOWN, builder,
};

const A: u16 = 0x41;
const B: u16 = 0x42;
const C: u16 = 0x43;

/// Feeds queued byte images through the two-call size/fetch protocol.
#[derive(Default)]
struct QueueSource {
    packets: VecDeque<Vec<u8>>,
}

impl QueueSource {
    fn push(&mut self, packet: Vec<u8>) -> &mut Self {
        self.packets.push_back(packet);
        self
    }
}

impl RawInputSource for QueueSource {
    type Handle = ();

    fn required_size(&mut self, _: ()) -> io::Result<usize> {
        self.packets
            .front()
            .map(Vec::len)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no packet queued"))
    }

    fn fetch(&mut self, _: (), buf: &mut [u8]) -> io::Result<usize> {
        let packet = self
            .packets
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no packet queued"))?;
        buf.copy_from_slice(&packet);
        Ok(packet.len())
    }
}

type Log = Rc<RefCell<Vec<String>>>;

/// Engine with `keys` bound to "hit" and a listener logging everything.
fn engine_with(keys: &str) -> (HotkeyEngine<HotkeyMap<&'static str>>, Log) {
    let mut bindings = HotkeyMap::new();
    bindings.insert(keys.parse().unwrap(), "hit");
    let mut engine = HotkeyEngine::new(bindings);

    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let changes = log.clone();
    engine.on_chord_changed(move |change| changes.borrow_mut().push(change.to_string()));
    let triggers = log.clone();
    engine.on_hotkey_triggered(move |action| {
        triggers.borrow_mut().push(format!("fire {}", action))
    });
    (engine, log)
}

fn feed(engine: &mut HotkeyEngine<HotkeyMap<&'static str>>, packet: Vec<u8>) -> PacketOutcome {
    let mut source = QueueSource::default();
    source.push(packet);
    engine.handle_raw_input(&mut source, ()).unwrap()
}

fn fires(log: &Log) -> usize {
    log.borrow().iter().filter(|l| l.starts_with("fire")).count()
}

#[test]
fn test_idempotent_press() {
    let (mut engine, log) = engine_with("F1");

    feed(&mut engine, builder::key_down(A));
    let repeat = feed(&mut engine, builder::key_down(A));

    assert_eq!(repeat, PacketOutcome::default());
    assert_eq!(engine.chord(), &Chord::from([KeyId::Key(0x41)]));
    assert_eq!(*log.borrow(), vec!["+A"]);
}

#[test]
fn test_balanced_press_release() {
    let (mut engine, log) = engine_with("F1");
    let before = *engine.chord();

    feed(&mut engine, builder::key_down(A));
    feed(&mut engine, builder::key_up(A));

    assert_eq!(*engine.chord(), before);
    assert!(!engine.has_keys_pressed());
    assert_eq!(*log.borrow(), vec!["+A", "-A"]);
}

#[test]
fn test_double_release_is_noop() {
    let (mut engine, log) = engine_with("F1");
    let outcome = feed(&mut engine, builder::key_up(A));
    assert_eq!(outcome.changes, 0);
    assert!(log.borrow().is_empty());
    assert_eq!(engine.transition().last, None);
}

#[test]
fn test_no_fire_on_release() {
    let (mut engine, log) = engine_with("A+B");

    assert!(!feed(&mut engine, builder::key_down(A)).triggered);
    assert!(feed(&mut engine, builder::key_down(B)).triggered);
    assert!(!feed(&mut engine, builder::key_up(B)).triggered);

    assert_eq!(fires(&log), 1);
    assert_eq!(*log.borrow(), vec!["+A", "+B", "fire hit", "-B"]);
}

#[test]
fn test_key_repeat_does_not_refire() {
    let (mut engine, log) = engine_with("A+B");
    feed(&mut engine, builder::key_down(A));
    feed(&mut engine, builder::key_down(B));
    // typematic repeat of the held key
    feed(&mut engine, builder::key_down(B));
    feed(&mut engine, builder::key_down(B));
    assert_eq!(fires(&log), 1);
}

#[test]
fn test_multi_button_packet() {
    let (mut engine, log) = engine_with("LBUTTON");

    feed(&mut engine, builder::mouse(0x0004)); // button 2 down
    assert_eq!(*log.borrow(), vec!["+RBUTTON"]);

    let outcome = feed(
        &mut engine,
        builder::mouse(RI_MOUSE_BUTTON_1_DOWN | RI_MOUSE_BUTTON_2_UP),
    );

    assert_eq!(outcome.changes, 2);
    assert_eq!(*log.borrow(), vec!["+RBUTTON", "+LBUTTON", "-RBUTTON"]);
    assert_eq!(engine.chord(), &Chord::from([KeyId::Mouse(MouseButton::Left)]));
    // the packet ended on a release
    assert!(!outcome.triggered);
    assert_eq!(engine.transition().last, Some(Transition::Release));
}

#[test]
fn test_mouse_and_keyboard_chord() {
    let (mut engine, log) = engine_with("LCTRL+XBUTTON1");

    feed(&mut engine, builder::keyboard(0x11, 0x1D, 0, WM_KEYDOWN));
    let outcome = feed(&mut engine, builder::mouse(0x0040));

    assert!(outcome.triggered);
    assert_eq!(*log.borrow(), vec!["+LCTRL", "+XBUTTON1", "fire hit"]);
}

#[test]
fn test_exact_match_only() {
    let (mut engine, log) = engine_with("A+B");

    feed(&mut engine, builder::key_down(A));
    feed(&mut engine, builder::key_down(C));
    assert!(!feed(&mut engine, builder::key_down(B)).triggered);

    // back to exactly {A, B} through a release: still no trigger
    assert!(!feed(&mut engine, builder::key_up(C)).triggered);
    assert_eq!(fires(&log), 0);

    // a fresh qualifying press forms the chord again
    feed(&mut engine, builder::key_up(B));
    assert!(feed(&mut engine, builder::key_down(B)).triggered);
    assert_eq!(fires(&log), 1);
}

#[test]
fn test_gate_suppression() {
    let (mut engine, log) = engine_with("A+B");
    engine.set_hotkeys_enabled(false);

    feed(&mut engine, builder::key_down(A));
    feed(&mut engine, builder::key_down(B));
    assert_eq!(*log.borrow(), vec!["+A", "+B"]);

    feed(&mut engine, builder::key_up(B));
    engine.set_hotkeys_enabled(true);
    assert!(feed(&mut engine, builder::key_down(B)).triggered);
    assert_eq!(fires(&log), 1);
}

#[test]
fn test_gate_shared_with_ui_handle() {
    let (mut engine, log) = engine_with("A");
    let ui_gate = engine.gate().clone();

    ui_gate.set_enabled(false);
    feed(&mut engine, builder::key_down(A));
    assert_eq!(fires(&log), 0);
    assert!(!engine.hotkeys_enabled());
}

#[test]
fn test_malformed_packet_leaves_state() {
    let (mut engine, log) = engine_with("A+B");
    feed(&mut engine, builder::key_down(A));
    let chord_before = *engine.chord();
    let record_before = engine.transition();

    let mut source = QueueSource::default();
    source.push(builder::keyboard(B, 0x30, RI_KEY_BREAK, WM_KEYDOWN));
    let result = engine.handle_raw_input(&mut source, ());

    assert!(matches!(
        result,
        Err(DecodeError::InconsistentKeyboardFlags { .. })
    ));
    assert_eq!(*engine.chord(), chord_before);
    assert_eq!(engine.transition(), record_before);
    assert_eq!(*log.borrow(), vec!["+A"]);

    // the next packet is processed normally
    assert!(feed(&mut engine, builder::key_down(B)).triggered);
}

#[test]
fn test_accessor_failure_is_decode_error() {
    let (mut engine, _) = engine_with("A");
    let mut empty = QueueSource::default();
    assert!(matches!(
        engine.handle_raw_input(&mut empty, ()),
        Err(DecodeError::Accessor(_))
    ));
}

#[test]
fn test_unrecognized_device_is_ignored() {
    let (mut engine, log) = engine_with("A");
    feed(&mut engine, builder::key_down(A));
    let record = engine.transition();

    let outcome = feed(&mut engine, builder::hid(&[0x01, 0x00, 0x7F]));

    assert_eq!(outcome, PacketOutcome::default());
    assert_eq!(engine.transition(), record);
    assert_eq!(fires(&log), 1);
}

#[test]
fn test_release_all_notifies_and_resets() {
    let (mut engine, log) = engine_with("A+B");
    feed(&mut engine, builder::key_down(B));
    feed(&mut engine, builder::key_down(A));
    log.borrow_mut().clear();

    assert_eq!(engine.release_all(), 2);
    assert_eq!(*log.borrow(), vec!["-A", "-B"]);
    assert!(!engine.has_keys_pressed());
    assert_eq!(engine.release_all(), 0);
}

#[test]
fn test_live_binding_edits() {
    let shared = Rc::new(RefCell::new(HotkeyMap::<u32>::new()));
    let mut engine = HotkeyEngine::new(shared.clone());
    let fired = Rc::new(RefCell::new(Vec::new()));
    let sink = fired.clone();
    engine.on_hotkey_triggered(move |id| sink.borrow_mut().push(*id));

    engine.process_events(&[InputEvent::press(KeyId::Key(0x70))]);
    shared.borrow_mut().insert("F1".parse().unwrap(), 42);
    engine.process_events(&[InputEvent::release(KeyId::Key(0x70))]);
    engine.process_events(&[InputEvent::press(KeyId::Key(0x70))]);

    assert_eq!(*fired.borrow(), vec![42]);
}

#[test]
fn test_unsubscribed_listener_is_silent() {
    let mut engine = HotkeyEngine::new(HotkeyMap::<u8>::new());
    let count = Rc::new(RefCell::new(0));
    let counter = count.clone();
    let id = engine.on_chord_changed(move |_| *counter.borrow_mut() += 1);

    engine.process_events(&[InputEvent::press(KeyId::Key(0x41))]);
    assert!(engine.unsubscribe(id));
    engine.process_events(&[InputEvent::release(KeyId::Key(0x41))]);

    assert_eq!(*count.borrow(), 1);
}
