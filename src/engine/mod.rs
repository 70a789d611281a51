//! Hotkey engine: chord tracking, matching and notification.
//!
//! One [`HotkeyEngine`] is driven by the host's input loop, one raw packet
//! at a time and strictly in arrival order. Each packet is decoded, applied
//! to the held chord, and, if the packet grew the chord with a press, the
//! whole chord is looked up in the bindings. Nothing is queued: listeners
//! run before the call returns.

mod dispatch;
mod matcher;
mod tracker;

#[cfg(test)]
mod tests;

use tracing::{debug, info, trace};

pub use dispatch::{
    ChordChangedFn, Dispatcher, EngineEvent, HotkeyListener, HotkeyTriggeredFn, ListenerId,
};
pub use matcher::{BindingSource, ExecutionGate, HotkeyMap, find_match};
pub use tracker::{ChordChange, ChordTracker, TransitionRecord};

use crate::chord::Chord;
use crate::rawinput::{self, DecodeError, InputEvent, Packet, RawInputSource};

/// Result of processing one packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketOutcome {
    /// Number of chord membership changes.
    pub changes: usize,
    /// A bound hotkey fired.
    pub triggered: bool,
}

pub struct HotkeyEngine<B: BindingSource> {
    tracker: ChordTracker,
    bindings: B,
    gate: ExecutionGate,
    dispatcher: Dispatcher<B::Action>,
}

impl<B: BindingSource> HotkeyEngine<B> {
    pub fn new(bindings: B) -> Self {
        Self::with_gate(bindings, ExecutionGate::default())
    }

    /// Creates an engine sharing an existing execution gate.
    pub fn with_gate(bindings: B, gate: ExecutionGate) -> Self {
        Self {
            tracker: ChordTracker::new(),
            bindings,
            gate,
            dispatcher: Dispatcher::new(),
        }
    }

    /// Reads, decodes and processes the raw input record behind `handle`.
    ///
    /// A malformed record is returned as an error before any state changes;
    /// the caller drops it and carries on with the next notification.
    pub fn handle_raw_input<S: RawInputSource>(
        &mut self,
        source: &mut S,
        handle: S::Handle,
    ) -> Result<PacketOutcome, DecodeError> {
        let packet = rawinput::read_packet(source, handle)?;
        Ok(self.process_packet(&packet))
    }

    /// Processes an already decoded packet.
    pub fn process_packet(&mut self, packet: &Packet) -> PacketOutcome {
        if let Packet::Unrecognized(device_type) = packet {
            trace!(device_type, "ignoring unrecognized raw input device");
            return PacketOutcome::default();
        }
        self.process_events(packet.events())
    }

    /// Applies `events` as one packet: all transitions first, then at most
    /// one match attempt.
    pub fn process_events(&mut self, events: &[InputEvent]) -> PacketOutcome {
        let mut outcome = PacketOutcome::default();
        self.tracker.begin_packet();

        for &event in events {
            if let Some(change) = self.tracker.apply(event) {
                debug!(%change, chord = %self.tracker.chord(), "chord changed");
                outcome.changes += 1;
                self.dispatcher.chord_changed(change);
            }
        }

        if self.tracker.should_match()
            && let Some(action) = find_match(&self.bindings, &self.gate, self.tracker.chord())
        {
            info!(chord = %self.tracker.chord(), "hotkey triggered");
            self.dispatcher.hotkey_triggered(&action);
            outcome.triggered = true;
        }

        outcome
    }

    /// Forgets every held key, notifying `Removed` for each in ascending
    /// order. For hosts that can miss releases (focus loss, device removal).
    pub fn release_all(&mut self) -> usize {
        let released = self.tracker.release_all();
        for &key in &released {
            self.dispatcher.chord_changed(ChordChange::Removed(key));
        }
        released.len()
    }

    #[inline]
    pub fn chord(&self) -> &Chord {
        self.tracker.chord()
    }

    #[inline]
    pub fn has_keys_pressed(&self) -> bool {
        !self.tracker.chord().is_empty()
    }

    #[inline]
    pub fn transition(&self) -> TransitionRecord {
        self.tracker.record()
    }

    /// Handle to the execution gate; clones share its state.
    pub fn gate(&self) -> &ExecutionGate {
        &self.gate
    }

    pub fn hotkeys_enabled(&self) -> bool {
        self.gate.is_enabled()
    }

    pub fn set_hotkeys_enabled(&self, enabled: bool) {
        self.gate.set_enabled(enabled);
    }

    pub fn bindings(&self) -> &B {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut B {
        &mut self.bindings
    }

    pub fn subscribe(&mut self, listener: Box<dyn HotkeyListener<B::Action>>) -> ListenerId {
        self.dispatcher.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    /// Registers a closure for chord changes.
    pub fn on_chord_changed<F>(&mut self, f: F) -> ListenerId
    where
        F: FnMut(ChordChange) + 'static,
    {
        self.subscribe(Box::new(ChordChangedFn(f)))
    }

    /// Registers a closure for triggered hotkeys.
    pub fn on_hotkey_triggered<F>(&mut self, f: F) -> ListenerId
    where
        F: FnMut(&B::Action) + 'static,
    {
        self.subscribe(Box::new(HotkeyTriggeredFn(f)))
    }
}
