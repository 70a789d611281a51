//! Synchronous notification fan-out.
//!
//! Listeners run on the thread that processes raw input, in registration
//! order, before the next packet is read. A slow listener stalls input.

use crossbeam_channel::Sender;
use tracing::debug;

use super::tracker::ChordChange;

/// Receives engine notifications. Both methods default to doing nothing.
pub trait HotkeyListener<A> {
    fn on_chord_changed(&mut self, _change: ChordChange) {}

    fn on_hotkey_triggered(&mut self, _action: &A) {}
}

/// Owned form of a notification, for channel delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent<A> {
    ChordChanged(ChordChange),
    HotkeyTriggered(A),
}

/// Forwards notifications into a channel. With a bounded channel a full
/// queue blocks input processing; a disconnected receiver drops the event.
impl<A: Clone> HotkeyListener<A> for Sender<EngineEvent<A>> {
    fn on_chord_changed(&mut self, change: ChordChange) {
        if self.send(EngineEvent::ChordChanged(change)).is_err() {
            debug!(%change, "event receiver disconnected, chord change dropped");
        }
    }

    fn on_hotkey_triggered(&mut self, action: &A) {
        if self
            .send(EngineEvent::HotkeyTriggered(action.clone()))
            .is_err()
        {
            debug!("event receiver disconnected, hotkey trigger dropped");
        }
    }
}

/// Closure listener for chord changes only.
pub struct ChordChangedFn<F>(pub F);

impl<A, F: FnMut(ChordChange)> HotkeyListener<A> for ChordChangedFn<F> {
    fn on_chord_changed(&mut self, change: ChordChange) {
        (self.0)(change)
    }
}

/// Closure listener for triggers only.
pub struct HotkeyTriggeredFn<F>(pub F);

impl<A, F: FnMut(&A)> HotkeyListener<A> for HotkeyTriggeredFn<F> {
    fn on_hotkey_triggered(&mut self, action: &A) {
        (self.0)(action)
    }
}

/// Handle returned by [`Dispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub struct Dispatcher<A> {
    listeners: Vec<(ListenerId, Box<dyn HotkeyListener<A>>)>,
    next_id: u64,
}

impl<A> Default for Dispatcher<A> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }
}

impl<A> Dispatcher<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Box<dyn HotkeyListener<A>>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn chord_changed(&mut self, change: ChordChange) {
        for (_, listener) in &mut self.listeners {
            listener.on_chord_changed(change);
        }
    }

    pub fn hotkey_triggered(&mut self, action: &A) {
        for (_, listener) in &mut self.listeners {
            listener.on_hotkey_triggered(action);
        }
    }
}
