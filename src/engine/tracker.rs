//! Held-key tracking.

use std::fmt;

use smallvec::SmallVec;

use crate::chord::Chord;
use crate::keys::KeyId;
use crate::rawinput::{InputEvent, Transition};

/// A membership change of the held chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordChange {
    Added(KeyId),
    Removed(KeyId),
}

impl ChordChange {
    pub fn key(&self) -> KeyId {
        match *self {
            ChordChange::Added(key) | ChordChange::Removed(key) => key,
        }
    }
}

impl fmt::Display for ChordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChordChange::Added(key) => write!(f, "+{}", key),
            ChordChange::Removed(key) => write!(f, "-{}", key),
        }
    }
}

/// What the most recent change was, and whether the current packet changed
/// the chord at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionRecord {
    /// `None` until the first change.
    pub last: Option<Transition>,
    /// Set by any change since [`ChordTracker::begin_packet`].
    pub changed: bool,
}

#[derive(Debug, Default)]
pub struct ChordTracker {
    chord: Chord,
    record: TransitionRecord,
}

impl ChordTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn chord(&self) -> &Chord {
        &self.chord
    }

    #[inline]
    pub fn record(&self) -> TransitionRecord {
        self.record
    }

    /// Starts a new packet; the `changed` flag only covers one packet.
    #[inline]
    pub fn begin_packet(&mut self) {
        self.record.changed = false;
    }

    /// Applies one transition. Pressing a held key and releasing an unheld
    /// key leave the chord and the record untouched.
    pub fn apply(&mut self, event: InputEvent) -> Option<ChordChange> {
        let change = match event.transition {
            Transition::Press => self
                .chord
                .insert(event.key)
                .then_some(ChordChange::Added(event.key)),
            Transition::Release => self
                .chord
                .remove(event.key)
                .then_some(ChordChange::Removed(event.key)),
        }?;

        self.record.last = Some(event.transition);
        self.record.changed = true;
        Some(change)
    }

    /// True when the packet just processed grew the chord with a press.
    #[inline]
    pub fn should_match(&self) -> bool {
        self.record.changed
            && self.record.last == Some(Transition::Press)
            && !self.chord.is_empty()
    }

    /// Releases every held key in ascending order.
    pub fn release_all(&mut self) -> SmallVec<[KeyId; 8]> {
        let released: SmallVec<[KeyId; 8]> = self.chord.iter().collect();
        if !released.is_empty() {
            self.chord.clear();
            self.record.last = Some(Transition::Release);
            self.record.changed = true;
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::MouseButton;

    const A: KeyId = KeyId::Key(0x41);

    #[test]
    fn test_press_then_repeat_press() {
        let mut tracker = ChordTracker::new();
        assert_eq!(tracker.apply(InputEvent::press(A)), Some(ChordChange::Added(A)));

        tracker.begin_packet();
        assert_eq!(tracker.apply(InputEvent::press(A)), None);
        assert!(!tracker.record().changed);
        assert_eq!(tracker.chord().len(), 1);
    }

    #[test]
    fn test_release_of_unheld_key_keeps_record() {
        let mut tracker = ChordTracker::new();
        tracker.apply(InputEvent::press(A));
        tracker.begin_packet();

        assert_eq!(tracker.apply(InputEvent::release(MouseButton::Left)), None);
        assert_eq!(
            tracker.record(),
            TransitionRecord {
                last: Some(Transition::Press),
                changed: false,
            }
        );
    }

    #[test]
    fn test_should_match_only_after_press() {
        let mut tracker = ChordTracker::new();
        assert!(!tracker.should_match());

        tracker.apply(InputEvent::press(A));
        assert!(tracker.should_match());

        tracker.begin_packet();
        tracker.apply(InputEvent::release(A));
        assert!(!tracker.should_match());
    }

    #[test]
    fn test_release_all() {
        let mut tracker = ChordTracker::new();
        tracker.apply(InputEvent::press(MouseButton::X1));
        tracker.apply(InputEvent::press(A));

        let released = tracker.release_all();
        assert_eq!(released.as_slice(), &[A, KeyId::Mouse(MouseButton::X1)]);
        assert!(tracker.chord().is_empty());
        assert_eq!(tracker.record().last, Some(Transition::Release));
        assert!(tracker.release_all().is_empty());
    }

    #[test]
    fn test_change_display() {
        assert_eq!(ChordChange::Added(A).to_string(), "+A");
        assert_eq!(ChordChange::Removed(KeyId::Mouse(MouseButton::Right)).to_string(), "-RBUTTON");
    }
}
