//! Hotkey bindings and exact-chord matching.

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;

use crate::chord::Chord;

/// Read access to the chord → action table owned by the application.
///
/// Looked up live on every match attempt, so edits made through a shared
/// handle apply to the next press.
pub trait BindingSource {
    type Action: Clone;

    fn lookup(&self, chord: &Chord) -> Option<Self::Action>;
}

/// Chord → action table. One action per distinct chord.
#[derive(Debug, Clone)]
pub struct HotkeyMap<A> {
    bindings: HashMap<Chord, A>,
}

impl<A> Default for HotkeyMap<A> {
    fn default() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

impl<A> HotkeyMap<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `chord`, returning the action it replaced. An empty chord can be
    /// stored but never matches.
    pub fn insert(&mut self, chord: Chord, action: A) -> Option<A> {
        self.bindings.insert(chord, action)
    }

    pub fn remove(&mut self, chord: &Chord) -> Option<A> {
        self.bindings.remove(chord)
    }

    pub fn get(&self, chord: &Chord) -> Option<&A> {
        self.bindings.get(chord)
    }

    pub fn contains(&self, chord: &Chord) -> bool {
        self.bindings.contains_key(chord)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn iter(&self) -> hash_map::Iter<'_, Chord, A> {
        self.bindings.iter()
    }
}

impl<A> FromIterator<(Chord, A)> for HotkeyMap<A> {
    fn from_iter<I: IntoIterator<Item = (Chord, A)>>(iter: I) -> Self {
        Self {
            bindings: iter.into_iter().collect(),
        }
    }
}

impl<A: Clone> BindingSource for HotkeyMap<A> {
    type Action = A;

    #[inline]
    fn lookup(&self, chord: &Chord) -> Option<A> {
        self.bindings.get(chord).cloned()
    }
}

impl<S: BindingSource + ?Sized> BindingSource for &S {
    type Action = S::Action;

    fn lookup(&self, chord: &Chord) -> Option<S::Action> {
        (**self).lookup(chord)
    }
}

/// Shared with a settings editor on the same thread. A lookup while the
/// editor holds a mutable borrow finds nothing and is logged.
impl<S: BindingSource> BindingSource for Rc<RefCell<S>> {
    type Action = S::Action;

    fn lookup(&self, chord: &Chord) -> Option<S::Action> {
        match self.try_borrow() {
            Ok(bindings) => bindings.lookup(chord),
            Err(_) => {
                warn!(%chord, "bindings are being edited, hotkey skipped");
                None
            }
        }
    }
}

/// Shared with a settings editor on another thread. A panicked editor
/// leaves the table as last written; lookups keep using it.
impl<S: BindingSource> BindingSource for Arc<RwLock<S>> {
    type Action = S::Action;

    fn lookup(&self, chord: &Chord) -> Option<S::Action> {
        let bindings = self.read().unwrap_or_else(|poisoned| {
            warn!("binding table lock poisoned, using last written bindings");
            PoisonError::into_inner(poisoned)
        });
        bindings.lookup(chord)
    }
}

/// Global switch for hotkey execution.
///
/// Cloned handles share one flag, so a UI thread can suspend triggering
/// (for instance while recording a new binding) without touching the engine.
#[derive(Debug, Clone)]
pub struct ExecutionGate(Arc<AtomicBool>);

impl ExecutionGate {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_enabled(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Release);
    }

    /// Flips the gate, returning the previous state.
    #[inline]
    pub fn toggle(&self) -> bool {
        self.0.fetch_xor(true, Ordering::AcqRel)
    }
}

impl Default for ExecutionGate {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Exact lookup of the held chord, honouring the gate.
pub fn find_match<B: BindingSource>(
    bindings: &B,
    gate: &ExecutionGate,
    chord: &Chord,
) -> Option<B::Action> {
    if !gate.is_enabled() || chord.is_empty() {
        return None;
    }
    bindings.lookup(chord)
}
