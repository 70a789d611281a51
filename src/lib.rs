//! Raw input hotkey engine for the Tori soundboard.
//!
//! Decodes Raw Input packets into key and mouse button transitions, keeps
//! the set of held keys, and fires the action bound to a chord the moment
//! the chord is formed by a press.

pub mod chord;
pub mod config;
pub mod engine;
pub mod keys;
pub mod rawinput;

pub use chord::Chord;
pub use config::{AppConfig, HotkeyBinding};
pub use engine::{
    BindingSource, ChordChange, EngineEvent, ExecutionGate, HotkeyEngine, HotkeyListener,
    HotkeyMap, PacketOutcome,
};
pub use keys::{KeyId, MouseButton, ParseKeyError};
pub use rawinput::{DecodeError, InputEvent, Packet, RawInputSource, Transition};
