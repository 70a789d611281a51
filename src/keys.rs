//! Key identifiers shared by keyboard keys and mouse buttons.
//!
//! Keyboard keys are identified by their Windows virtual-key code, mouse
//! buttons by a fixed enumeration. Both live in one dense index space so a
//! chord can hold any mix of them in a fixed-size bitset.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Number of slots reserved for keyboard virtual-key codes.
pub const KEYBOARD_SLOTS: usize = 256;
/// Total number of distinct key identifiers.
pub const KEY_ID_COUNT: usize = KEYBOARD_SLOTS + MouseButton::ALL.len();

/// Mouse button types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl MouseButton {
    /// All buttons in raw input button order (button 1 through button 5).
    pub const ALL: [MouseButton; 5] = [
        MouseButton::Left,
        MouseButton::Right,
        MouseButton::Middle,
        MouseButton::X1,
        MouseButton::X2,
    ];

    /// Zero-based raw input button index.
    #[inline(always)]
    pub const fn index(self) -> usize {
        match self {
            MouseButton::Left => 0,
            MouseButton::Right => 1,
            MouseButton::Middle => 2,
            MouseButton::X1 => 3,
            MouseButton::X2 => 4,
        }
    }

    /// Virtual-key code Windows assigns to the button.
    pub const fn vk(self) -> u8 {
        match self {
            MouseButton::Left => 0x01,
            MouseButton::Right => 0x02,
            MouseButton::Middle => 0x04,
            MouseButton::X1 => 0x05,
            MouseButton::X2 => 0x06,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            MouseButton::Left => "LBUTTON",
            MouseButton::Right => "RBUTTON",
            MouseButton::Middle => "MBUTTON",
            MouseButton::X1 => "XBUTTON1",
            MouseButton::X2 => "XBUTTON2",
        }
    }
}

/// A single key or mouse button that can take part in a chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyId {
    /// Keyboard key by virtual-key code
    Key(u8),
    /// Mouse button
    Mouse(MouseButton),
}

impl KeyId {
    /// Canonical identifier for a virtual-key code.
    ///
    /// The mouse button codes (`VK_LBUTTON`, `VK_XBUTTON2`, ...) map to
    /// [`KeyId::Mouse`] so each physical input has exactly one identifier.
    pub fn from_vk(vk: u8) -> Self {
        match mouse_button_from_vk(vk) {
            Some(button) => KeyId::Mouse(button),
            None => KeyId::Key(vk),
        }
    }

    /// Dense index in `0..KEY_ID_COUNT`.
    ///
    /// `KeyId::Key` with a mouse button code shares the slot of the
    /// matching [`KeyId::Mouse`].
    #[inline(always)]
    pub const fn index(self) -> usize {
        match self {
            KeyId::Key(vk) => match mouse_button_from_vk(vk) {
                Some(button) => KEYBOARD_SLOTS + button.index(),
                None => vk as usize,
            },
            KeyId::Mouse(button) => KEYBOARD_SLOTS + button.index(),
        }
    }

    /// Inverse of [`KeyId::index`]. Keyboard slots of mouse button codes
    /// are never used and yield `None`.
    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        if index < KEYBOARD_SLOTS {
            let vk = index as u8;
            mouse_button_from_vk(vk).is_none().then_some(KeyId::Key(vk))
        } else {
            MouseButton::ALL
                .get(index - KEYBOARD_SLOTS)
                .map(|&b| KeyId::Mouse(b))
        }
    }
}

impl From<MouseButton> for KeyId {
    fn from(button: MouseButton) -> Self {
        KeyId::Mouse(button)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyId::Key(vk) => write!(f, "{}", vk_to_key_name(*vk)),
            KeyId::Mouse(button) => f.write_str(button.name()),
        }
    }
}

/// Failure to parse a key name or chord string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseKeyError {
    #[error("empty key name")]
    Empty,
    #[error("unknown key name `{0}`")]
    Unknown(String),
    /// Raw input always reports which side a modifier is on, so a chord
    /// naming the generic key could never be held.
    #[error("`{name}` is ambiguous, use `{left}` or `{right}`")]
    AmbiguousModifier {
        name: String,
        left: &'static str,
        right: &'static str,
    },
}

const fn mouse_button_from_vk(vk: u8) -> Option<MouseButton> {
    match vk {
        0x01 => Some(MouseButton::Left),
        0x02 => Some(MouseButton::Right),
        0x04 => Some(MouseButton::Middle),
        0x05 => Some(MouseButton::X1),
        0x06 => Some(MouseButton::X2),
        _ => None,
    }
}

/// Left and right names for a generic modifier code.
fn sided_names(vk: u8) -> Option<(&'static str, &'static str)> {
    match vk {
        0x10 => Some(("LSHIFT", "RSHIFT")),
        0x11 => Some(("LCTRL", "RCTRL")),
        0x12 => Some(("LALT", "RALT")),
        _ => None,
    }
}

impl FromStr for KeyId {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_uppercase();
        if name.is_empty() {
            return Err(ParseKeyError::Empty);
        }
        if let Some(button) = mouse_button_name_to_type(&name) {
            return Ok(KeyId::Mouse(button));
        }
        let vk = key_name_to_vk(&name)
            .ok_or_else(|| ParseKeyError::Unknown(s.trim().to_string()))?;
        if let Some((left, right)) = sided_names(vk) {
            return Err(ParseKeyError::AmbiguousModifier {
                name: s.trim().to_string(),
                left,
                right,
            });
        }
        Ok(KeyId::from_vk(vk))
    }
}

/// Converts virtual key code to key name string.
pub fn vk_to_key_name(vk: u8) -> String {
    match vk {
        // A-Z, 0-9
        0x41..=0x5A | 0x30..=0x39 => char::from(vk).to_string(),
        0x60..=0x69 => format!("NUMPAD{}", vk - 0x60),
        0x70..=0x87 => format!("F{}", vk - 0x70 + 1),
        0x20 => "SPACE".to_string(),
        0x0D => "RETURN".to_string(),
        0x09 => "TAB".to_string(),
        0x1B => "ESCAPE".to_string(),
        0x08 => "BACK".to_string(),
        0x2E => "DELETE".to_string(),
        0x2D => "INSERT".to_string(),
        0x24 => "HOME".to_string(),
        0x23 => "END".to_string(),
        0x21 => "PAGEUP".to_string(),
        0x22 => "PAGEDOWN".to_string(),
        0x26 => "UP".to_string(),
        0x28 => "DOWN".to_string(),
        0x25 => "LEFT".to_string(),
        0x27 => "RIGHT".to_string(),
        0x14 => "CAPITAL".to_string(),
        0x90 => "NUMLOCK".to_string(),
        0x91 => "SCROLL".to_string(),
        0x13 => "PAUSE".to_string(),
        0x2C => "SNAPSHOT".to_string(),
        0x6A => "MULTIPLY".to_string(),
        0x6B => "ADD".to_string(),
        0x6C => "SEPARATOR".to_string(),
        0x6D => "SUBTRACT".to_string(),
        0x6E => "DECIMAL".to_string(),
        0x6F => "DIVIDE".to_string(),
        0xBA => "OEM_1".to_string(),
        0xBB => "OEM_PLUS".to_string(),
        0xBC => "OEM_COMMA".to_string(),
        0xBD => "OEM_MINUS".to_string(),
        0xBE => "OEM_PERIOD".to_string(),
        0xBF => "OEM_2".to_string(),
        0xC0 => "OEM_3".to_string(),
        0xDB => "OEM_4".to_string(),
        0xDC => "OEM_5".to_string(),
        0xDD => "OEM_6".to_string(),
        0xDE => "OEM_7".to_string(),
        0xDF => "OEM_8".to_string(),
        0xE2 => "OEM_102".to_string(),
        0x10 => "SHIFT".to_string(),
        0x11 => "CTRL".to_string(),
        0x12 => "ALT".to_string(),
        0xA0 => "LSHIFT".to_string(),
        0xA1 => "RSHIFT".to_string(),
        0xA2 => "LCTRL".to_string(),
        0xA3 => "RCTRL".to_string(),
        0xA4 => "LALT".to_string(),
        0xA5 => "RALT".to_string(),
        0x5B => "LWIN".to_string(),
        0x5C => "RWIN".to_string(),
        0x5D => "APPS".to_string(),
        0xAD => "VOLUME_MUTE".to_string(),
        0xAE => "VOLUME_DOWN".to_string(),
        0xAF => "VOLUME_UP".to_string(),
        0xB0 => "MEDIA_NEXT".to_string(),
        0xB1 => "MEDIA_PREV".to_string(),
        0xB2 => "MEDIA_STOP".to_string(),
        0xB3 => "MEDIA_PLAY_PAUSE".to_string(),
        _ => format!("VK_{:02X}", vk),
    }
}

/// Parses an upper-case key name into a virtual-key code.
pub fn key_name_to_vk(key: &str) -> Option<u8> {
    if key.len() == 1
        && let Some(c) = key.chars().next()
        && (c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Some(c as u8);
    }

    // F1-F24
    if let Some(num) = key.strip_prefix('F')
        && let Ok(num) = num.parse::<u8>()
        && (1..=24).contains(&num)
    {
        return Some(0x70 + num - 1);
    }

    if let Some(num) = key.strip_prefix("NUMPAD")
        && let Ok(num) = num.parse::<u8>()
        && num <= 9
    {
        return Some(0x60 + num);
    }

    // Hex fallback produced by `vk_to_key_name`
    if let Some(hex) = key.strip_prefix("VK_")
        && let Ok(vk) = u8::from_str_radix(hex, 16)
        && vk != 0
        && vk != 0xFF
    {
        return Some(vk);
    }

    match key {
        "ESC" | "ESCAPE" => Some(0x1B),
        "ENTER" | "RETURN" => Some(0x0D),
        "TAB" => Some(0x09),
        "CLEAR" => Some(0x0C),
        "SHIFT" => Some(0x10),
        "CTRL" | "CONTROL" => Some(0x11),
        "ALT" | "MENU" => Some(0x12),
        "PAUSE" => Some(0x13),
        "CAPSLOCK" | "CAPITAL" => Some(0x14),
        "SPACE" => Some(0x20),
        "BACKSPACE" | "BACK" => Some(0x08),
        "DELETE" | "DEL" => Some(0x2E),
        "INSERT" | "INS" => Some(0x2D),
        "HOME" => Some(0x24),
        "END" => Some(0x23),
        "PAGEUP" | "PGUP" => Some(0x21),
        "PAGEDOWN" | "PGDN" => Some(0x22),
        "UP" => Some(0x26),
        "DOWN" => Some(0x28),
        "LEFT" => Some(0x25),
        "RIGHT" => Some(0x27),
        "LSHIFT" => Some(0xA0),
        "RSHIFT" => Some(0xA1),
        "LCTRL" | "LCONTROL" => Some(0xA2),
        "RCTRL" | "RCONTROL" => Some(0xA3),
        "LALT" | "LMENU" => Some(0xA4),
        "RALT" | "RMENU" => Some(0xA5),
        "LWIN" => Some(0x5B),
        "RWIN" => Some(0x5C),
        "APPS" => Some(0x5D),
        "NUMLOCK" => Some(0x90),
        "SCROLL" | "SCROLLLOCK" => Some(0x91),
        "SNAPSHOT" | "PRINTSCREEN" => Some(0x2C),
        "MULTIPLY" => Some(0x6A),
        "ADD" => Some(0x6B),
        "SEPARATOR" => Some(0x6C),
        "SUBTRACT" => Some(0x6D),
        "DECIMAL" => Some(0x6E),
        "DIVIDE" => Some(0x6F),
        "OEM_1" => Some(0xBA),
        "OEM_PLUS" => Some(0xBB),
        "OEM_COMMA" => Some(0xBC),
        "OEM_MINUS" => Some(0xBD),
        "OEM_PERIOD" => Some(0xBE),
        "OEM_2" => Some(0xBF),
        "OEM_3" => Some(0xC0),
        "OEM_4" => Some(0xDB),
        "OEM_5" => Some(0xDC),
        "OEM_6" => Some(0xDD),
        "OEM_7" => Some(0xDE),
        "OEM_8" => Some(0xDF),
        "OEM_102" => Some(0xE2),
        "VOLUME_MUTE" => Some(0xAD),
        "VOLUME_DOWN" => Some(0xAE),
        "VOLUME_UP" => Some(0xAF),
        "MEDIA_NEXT" => Some(0xB0),
        "MEDIA_PREV" => Some(0xB1),
        "MEDIA_STOP" => Some(0xB2),
        "MEDIA_PLAY_PAUSE" => Some(0xB3),
        _ => None,
    }
}

pub fn mouse_button_name_to_type(name: &str) -> Option<MouseButton> {
    match name {
        "LBUTTON" | "LMOUSE" | "LEFTMOUSE" | "LEFTBUTTON" | "LMB" => Some(MouseButton::Left),
        "RBUTTON" | "RMOUSE" | "RIGHTMOUSE" | "RIGHTBUTTON" | "RMB" => Some(MouseButton::Right),
        "MBUTTON" | "MMOUSE" | "MIDDLEMOUSE" | "MIDDLEBUTTON" | "MMB" => {
            Some(MouseButton::Middle)
        }
        "XBUTTON1" | "X1BUTTON" | "X1" | "MB4" => Some(MouseButton::X1),
        "XBUTTON2" | "X2BUTTON" | "X2" | "MB5" => Some(MouseButton::X2),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_name_to_vk_letters_and_digits() {
        assert_eq!(key_name_to_vk("A"), Some(0x41));
        assert_eq!(key_name_to_vk("Z"), Some(0x5A));
        assert_eq!(key_name_to_vk("0"), Some(0x30));
        assert_eq!(key_name_to_vk("9"), Some(0x39));
    }

    #[test]
    fn test_key_name_to_vk_function_keys() {
        assert_eq!(key_name_to_vk("F1"), Some(0x70));
        assert_eq!(key_name_to_vk("F12"), Some(0x7B));
        assert_eq!(key_name_to_vk("F24"), Some(0x87));
        assert_eq!(key_name_to_vk("F25"), None);
        assert_eq!(key_name_to_vk("F0"), None);
    }

    #[test]
    fn test_key_name_to_vk_hex_fallback() {
        assert_eq!(key_name_to_vk("VK_E8"), Some(0xE8));
        assert_eq!(key_name_to_vk("VK_00"), None);
        assert_eq!(key_name_to_vk("VK_FF"), None);
        assert_eq!(key_name_to_vk("VK_ZZ"), None);
    }

    #[test]
    fn test_key_name_round_trip_for_named_keys() {
        for vk in [0x41u8, 0x70, 0x60, 0xA2, 0xA5, 0x20, 0xBA, 0xE8] {
            let name = vk_to_key_name(vk);
            assert_eq!(key_name_to_vk(&name), Some(vk), "name {}", name);
        }
    }

    #[test]
    fn test_key_id_parse_case_insensitive() {
        assert_eq!("lctrl".parse::<KeyId>(), Ok(KeyId::Key(0xA2)));
        assert_eq!(" f5 ".parse::<KeyId>(), Ok(KeyId::Key(0x74)));
        assert_eq!("mb4".parse::<KeyId>(), Ok(KeyId::Mouse(MouseButton::X1)));
    }

    #[test]
    fn test_key_id_parse_errors() {
        assert_eq!("".parse::<KeyId>(), Err(ParseKeyError::Empty));
        assert_eq!(
            "ABC".parse::<KeyId>(),
            Err(ParseKeyError::Unknown("ABC".to_string()))
        );
    }

    #[test]
    fn test_from_vk_maps_mouse_codes() {
        assert_eq!(KeyId::from_vk(0x01), KeyId::Mouse(MouseButton::Left));
        assert_eq!(KeyId::from_vk(0x06), KeyId::Mouse(MouseButton::X2));
        assert_eq!(KeyId::from_vk(0x03), KeyId::Key(0x03));
        assert_eq!(KeyId::from_vk(0x41), KeyId::Key(0x41));
    }

    #[test]
    fn test_index_round_trip() {
        for index in 0..KEY_ID_COUNT {
            if let Some(key) = KeyId::from_index(index) {
                assert_eq!(key.index(), index);
            }
        }
        assert_eq!(KeyId::from_index(KEY_ID_COUNT), None);
        assert_eq!(KeyId::from_index(0x01), None);
        assert_eq!(KeyId::from_index(0x03), Some(KeyId::Key(0x03)));
    }

    #[test]
    fn test_mouse_vk_shares_mouse_slot() {
        assert_eq!(
            KeyId::Key(0x01).index(),
            KeyId::Mouse(MouseButton::Left).index()
        );
        assert_eq!(KeyId::Key(0x06).index(), KeyId::Mouse(MouseButton::X2).index());
        assert_ne!(
            KeyId::Key(0x03).index(),
            KeyId::Mouse(MouseButton::Middle).index()
        );
    }

    #[test]
    fn test_generic_modifiers_rejected() {
        for (name, left, right) in [
            ("CTRL", "LCTRL", "RCTRL"),
            ("control", "LCTRL", "RCTRL"),
            ("SHIFT", "LSHIFT", "RSHIFT"),
            ("MENU", "LALT", "RALT"),
            ("VK_12", "LALT", "RALT"),
        ] {
            assert_eq!(
                name.parse::<KeyId>(),
                Err(ParseKeyError::AmbiguousModifier {
                    name: name.to_string(),
                    left,
                    right,
                })
            );
        }
        assert_eq!("RALT".parse::<KeyId>(), Ok(KeyId::Key(0xA5)));
    }

    #[test]
    fn test_display() {
        assert_eq!(KeyId::Key(0x41).to_string(), "A");
        assert_eq!(KeyId::Key(0x7B).to_string(), "F12");
        assert_eq!(KeyId::Mouse(MouseButton::Middle).to_string(), "MBUTTON");
        assert_eq!(KeyId::Key(0xE8).to_string(), "VK_E8");
    }
}
