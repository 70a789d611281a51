//! Raw Input packet decoding.
//!
//! Interprets the byte image of a Win32 `RAWINPUT` record without casting
//! the buffer to the native structure. Every field read is bounds-checked
//! against the buffer, and the size the header reports must match the bytes
//! actually delivered.
//!
//! ## Record layout
//!
//! | part     | field            | offset             |
//! |----------|------------------|--------------------|
//! | header   | `dwType`         | 0                  |
//! | header   | `dwSize`         | 4                  |
//! | header   | `hDevice`        | 8                  |
//! | header   | `wParam`         | 8 + ptr            |
//! | keyboard | `Flags`          | header + 2         |
//! | keyboard | `VKey`           | header + 6         |
//! | keyboard | `Message`        | header + 8         |
//! | mouse    | `usButtonFlags`  | header + 4         |
//!
//! The platform accessor that fills the buffer lives behind the
//! [`RawInputSource`] trait so the decoder can be driven from tests.

use smallvec::SmallVec;
use std::io;
use thiserror::Error;

use crate::keys::{KeyId, MouseButton};

#[cfg(windows)]
pub mod win32;

/// Size of `RAWINPUTHEADER` for the target pointer width.
pub const HEADER_SIZE: usize = 8 + 2 * std::mem::size_of::<usize>();
/// Size of `RAWKEYBOARD`.
pub const KEYBOARD_PAYLOAD_SIZE: usize = 16;
/// Size of `RAWMOUSE`.
pub const MOUSE_PAYLOAD_SIZE: usize = 24;

/// Packets up to this size are read without a heap allocation.
const INLINE_PACKET_SIZE: usize = 64;

pub const RIM_TYPEMOUSE: u32 = 0;
pub const RIM_TYPEKEYBOARD: u32 = 1;
pub const RIM_TYPEHID: u32 = 2;

pub const RI_KEY_BREAK: u16 = 0x01;
pub const RI_KEY_E0: u16 = 0x02;
pub const RI_KEY_E1: u16 = 0x04;
pub const RI_KEY_TERMSRV_SET_LED: u16 = 0x08;
pub const RI_KEY_TERMSRV_SHADOW: u16 = 0x10;
const RI_KEY_KNOWN_FLAGS: u16 =
    RI_KEY_BREAK | RI_KEY_E0 | RI_KEY_E1 | RI_KEY_TERMSRV_SET_LED | RI_KEY_TERMSRV_SHADOW;

pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_KEYUP: u32 = 0x0101;
pub const WM_SYSKEYDOWN: u32 = 0x0104;
pub const WM_SYSKEYUP: u32 = 0x0105;

/// Down flag of mouse button 1; button `n` uses `0x1 << (2 * n)` for down
/// and the next bit up for release.
pub const RI_MOUSE_BUTTON_1_DOWN: u16 = 0x0001;
pub const RI_MOUSE_BUTTON_1_UP: u16 = 0x0002;
pub const RI_MOUSE_BUTTON_2_DOWN: u16 = 0x0004;
pub const RI_MOUSE_BUTTON_2_UP: u16 = 0x0008;
pub const RI_MOUSE_BUTTON_3_DOWN: u16 = 0x0010;
pub const RI_MOUSE_BUTTON_3_UP: u16 = 0x0020;
pub const RI_MOUSE_BUTTON_4_DOWN: u16 = 0x0040;
pub const RI_MOUSE_BUTTON_4_UP: u16 = 0x0080;
pub const RI_MOUSE_BUTTON_5_DOWN: u16 = 0x0100;
pub const RI_MOUSE_BUTTON_5_UP: u16 = 0x0200;

const VK_SHIFT: u8 = 0x10;
const VK_CONTROL: u8 = 0x11;
const VK_MENU: u8 = 0x12;
const VK_LSHIFT: u8 = 0xA0;
const VK_RSHIFT: u8 = 0xA1;
const VK_LCONTROL: u8 = 0xA2;
const VK_RCONTROL: u8 = 0xA3;
const VK_LMENU: u8 = 0xA4;
const VK_RMENU: u8 = 0xA5;
/// Scan code of the right shift key.
const SCANCODE_RSHIFT: u16 = 0x36;

/// Press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Press,
    Release,
}

/// A normalized key or button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputEvent {
    pub key: KeyId,
    pub transition: Transition,
}

impl InputEvent {
    pub fn press(key: impl Into<KeyId>) -> Self {
        Self {
            key: key.into(),
            transition: Transition::Press,
        }
    }

    pub fn release(key: impl Into<KeyId>) -> Self {
        Self {
            key: key.into(),
            transition: Transition::Release,
        }
    }
}

/// Events carried by one mouse packet (at most two per button).
pub type MouseEvents = SmallVec<[InputEvent; 4]>;

/// A decoded Raw Input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Keyboard(InputEvent),
    /// Button transitions in ascending button order; empty for pure motion
    /// or wheel packets.
    Mouse(MouseEvents),
    /// HID devices and keyboard filler codes. Not an error.
    Unrecognized(u32),
}

impl Packet {
    /// The transitions this packet carries, in application order.
    pub fn events(&self) -> &[InputEvent] {
        match self {
            Packet::Keyboard(event) => std::slice::from_ref(event),
            Packet::Mouse(events) => events,
            Packet::Unrecognized(_) => &[],
        }
    }
}

/// A raw packet that violates the platform's record contract.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("raw input record of {len} bytes is shorter than its header")]
    TooShort { len: usize },
    #[error("raw input size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("unknown raw input device type {0}")]
    UnknownDeviceType(u32),
    #[error("{device} payload needs {needed} bytes, record has {available}")]
    Truncated {
        device: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("inconsistent keyboard flags {flags:#06x} for message {message:#06x}")]
    InconsistentKeyboardFlags { flags: u16, message: u32 },
    #[error("virtual-key code {0:#x} out of range")]
    InvalidVirtualKey(u16),
    #[error("raw input accessor failed: {0}")]
    Accessor(#[from] io::Error),
}

/// Access to the platform's raw input buffer for one notification.
///
/// Mirrors the two-call `GetRawInputData` protocol: ask for the size, then
/// fetch into a buffer of exactly that size.
pub trait RawInputSource {
    /// Opaque per-notification handle (`HRAWINPUT` on Windows).
    type Handle: Copy;

    /// Returns the number of bytes the record occupies.
    fn required_size(&mut self, handle: Self::Handle) -> io::Result<usize>;

    /// Copies the record into `buf`, returning the number of bytes written.
    fn fetch(&mut self, handle: Self::Handle, buf: &mut [u8]) -> io::Result<usize>;
}

impl<S: RawInputSource + ?Sized> RawInputSource for &mut S {
    type Handle = S::Handle;

    fn required_size(&mut self, handle: Self::Handle) -> io::Result<usize> {
        (**self).required_size(handle)
    }

    fn fetch(&mut self, handle: Self::Handle, buf: &mut [u8]) -> io::Result<usize> {
        (**self).fetch(handle, buf)
    }
}

/// Reads the full record for `handle` and decodes it.
pub fn read_packet<S: RawInputSource>(
    source: &mut S,
    handle: S::Handle,
) -> Result<Packet, DecodeError> {
    let size = source.required_size(handle)?;
    let mut buffer: SmallVec<[u8; INLINE_PACKET_SIZE]> = SmallVec::from_elem(0, size);

    let written = source.fetch(handle, &mut buffer)?;
    if written != size {
        return Err(DecodeError::SizeMismatch {
            expected: size,
            actual: written,
        });
    }

    decode(&buffer)
}

#[inline(always)]
fn read_u16(buf: &[u8], offset: usize) -> Option<u16> {
    buf.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

#[inline(always)]
fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Decodes one `RAWINPUT` record.
pub fn decode(buf: &[u8]) -> Result<Packet, DecodeError> {
    let (Some(device_type), Some(declared)) = (read_u32(buf, 0), read_u32(buf, 4)) else {
        return Err(DecodeError::TooShort { len: buf.len() });
    };
    if buf.len() < HEADER_SIZE {
        return Err(DecodeError::TooShort { len: buf.len() });
    }
    if declared as usize != buf.len() {
        return Err(DecodeError::SizeMismatch {
            expected: declared as usize,
            actual: buf.len(),
        });
    }

    let payload = &buf[HEADER_SIZE..];
    match device_type {
        RIM_TYPEKEYBOARD => decode_keyboard(payload),
        RIM_TYPEMOUSE => decode_mouse(payload),
        RIM_TYPEHID => Ok(Packet::Unrecognized(RIM_TYPEHID)),
        other => Err(DecodeError::UnknownDeviceType(other)),
    }
}

fn truncated(device: &'static str, needed: usize, available: usize) -> DecodeError {
    DecodeError::Truncated {
        device,
        needed,
        available,
    }
}

fn decode_keyboard(payload: &[u8]) -> Result<Packet, DecodeError> {
    if payload.len() < KEYBOARD_PAYLOAD_SIZE {
        return Err(truncated("keyboard", KEYBOARD_PAYLOAD_SIZE, payload.len()));
    }
    let fields = (
        read_u16(payload, 0),
        read_u16(payload, 2),
        read_u16(payload, 6),
        read_u32(payload, 8),
    );
    let (Some(make_code), Some(flags), Some(vkey), Some(message)) = fields else {
        return Err(truncated("keyboard", KEYBOARD_PAYLOAD_SIZE, payload.len()));
    };

    let transition = keyboard_transition(flags, message)?;

    let vk = u8::try_from(vkey).map_err(|_| DecodeError::InvalidVirtualKey(vkey))?;
    // 0 and 0xFF mark fake keys inside escaped scan code sequences
    if vk == 0 || vk == 0xFF {
        return Ok(Packet::Unrecognized(RIM_TYPEKEYBOARD));
    }

    let vk = sided_modifier(vk, make_code, flags);
    Ok(Packet::Keyboard(InputEvent {
        key: KeyId::from_vk(vk),
        transition,
    }))
}

/// Cross-checks the break bit against the window message.
fn keyboard_transition(flags: u16, message: u32) -> Result<Transition, DecodeError> {
    let inconsistent = DecodeError::InconsistentKeyboardFlags { flags, message };

    if flags & !RI_KEY_KNOWN_FLAGS != 0 || flags & (RI_KEY_E0 | RI_KEY_E1) == RI_KEY_E0 | RI_KEY_E1 {
        return Err(inconsistent);
    }

    let by_flags = if flags & RI_KEY_BREAK != 0 {
        Transition::Release
    } else {
        Transition::Press
    };
    let by_message = match message {
        WM_KEYDOWN | WM_SYSKEYDOWN => Transition::Press,
        WM_KEYUP | WM_SYSKEYUP => Transition::Release,
        _ => return Err(inconsistent),
    };

    if by_flags != by_message {
        return Err(inconsistent);
    }
    Ok(by_flags)
}

/// Raw input reports generic modifier codes; resolve the left/right variant.
fn sided_modifier(vk: u8, make_code: u16, flags: u16) -> u8 {
    let extended = flags & RI_KEY_E0 != 0;
    match vk {
        VK_SHIFT if make_code == SCANCODE_RSHIFT => VK_RSHIFT,
        VK_SHIFT => VK_LSHIFT,
        VK_CONTROL if extended => VK_RCONTROL,
        VK_CONTROL => VK_LCONTROL,
        VK_MENU if extended => VK_RMENU,
        VK_MENU => VK_LMENU,
        other => other,
    }
}

fn decode_mouse(payload: &[u8]) -> Result<Packet, DecodeError> {
    if payload.len() < MOUSE_PAYLOAD_SIZE {
        return Err(truncated("mouse", MOUSE_PAYLOAD_SIZE, payload.len()));
    }
    let Some(button_flags) = read_u16(payload, 4) else {
        return Err(truncated("mouse", MOUSE_PAYLOAD_SIZE, payload.len()));
    };
    Ok(Packet::Mouse(mouse_button_events(button_flags)))
}

/// Expands a button flag mask into transitions, lowest bit first.
pub fn mouse_button_events(button_flags: u16) -> MouseEvents {
    let mut events = MouseEvents::new();
    if button_flags == 0 {
        return events;
    }

    for button in MouseButton::ALL {
        let down = RI_MOUSE_BUTTON_1_DOWN << (2 * button.index());
        let up = RI_MOUSE_BUTTON_1_UP << (2 * button.index());
        if button_flags & down != 0 {
            events.push(InputEvent::press(button));
        }
        if button_flags & up != 0 {
            events.push(InputEvent::release(button));
        }
    }
    events
}

/// Builders for raw input byte images, used by tests and diagnostics.
pub mod builder {
    use super::*;

    fn header(device_type: u32, payload_len: usize) -> Vec<u8> {
        let total = HEADER_SIZE + payload_len;
        let mut buf = Vec::with_capacity(total);
        buf.extend_from_slice(&device_type.to_le_bytes());
        buf.extend_from_slice(&(total as u32).to_le_bytes());
        buf.resize(HEADER_SIZE, 0);
        buf
    }

    /// Keyboard record with explicit flags and window message.
    pub fn keyboard(vkey: u16, make_code: u16, flags: u16, message: u32) -> Vec<u8> {
        let mut buf = header(RIM_TYPEKEYBOARD, KEYBOARD_PAYLOAD_SIZE);
        buf.extend_from_slice(&make_code.to_le_bytes());
        buf.extend_from_slice(&flags.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&vkey.to_le_bytes());
        buf.extend_from_slice(&message.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf
    }

    pub fn key_down(vkey: u16) -> Vec<u8> {
        keyboard(vkey, 0, 0, WM_KEYDOWN)
    }

    pub fn key_up(vkey: u16) -> Vec<u8> {
        keyboard(vkey, 0, RI_KEY_BREAK, WM_KEYUP)
    }

    /// Mouse record carrying `button_flags`.
    pub fn mouse(button_flags: u16) -> Vec<u8> {
        let mut buf = header(RIM_TYPEMOUSE, MOUSE_PAYLOAD_SIZE);
        let mut payload = [0u8; MOUSE_PAYLOAD_SIZE];
        payload[4..6].copy_from_slice(&button_flags.to_le_bytes());
        buf.extend_from_slice(&payload);
        buf
    }

    /// HID record with an arbitrary report body.
    pub fn hid(report: &[u8]) -> Vec<u8> {
        let mut buf = header(RIM_TYPEHID, report.len());
        buf.extend_from_slice(report);
        buf
    }
}
