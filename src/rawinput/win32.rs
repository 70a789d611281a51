//! Win32 host for the hotkey engine.
//!
//! Creates a message-only window, registers keyboards and mice for raw
//! input with `RIDEV_INPUTSINK` so hotkeys keep working while another
//! application has focus, and forwards every `WM_INPUT` to a
//! [`RawInputSink`] on the thread that runs the message loop.
//!
//! Device removal clears the whole chord. The removal notice carries only a
//! device handle, and held keys are not tracked per device, so unplugging a
//! second mouse also forgets keys still held on the keyboard. They are
//! picked up again by their next press; the cost is one missed trigger for
//! a chord that was being held across the unplug.

use std::cell::RefCell;
use std::io;
use std::sync::atomic::{AtomicIsize, Ordering};

use tracing::{debug, info, warn};
use windows::Win32::Foundation::{GetLastError, HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::*;
use windows::Win32::UI::WindowsAndMessaging::*;
use windows::core::PCWSTR;

use super::RawInputSource;
use crate::engine::{BindingSource, HotkeyEngine};

/// Window class name for the Raw Input message-only window.
const RAWINPUT_WINDOW_CLASS: &str = "ToriRawInputWindow";

const HID_USAGE_PAGE_GENERIC: u16 = 0x01;
const HID_USAGE_MOUSE: u16 = 0x02;
const HID_USAGE_KEYBOARD: u16 = 0x06;

const ERROR_CLASS_ALREADY_EXISTS: u32 = 1410;
const WM_INPUT_DEVICE_CHANGE: u32 = 0x00FE;
const GIDC_REMOVAL: usize = 2;

thread_local! {
    /// Receiver of raw input for the message loop running on this thread.
    static SINK: RefCell<Option<Box<dyn RawInputSink>>> = const { RefCell::new(None) };
}

/// Window handle of the running loop, for [`request_stop`].
static LOOP_WINDOW: AtomicIsize = AtomicIsize::new(0);

/// `GetRawInputData` accessor.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32RawInput;

impl RawInputSource for Win32RawInput {
    type Handle = HRAWINPUT;

    fn required_size(&mut self, handle: HRAWINPUT) -> io::Result<usize> {
        let mut size = 0u32;
        let result = unsafe {
            GetRawInputData(
                handle,
                RID_INPUT,
                None,
                &mut size,
                std::mem::size_of::<RAWINPUTHEADER>() as u32,
            )
        };
        if result != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(size as usize)
    }

    fn fetch(&mut self, handle: HRAWINPUT, buf: &mut [u8]) -> io::Result<usize> {
        let mut size = buf.len() as u32;
        let result = unsafe {
            GetRawInputData(
                handle,
                RID_INPUT,
                Some(buf.as_mut_ptr() as _),
                &mut size,
                std::mem::size_of::<RAWINPUTHEADER>() as u32,
            )
        };
        if result == u32::MAX {
            return Err(io::Error::last_os_error());
        }
        Ok(result as usize)
    }
}

/// Consumer of raw input notifications delivered by the message loop.
pub trait RawInputSink {
    fn on_raw_input(&mut self, handle: HRAWINPUT);

    /// A keyboard or mouse was disconnected.
    fn on_device_removed(&mut self) {}
}

impl<B: BindingSource> RawInputSink for HotkeyEngine<B> {
    fn on_raw_input(&mut self, handle: HRAWINPUT) {
        if let Err(e) = self.handle_raw_input(&mut Win32RawInput, handle) {
            warn!(error = %e, "dropping raw input packet");
        }
    }

    fn on_device_removed(&mut self) {
        // A removed device cannot deliver its key releases.
        let released = self.release_all();
        if released > 0 {
            debug!(released, "input device removed, chord cleared");
        }
    }
}

/// Runs the raw input message loop on the current thread until the window
/// is closed or [`request_stop`] is called.
pub fn run_message_loop(sink: Box<dyn RawInputSink>) -> anyhow::Result<()> {
    unsafe {
        let class_name = to_wstring(RAWINPUT_WINDOW_CLASS);
        let h_instance = GetModuleHandleW(None)?;

        let wc = WNDCLASSW {
            lpfnWndProc: Some(window_proc),
            hInstance: HINSTANCE(h_instance.0),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            ..Default::default()
        };

        if RegisterClassW(&wc) == 0 {
            let last_error = GetLastError();
            if last_error.0 != ERROR_CLASS_ALREADY_EXISTS {
                return Err(anyhow::anyhow!(
                    "Failed to register window class: {:?}",
                    last_error
                ));
            }
        }

        let hwnd = CreateWindowExW(
            WINDOW_EX_STYLE(0),
            PCWSTR(class_name.as_ptr()),
            windows::core::w!("Tori Raw Input Window"),
            WINDOW_STYLE(0),
            0,
            0,
            0,
            0,
            Some(HWND_MESSAGE),
            None,
            Some(HINSTANCE(h_instance.0)),
            None,
        )?;

        if let Err(e) = register_devices(hwnd) {
            let _ = DestroyWindow(hwnd);
            return Err(e);
        }

        SINK.with(|slot| *slot.borrow_mut() = Some(sink));
        LOOP_WINDOW.store(hwnd.0 as isize, Ordering::SeqCst);
        info!("raw input registered, message loop ready");

        let mut msg = MSG::default();
        loop {
            let result = GetMessageW(&mut msg, None, 0, 0);

            if result.0 == 0 || result.0 == -1 {
                break;
            }

            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }

        LOOP_WINDOW.store(0, Ordering::SeqCst);
        SINK.with(|slot| *slot.borrow_mut() = None);

        let _ = DestroyWindow(hwnd);
        UnregisterClassW(PCWSTR(class_name.as_ptr()), Some(HINSTANCE(h_instance.0)))?;
        debug!("raw input message loop finished");
    }

    Ok(())
}

/// Asks the running message loop to exit. Safe to call from any thread.
pub fn request_stop() -> bool {
    let raw = LOOP_WINDOW.load(Ordering::SeqCst);
    if raw == 0 {
        return false;
    }
    let hwnd = HWND(raw as _);
    unsafe { PostMessageW(Some(hwnd), WM_CLOSE, WPARAM(0), LPARAM(0)).is_ok() }
}

/// Registers keyboards and mice with the Raw Input API.
fn register_devices(hwnd: HWND) -> anyhow::Result<()> {
    let devices = [HID_USAGE_KEYBOARD, HID_USAGE_MOUSE].map(|usage| RAWINPUTDEVICE {
        usUsagePage: HID_USAGE_PAGE_GENERIC,
        usUsage: usage,
        dwFlags: RIDEV_INPUTSINK | RIDEV_DEVNOTIFY,
        hwndTarget: hwnd,
    });

    unsafe {
        RegisterRawInputDevices(&devices, std::mem::size_of::<RAWINPUTDEVICE>() as u32)?;
    }
    Ok(())
}

/// Runs `f` against the installed sink. Nested dispatch (a listener pumping
/// messages) finds the sink borrowed and drops the notification.
fn with_sink(f: impl FnOnce(&mut dyn RawInputSink)) {
    SINK.with(|slot| match slot.try_borrow_mut() {
        Ok(mut guard) => {
            if let Some(sink) = guard.as_mut() {
                f(sink.as_mut());
            }
        }
        Err(_) => warn!("raw input delivered re-entrantly, dropped"),
    });
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    match msg {
        WM_INPUT => {
            with_sink(|sink| sink.on_raw_input(HRAWINPUT(l_param.0 as _)));
            // Lets the system release the raw input buffer.
            unsafe { DefWindowProcW(hwnd, msg, w_param, l_param) }
        }
        WM_INPUT_DEVICE_CHANGE => {
            if w_param.0 == GIDC_REMOVAL {
                with_sink(|sink| sink.on_device_removed());
            }
            unsafe { DefWindowProcW(hwnd, msg, w_param, l_param) }
        }
        WM_CLOSE | WM_DESTROY => {
            unsafe { PostQuitMessage(0) };
            LRESULT(0)
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, w_param, l_param) },
    }
}

/// Converts a string to null-terminated UTF-16 for Windows APIs.
fn to_wstring(s: &str) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;
    std::ffi::OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}
