//! Target window handles and the window-system collaborator.
//!
//! Engines never trust a handle they were given: the host window can be
//! destroyed at any time. [`resolve_target`] substitutes the desktop
//! window for a null or dead handle at construction time, and engines
//! re-check validity before every present.

use std::fmt;

// ── WindowHandle ─────────────────────────────────────────────────

/// An opaque native window handle (an `HWND` on Windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    pub const NULL: WindowHandle = WindowHandle(0);

    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

// ── WindowSystem ─────────────────────────────────────────────────

/// What the render engines need from the host window system.
pub trait WindowSystem {
    /// Whether `window` currently refers to a live window.
    fn is_window(&self, window: WindowHandle) -> bool;

    /// The desktop (root) window, used when no usable target is given.
    fn desktop_window(&self) -> WindowHandle;
}

/// Pick the window an engine should bind to.
///
/// Returns `requested` when it is live, otherwise the desktop window,
/// otherwise `None`.
pub fn resolve_target(windows: &dyn WindowSystem, requested: WindowHandle) -> Option<WindowHandle> {
    if !requested.is_null() && windows.is_window(requested) {
        return Some(requested);
    }
    let desktop = windows.desktop_window();
    if !desktop.is_null() && windows.is_window(desktop) {
        tracing::debug!("window {requested} unusable, falling back to desktop {desktop}");
        return Some(desktop);
    }
    None
}

// ── Win32 implementation ─────────────────────────────────────────

/// The real Win32 window system.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32Windows;

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{GetDesktopWindow, IsWindow};

    impl WindowHandle {
        pub fn hwnd(self) -> HWND {
            HWND(self.0 as *mut core::ffi::c_void)
        }

        pub fn from_hwnd(hwnd: HWND) -> Self {
            WindowHandle(hwnd.0 as isize)
        }
    }

    impl WindowSystem for Win32Windows {
        fn is_window(&self, window: WindowHandle) -> bool {
            unsafe { IsWindow(window.hwnd()) }.as_bool()
        }

        fn desktop_window(&self) -> WindowHandle {
            WindowHandle::from_hwnd(unsafe { GetDesktopWindow() })
        }
    }
}

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
impl WindowSystem for Win32Windows {
    fn is_window(&self, _window: WindowHandle) -> bool {
        false
    }

    fn desktop_window(&self) -> WindowHandle {
        WindowHandle::NULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeWindows {
        live: Vec<WindowHandle>,
        desktop: WindowHandle,
    }

    impl WindowSystem for FakeWindows {
        fn is_window(&self, window: WindowHandle) -> bool {
            self.live.contains(&window)
        }

        fn desktop_window(&self) -> WindowHandle {
            self.desktop
        }
    }

    #[test]
    fn live_window_is_kept() {
        let ws = FakeWindows {
            live: vec![WindowHandle(7), WindowHandle(1)],
            desktop: WindowHandle(1),
        };
        assert_eq!(resolve_target(&ws, WindowHandle(7)), Some(WindowHandle(7)));
    }

    #[test]
    fn dead_or_null_window_falls_back_to_desktop() {
        let ws = FakeWindows {
            live: vec![WindowHandle(1)],
            desktop: WindowHandle(1),
        };
        assert_eq!(resolve_target(&ws, WindowHandle(9)), Some(WindowHandle(1)));
        assert_eq!(resolve_target(&ws, WindowHandle::NULL), Some(WindowHandle(1)));
    }

    #[test]
    fn no_usable_window() {
        let ws = FakeWindows {
            live: vec![],
            desktop: WindowHandle::NULL,
        };
        assert_eq!(resolve_target(&ws, WindowHandle(3)), None);
    }

    #[test]
    fn handle_display_is_hex() {
        assert_eq!(WindowHandle(255).to_string(), "0xff");
    }
}
