//! Win32 window creation and message loop.
//!
//! Creates the native HWND the display surface renders into. The window
//! produces [`WindowEvent`]s that the main loop turns into presents,
//! resizes and viewer commands.

/// Events produced by the window message loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// Window close requested (Alt-F4/X button).
    Close,
    /// Client area resized.
    Resize(u32, u32),
    /// Part of the client area needs repainting.
    Paint,
    /// Key down/up: virtual-key code, pressed.
    Key(u16, bool),
}

#[cfg(target_os = "windows")]
mod platform {
    use std::sync::mpsc;

    use fbview_core::WindowHandle;
    use windows::Win32::Foundation::*;
    use windows::Win32::Graphics::Gdi::ValidateRect;
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::WindowsAndMessaging::*;
    use windows::core::PCWSTR;

    use super::WindowEvent;

    /// Handle to the native window.
    pub struct NativeWindow {
        hwnd: HWND,
        event_rx: mpsc::Receiver<WindowEvent>,
    }

    // The boxed event sender lives in GWLP_USERDATA until the window
    // is dropped.
    unsafe extern "system" fn wndproc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        let tx_ptr = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *const mpsc::Sender<WindowEvent>;

        if tx_ptr.is_null() {
            return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
        }

        let tx = unsafe { &*tx_ptr };

        match msg {
            WM_CLOSE => {
                let _ = tx.send(WindowEvent::Close);
                LRESULT(0)
            }
            WM_SIZE => {
                let w = (lparam.0 & 0xFFFF) as u32;
                let h = ((lparam.0 >> 16) & 0xFFFF) as u32;
                let _ = tx.send(WindowEvent::Resize(w, h));
                LRESULT(0)
            }
            WM_PAINT => {
                let _ = unsafe { ValidateRect(hwnd, None) };
                let _ = tx.send(WindowEvent::Paint);
                LRESULT(0)
            }
            WM_ERASEBKGND => LRESULT(1),
            WM_KEYDOWN | WM_SYSKEYDOWN => {
                let _ = tx.send(WindowEvent::Key((wparam.0 & 0xFFFF) as u16, true));
                LRESULT(0)
            }
            WM_KEYUP | WM_SYSKEYUP => {
                let _ = tx.send(WindowEvent::Key((wparam.0 & 0xFFFF) as u16, false));
                LRESULT(0)
            }
            WM_DESTROY => {
                unsafe { PostQuitMessage(0) };
                LRESULT(0)
            }
            _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        }
    }

    impl NativeWindow {
        /// Create a new top-level window with a client area of roughly
        /// `width` × `height`.
        pub fn create(title: &str, width: u32, height: u32) -> Result<Self, String> {
            let (event_tx, event_rx) = mpsc::channel();

            let hinstance = unsafe { GetModuleHandleW(None) }
                .map_err(|e| format!("GetModuleHandle: {e}"))?;

            let class_name_wide: Vec<u16> = "FbViewWindowClass\0".encode_utf16().collect();

            let wc = WNDCLASSW {
                lpfnWndProc: Some(wndproc),
                hInstance: hinstance.into(),
                lpszClassName: PCWSTR(class_name_wide.as_ptr()),
                hCursor: unsafe { LoadCursorW(None, IDC_ARROW) }.unwrap_or_default(),
                ..Default::default()
            };

            let atom = unsafe { RegisterClassW(&wc) };
            if atom == 0 {
                return Err("RegisterClassW failed".into());
            }

            let title_wide: Vec<u16> = title.encode_utf16().chain(std::iter::once(0)).collect();

            let hwnd = unsafe {
                CreateWindowExW(
                    WINDOW_EX_STYLE(0),
                    PCWSTR(class_name_wide.as_ptr()),
                    PCWSTR(title_wide.as_ptr()),
                    WS_OVERLAPPEDWINDOW | WS_VISIBLE,
                    CW_USEDEFAULT,
                    CW_USEDEFAULT,
                    width as i32,
                    height as i32,
                    None,
                    None,
                    hinstance,
                    None,
                )
            }
            .map_err(|e| format!("CreateWindowExW failed: {e}"))?;

            if hwnd.is_invalid() {
                return Err("CreateWindowExW returned invalid HWND".into());
            }

            let tx_ptr = Box::into_raw(Box::new(event_tx));
            unsafe {
                SetWindowLongPtrW(hwnd, GWLP_USERDATA, tx_ptr as isize);
            }

            Ok(Self { hwnd, event_rx })
        }

        /// Pump window messages (non-blocking). Returns collected events.
        pub fn poll_events(&self) -> Vec<WindowEvent> {
            unsafe {
                let mut msg = MSG::default();
                while PeekMessageW(&mut msg, self.hwnd, 0, 0, PM_REMOVE).as_bool() {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            }
            self.event_rx.try_iter().collect()
        }

        /// Handle the display surface binds to.
        pub fn handle(&self) -> WindowHandle {
            WindowHandle::from_hwnd(self.hwnd)
        }
    }

    impl Drop for NativeWindow {
        fn drop(&mut self) {
            unsafe {
                let ptr = GetWindowLongPtrW(self.hwnd, GWLP_USERDATA) as *mut mpsc::Sender<WindowEvent>;
                if !ptr.is_null() {
                    SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, 0);
                    drop(Box::from_raw(ptr));
                }
                let _ = DestroyWindow(self.hwnd);
            }
        }
    }
}

#[cfg(target_os = "windows")]
pub use platform::*;

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
pub mod stub {
    use fbview_core::WindowHandle;

    use super::WindowEvent;

    pub struct NativeWindow;

    impl NativeWindow {
        pub fn create(_title: &str, _w: u32, _h: u32) -> Result<Self, String> {
            Err("Window creation is only supported on Windows".into())
        }

        pub fn poll_events(&self) -> Vec<WindowEvent> {
            Vec::new()
        }

        pub fn handle(&self) -> WindowHandle {
            WindowHandle::NULL
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub use stub::*;
