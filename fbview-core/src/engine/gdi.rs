//! Software engine: a GDI DIB section presented with `BitBlt` /
//! `StretchBlt`.
//!
//! The DIB section's bits are the frame buffer: remote updates are
//! written straight into them, screen captures `BitBlt` into them, and
//! presents blit out of the memory DC that holds the section.
//!
//! Resources are acquired in the order target DC → screen DC → memory
//! DC → DIB section → selection, and released in exactly the reverse
//! order. A failure part-way through releases the acquired prefix before
//! the error is returned.

#[cfg(target_os = "windows")]
mod platform {
    use std::ffi::c_void;
    use std::ptr::{NonNull, null_mut};

    use tracing::{debug, trace};
    use windows::Win32::Foundation::HWND;
    use windows::Win32::Graphics::Gdi::*;
    use windows::Win32::UI::WindowsAndMessaging::{
        GetSystemMetrics, SM_XVIRTUALSCREEN, SM_YVIRTUALSCREEN,
    };

    use crate::buffer::{PixelBuffer, SharedBuffer};
    use crate::engine::{
        CaptureMode, EngineSpec, Interpolation, RenderEngine, RenderMode, clip_to_buffer,
    };
    use crate::error::{RenderError, Result};
    use crate::geometry::{Dimension, Rect};
    use crate::pixel::PixelFormat;
    use crate::window::{Win32Windows, WindowHandle, WindowSystem, resolve_target};

    // ── Dib ──────────────────────────────────────────────────────

    /// A top-down 32-bit DIB section selected into a memory DC, plus the
    /// screen DC captures are taken from. Shared by both Win32 engines.
    pub(crate) struct Dib {
        screen_dc: HDC,
        mem_dc: HDC,
        bitmap: HBITMAP,
        old_bitmap: HGDIOBJ,
        bits: *mut c_void,
        dimension: Dimension,
        /// Virtual-desktop origin; capture coordinates are relative to it.
        origin: (i32, i32),
    }

    impl Dib {
        pub(crate) fn create(format: &PixelFormat, dimension: Dimension) -> std::result::Result<Self, String> {
            if !format.is_bgrx32() {
                return Err(format!(
                    "unsupported pixel format ({} bpp); only 32-bit BGRX can be presented",
                    format.bits_per_pixel
                ));
            }
            let mut dib = Dib {
                screen_dc: HDC(null_mut()),
                mem_dc: HDC(null_mut()),
                bitmap: HBITMAP(null_mut()),
                old_bitmap: HGDIOBJ(null_mut()),
                bits: null_mut(),
                dimension: dimension.clamped(),
                origin: (0, 0),
            };
            if let Err(e) = unsafe { dib.acquire() } {
                dib.release();
                return Err(e);
            }
            Ok(dib)
        }

        unsafe fn acquire(&mut self) -> std::result::Result<(), String> {
            unsafe {
                self.origin = (
                    GetSystemMetrics(SM_XVIRTUALSCREEN),
                    GetSystemMetrics(SM_YVIRTUALSCREEN),
                );

                self.screen_dc = GetDC(HWND(null_mut()));
                if self.screen_dc.is_invalid() {
                    return Err("GetDC(NULL) failed".into());
                }

                self.mem_dc = CreateCompatibleDC(self.screen_dc);
                if self.mem_dc.is_invalid() {
                    return Err("CreateCompatibleDC failed".into());
                }

                let info = BITMAPINFO {
                    bmiHeader: BITMAPINFOHEADER {
                        biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                        biWidth: self.dimension.width,
                        // Negative height = top-down DIB (origin at top-left).
                        biHeight: -self.dimension.height,
                        biPlanes: 1,
                        biBitCount: 32,
                        biCompression: BI_RGB.0,
                        ..Default::default()
                    },
                    bmiColors: [RGBQUAD::default(); 1],
                };

                let mut bits: *mut c_void = null_mut();
                self.bitmap = CreateDIBSection(
                    self.mem_dc,
                    &info,
                    DIB_RGB_COLORS,
                    &mut bits,
                    windows::Win32::Foundation::HANDLE::default(),
                    0,
                )
                .map_err(|e| format!("CreateDIBSection failed: {e}"))?;
                if bits.is_null() {
                    return Err("CreateDIBSection returned a null pixel buffer".into());
                }
                self.bits = bits;

                self.old_bitmap = SelectObject(self.mem_dc, self.bitmap);
                if self.old_bitmap.is_invalid() {
                    return Err("SelectObject failed for the DIB section".into());
                }
            }
            Ok(())
        }

        /// Raw address of the section's bits.
        pub(crate) fn bits(&self) -> Option<NonNull<u8>> {
            NonNull::new(self.bits as *mut u8)
        }

        pub(crate) fn mem_dc(&self) -> HDC {
            self.mem_dc
        }

        pub(crate) fn row_pitch(&self) -> u32 {
            self.dimension.width as u32 * 4
        }

        /// `BitBlt` screen content at `rect` into the section.
        pub(crate) fn capture(&self, rect: &Rect, mode: CaptureMode) -> Result<()> {
            let Some(r) = clip_to_buffer(rect, self.dimension) else {
                return Ok(());
            };
            let rop = match mode {
                CaptureMode::Opaque => SRCCOPY,
                CaptureMode::IncludeLayered => ROP_CODE(SRCCOPY.0 | CAPTUREBLT.0),
            };
            unsafe {
                BitBlt(
                    self.mem_dc,
                    r.left,
                    r.top,
                    r.width(),
                    r.height(),
                    self.screen_dc,
                    r.left + self.origin.0,
                    r.top + self.origin.1,
                    rop,
                )
            }
            .map_err(|e| RenderError::transient("screen capture", format!("BitBlt failed: {e}")))
        }

        /// Release in reverse acquisition order. Idempotent.
        pub(crate) fn release(&mut self) {
            unsafe {
                if !self.old_bitmap.is_invalid() {
                    SelectObject(self.mem_dc, self.old_bitmap);
                    self.old_bitmap = HGDIOBJ(null_mut());
                }
                if !self.bitmap.is_invalid() {
                    let _ = DeleteObject(self.bitmap);
                    self.bitmap = HBITMAP(null_mut());
                    self.bits = null_mut();
                }
                if !self.mem_dc.is_invalid() {
                    let _ = DeleteDC(self.mem_dc);
                    self.mem_dc = HDC(null_mut());
                }
                if !self.screen_dc.is_invalid() {
                    ReleaseDC(HWND(null_mut()), self.screen_dc);
                    self.screen_dc = HDC(null_mut());
                }
            }
        }
    }

    impl Drop for Dib {
        fn drop(&mut self) {
            self.release();
        }
    }

    // ── GdiSection ───────────────────────────────────────────────

    /// GDI software engine.
    pub struct GdiSection {
        window: WindowHandle,
        dimension: Dimension,
        buffer: SharedBuffer,
        target_dc: HDC,
        dib: Dib,
        released: bool,
    }

    impl GdiSection {
        pub fn new(spec: &EngineSpec) -> Result<Self> {
            let window = resolve_target(&Win32Windows, spec.window()).ok_or_else(|| {
                RenderError::construction(RenderMode::Software, "no usable target window")
            })?;

            let target_dc = unsafe { GetDC(window.hwnd()) };
            if target_dc.is_invalid() {
                return Err(RenderError::construction(
                    RenderMode::Software,
                    format!("GetDC({window}) failed"),
                ));
            }

            let dib = match Dib::create(&spec.format(), spec.dimension()) {
                Ok(dib) => dib,
                Err(reason) => {
                    unsafe { ReleaseDC(window.hwnd(), target_dc) };
                    return Err(RenderError::construction(RenderMode::Software, reason));
                }
            };
            let Some(bits) = dib.bits() else {
                unsafe { ReleaseDC(window.hwnd(), target_dc) };
                return Err(RenderError::construction(
                    RenderMode::Software,
                    "DIB section has no bits",
                ));
            };

            // SAFETY: the bits live until `dib.release()`, which is only
            // called after the buffer is revoked.
            let buffer = unsafe { PixelBuffer::mapped(bits, spec.buffer_len()) };

            debug!(
                "gdi engine ready: window {window}, {}x{}",
                spec.dimension().width, spec.dimension().height
            );

            Ok(Self {
                window,
                dimension: spec.dimension(),
                buffer,
                target_dc,
                dib,
                released: false,
            })
        }

        fn check_window(&self) -> Result<()> {
            if Win32Windows.is_window(self.window) {
                Ok(())
            } else {
                Err(RenderError::StaleWindow(self.window))
            }
        }
    }

    impl RenderEngine for GdiSection {
        fn mode(&self) -> RenderMode {
            RenderMode::Software
        }

        fn buffer(&self) -> &SharedBuffer {
            &self.buffer
        }

        fn capture(&mut self, rect: &Rect, mode: CaptureMode) -> Result<()> {
            if self.released {
                return Err(RenderError::Uninitialized("gdi engine was released"));
            }
            self.dib.capture(rect, mode)
        }

        fn present(&mut self, rect: &Rect) -> Result<()> {
            if self.released {
                return Err(RenderError::Uninitialized("gdi engine was released"));
            }
            self.check_window()?;
            let Some(r) = clip_to_buffer(rect, self.dimension) else {
                return Ok(());
            };
            unsafe {
                BitBlt(
                    self.target_dc,
                    r.left,
                    r.top,
                    r.width(),
                    r.height(),
                    self.dib.mem_dc(),
                    r.left,
                    r.top,
                    SRCCOPY,
                )
            }
            .map_err(|e| RenderError::transient("present", format!("BitBlt failed: {e}")))
        }

        fn present_scaled(&mut self, src: &Rect, dst: &Rect) -> Result<()> {
            if self.released {
                return Err(RenderError::Uninitialized("gdi engine was released"));
            }
            self.check_window()?;
            let Some(src) = clip_to_buffer(src, self.dimension) else {
                return Ok(());
            };
            if dst.is_empty() {
                return Ok(());
            }
            let mode = match Interpolation::for_scale(&src, dst) {
                Interpolation::NearestNeighbor => COLORONCOLOR,
                Interpolation::Linear => HALFTONE,
            };
            let ok = unsafe {
                SetStretchBltMode(self.target_dc, mode);
                // HALFTONE requires the brush origin to be reset afterwards.
                let _ = SetBrushOrgEx(self.target_dc, 0, 0, None);
                StretchBlt(
                    self.target_dc,
                    dst.left,
                    dst.top,
                    dst.width(),
                    dst.height(),
                    self.dib.mem_dc(),
                    src.left,
                    src.top,
                    src.width(),
                    src.height(),
                    SRCCOPY,
                )
            };
            if ok.as_bool() {
                Ok(())
            } else {
                Err(RenderError::transient("scaled present", "StretchBlt failed"))
            }
        }

        fn resize(&mut self, rect: &Rect) -> Result<()> {
            // The window DC does not depend on the client size.
            trace!("gdi resize to {}x{} ignored", rect.width(), rect.height());
            Ok(())
        }

        fn release(&mut self) {
            if self.released {
                return;
            }
            self.buffer.revoke();
            self.dib.release();
            unsafe { ReleaseDC(self.window.hwnd(), self.target_dc) };
            self.target_dc = HDC(null_mut());
            self.released = true;
            debug!("gdi engine released");
        }
    }

    impl Drop for GdiSection {
        fn drop(&mut self) {
            self.release();
        }
    }
}

#[cfg(target_os = "windows")]
pub(crate) use platform::Dib;
#[cfg(target_os = "windows")]
pub use platform::GdiSection;

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
pub mod stub {
    use crate::buffer::SharedBuffer;
    use crate::engine::{CaptureMode, EngineSpec, RenderEngine, RenderMode};
    use crate::error::{RenderError, Result};
    use crate::geometry::Rect;

    pub struct GdiSection {
        buffer: SharedBuffer,
    }

    impl GdiSection {
        pub fn new(_spec: &EngineSpec) -> Result<Self> {
            Err(RenderError::construction(
                RenderMode::Software,
                "GDI rendering is only available on Windows",
            ))
        }

        fn unsupported(operation: &'static str) -> RenderError {
            RenderError::Unsupported {
                operation,
                mode: RenderMode::Software,
            }
        }
    }

    impl RenderEngine for GdiSection {
        fn mode(&self) -> RenderMode {
            RenderMode::Software
        }

        fn buffer(&self) -> &SharedBuffer {
            &self.buffer
        }

        fn capture(&mut self, _rect: &Rect, _mode: CaptureMode) -> Result<()> {
            Err(Self::unsupported("capture"))
        }

        fn present(&mut self, _rect: &Rect) -> Result<()> {
            Err(Self::unsupported("present"))
        }

        fn present_scaled(&mut self, _src: &Rect, _dst: &Rect) -> Result<()> {
            Err(Self::unsupported("scaled present"))
        }

        fn resize(&mut self, _rect: &Rect) -> Result<()> {
            Err(Self::unsupported("resize"))
        }

        fn release(&mut self) {
            self.buffer.revoke();
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub use stub::*;
