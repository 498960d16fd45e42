//! Hardware engine: Direct2D presentation of the frame buffer.
//!
//! The pixel memory is still a GDI DIB section, because Direct2D cannot
//! read the screen: captures `BitBlt` into the section exactly like the
//! software engine. Presents upload the affected rectangle into a
//! device bitmap and draw it through a render target.
//!
//! Render target selection:
//!
//! 1. `ID2D1HwndRenderTarget` bound to the window (accelerated).
//! 2. If the driver refuses, an `ID2D1DCRenderTarget` bound to the
//!    window's DC. This target cannot be resized in place, so a resize
//!    rebinds it to a fresh window DC instead.
//!
//! Acquisition order: factory → render target (→ window DC) → device
//! bitmap → DIB section. Release runs in reverse.

#[cfg(target_os = "windows")]
mod platform {
    use std::ffi::c_void;

    use tracing::{debug, warn};
    use windows::Win32::Foundation::RECT;
    use windows::Win32::Graphics::Direct2D::Common::*;
    use windows::Win32::Graphics::Direct2D::*;
    use windows::Win32::Graphics::Dxgi::Common::DXGI_FORMAT_B8G8R8A8_UNORM;
    use windows::Win32::Graphics::Gdi::{GetDC, HDC, ReleaseDC};

    use crate::buffer::{PixelBuffer, SharedBuffer};
    use crate::engine::gdi::Dib;
    use crate::engine::{
        CaptureMode, EngineSpec, Interpolation, RenderEngine, RenderMode, clip_to_buffer,
    };
    use crate::error::{RenderError, Result};
    use crate::geometry::{Dimension, Rect};
    use crate::window::{Win32Windows, WindowHandle, WindowSystem, resolve_target};

    /// Probe: create a factory and drop it straight away.
    pub fn is_available() -> bool {
        unsafe { D2D1CreateFactory::<ID2D1Factory>(D2D1_FACTORY_TYPE_SINGLE_THREADED, None) }
            .is_ok()
    }

    const PIXEL_FORMAT: D2D1_PIXEL_FORMAT = D2D1_PIXEL_FORMAT {
        format: DXGI_FORMAT_B8G8R8A8_UNORM,
        alphaMode: D2D1_ALPHA_MODE_IGNORE,
    };

    fn size_u(width: i32, height: i32) -> D2D_SIZE_U {
        D2D_SIZE_U {
            width: width.max(1) as u32,
            height: height.max(1) as u32,
        }
    }

    fn rect_f(r: &Rect) -> D2D_RECT_F {
        D2D_RECT_F {
            left: r.left as f32,
            top: r.top as f32,
            right: r.right as f32,
            bottom: r.bottom as f32,
        }
    }

    fn interpolation_mode(i: Interpolation) -> D2D1_BITMAP_INTERPOLATION_MODE {
        match i {
            Interpolation::NearestNeighbor => D2D1_BITMAP_INTERPOLATION_MODE_NEAREST_NEIGHBOR,
            Interpolation::Linear => D2D1_BITMAP_INTERPOLATION_MODE_LINEAR,
        }
    }

    // ── Target ───────────────────────────────────────────────────

    enum Target {
        Hwnd(ID2D1HwndRenderTarget),
        Dc { target: ID2D1DCRenderTarget, dc: HDC },
    }

    impl Target {
        fn render_target(&self) -> &ID2D1RenderTarget {
            match self {
                Target::Hwnd(t) => t,
                Target::Dc { target, .. } => target,
            }
        }
    }

    // ── Direct2dSection ──────────────────────────────────────────

    /// Direct2D hardware engine.
    pub struct Direct2dSection {
        window: WindowHandle,
        dimension: Dimension,
        buffer: SharedBuffer,
        factory: Option<ID2D1Factory>,
        target: Option<Target>,
        bitmap: Option<ID2D1Bitmap>,
        dib: Option<Dib>,
        released: bool,
    }

    impl Direct2dSection {
        pub fn new(spec: &EngineSpec) -> Result<Self> {
            if !spec.format().is_bgrx32() {
                return Err(RenderError::construction(
                    RenderMode::Hardware,
                    format!(
                        "Direct2D presents 32-bit BGRX only, got {} bpp",
                        spec.format().bits_per_pixel
                    ),
                ));
            }
            let window = resolve_target(&Win32Windows, spec.window()).ok_or_else(|| {
                RenderError::construction(RenderMode::Hardware, "no usable target window")
            })?;

            let mut section = Self {
                window,
                dimension: spec.dimension(),
                buffer: PixelBuffer::owned(0),
                factory: None,
                target: None,
                bitmap: None,
                dib: None,
                released: false,
            };
            if let Err(reason) = unsafe { section.acquire(spec) } {
                section.release();
                return Err(RenderError::construction(RenderMode::Hardware, reason));
            }

            debug!(
                "direct2d engine ready: window {window}, {}x{}, {} target",
                spec.dimension().width,
                spec.dimension().height,
                match section.target {
                    Some(Target::Hwnd(_)) => "hwnd",
                    _ => "dc",
                }
            );
            Ok(section)
        }

        unsafe fn acquire(&mut self, spec: &EngineSpec) -> std::result::Result<(), String> {
            let size = size_u(spec.dimension().width, spec.dimension().height);

            let factory: ID2D1Factory =
                unsafe { D2D1CreateFactory(D2D1_FACTORY_TYPE_SINGLE_THREADED, None) }
                    .map_err(|e| format!("D2D1CreateFactory failed: {e}"))?;
            self.factory = Some(factory.clone());

            let props = D2D1_RENDER_TARGET_PROPERTIES {
                r#type: D2D1_RENDER_TARGET_TYPE_DEFAULT,
                pixelFormat: PIXEL_FORMAT,
                dpiX: 0.0,
                dpiY: 0.0,
                usage: D2D1_RENDER_TARGET_USAGE_NONE,
                minLevel: D2D1_FEATURE_LEVEL_DEFAULT,
            };
            let hwnd_props = D2D1_HWND_RENDER_TARGET_PROPERTIES {
                hwnd: self.window.hwnd(),
                pixelSize: size,
                presentOptions: D2D1_PRESENT_OPTIONS_IMMEDIATELY,
            };
            let target = match unsafe { factory.CreateHwndRenderTarget(&props, &hwnd_props) } {
                Ok(t) => Target::Hwnd(t),
                Err(e) => {
                    warn!("hwnd render target unavailable ({e}); using a dc render target");
                    self.create_dc_target(&factory, spec.dimension())?
                }
            };
            let target = self.target.insert(target);

            let bitmap_props = D2D1_BITMAP_PROPERTIES {
                pixelFormat: PIXEL_FORMAT,
                dpiX: 0.0,
                dpiY: 0.0,
            };
            let bitmap = unsafe {
                target
                    .render_target()
                    .CreateBitmap(size, None, 0, &bitmap_props)
            }
            .map_err(|e| format!("CreateBitmap failed: {e}"))?;
            self.bitmap = Some(bitmap);

            let dib = self.dib.insert(Dib::create(&spec.format(), spec.dimension())?);
            let bits = dib.bits().ok_or("DIB section has no bits")?;
            // SAFETY: the bits live until the DIB is released, which
            // `release` only does after revoking the buffer.
            self.buffer = unsafe { PixelBuffer::mapped(bits, spec.buffer_len()) };
            Ok(())
        }

        fn create_dc_target(
            &self,
            factory: &ID2D1Factory,
            dimension: Dimension,
        ) -> std::result::Result<Target, String> {
            let props = D2D1_RENDER_TARGET_PROPERTIES {
                r#type: D2D1_RENDER_TARGET_TYPE_DEFAULT,
                pixelFormat: PIXEL_FORMAT,
                dpiX: 96.0,
                dpiY: 96.0,
                usage: D2D1_RENDER_TARGET_USAGE_GDI_COMPATIBLE,
                minLevel: D2D1_FEATURE_LEVEL_DEFAULT,
            };
            let target = unsafe { factory.CreateDCRenderTarget(&props) }
                .map_err(|e| format!("no compatible Direct2D render target: {e}"))?;
            let dc = self.bind_window_dc(&target, dimension)?;
            Ok(Target::Dc { target, dc })
        }

        /// Acquire the window DC and bind `target` to it.
        fn bind_window_dc(
            &self,
            target: &ID2D1DCRenderTarget,
            dimension: Dimension,
        ) -> std::result::Result<HDC, String> {
            let hwnd = self.window.hwnd();
            let dc = unsafe { GetDC(hwnd) };
            if dc.is_invalid() {
                return Err(format!("GetDC({}) failed", self.window));
            }
            let rc = RECT {
                left: 0,
                top: 0,
                right: dimension.width.max(1),
                bottom: dimension.height.max(1),
            };
            if let Err(e) = unsafe { target.BindDC(dc, &rc) } {
                unsafe { ReleaseDC(hwnd, dc) };
                return Err(format!("BindDC failed: {e}"));
            }
            Ok(dc)
        }

        fn check_live(&self) -> Result<()> {
            if self.released {
                return Err(RenderError::Uninitialized("direct2d engine was released"));
            }
            if !Win32Windows.is_window(self.window) {
                return Err(RenderError::StaleWindow(self.window));
            }
            Ok(())
        }

        /// Copy `r` of the frame buffer into the device bitmap.
        fn upload(&self, r: &Rect) -> Result<()> {
            let (Some(bitmap), Some(dib)) = (&self.bitmap, &self.dib) else {
                return Err(RenderError::Uninitialized("direct2d engine was released"));
            };
            let pitch = dib.row_pitch();
            let offset = r.top as usize * pitch as usize + r.left as usize * 4;
            let dst = D2D_RECT_U {
                left: r.left as u32,
                top: r.top as u32,
                right: r.right as u32,
                bottom: r.bottom as u32,
            };
            self.buffer.with_bytes(|bytes| unsafe {
                bitmap.CopyFromMemory(
                    Some(&dst),
                    bytes[offset..].as_ptr() as *const c_void,
                    pitch,
                )
            })?
            .map_err(|e| RenderError::transient("present", format!("CopyFromMemory failed: {e}")))
        }

        fn draw(
            &self,
            src: &Rect,
            dst: &Rect,
            interpolation: Interpolation,
            clear: bool,
            operation: &'static str,
        ) -> Result<()> {
            let (Some(target), Some(bitmap)) = (&self.target, &self.bitmap) else {
                return Err(RenderError::Uninitialized("direct2d engine was released"));
            };
            let rt = target.render_target();
            let src_f = rect_f(src);
            let dst_f = rect_f(dst);
            unsafe {
                rt.BeginDraw();
                if clear {
                    rt.Clear(Some(&D2D1_COLOR_F {
                        r: 0.0,
                        g: 0.0,
                        b: 0.0,
                        a: 1.0,
                    }));
                }
                rt.DrawBitmap(
                    bitmap,
                    Some(&dst_f),
                    1.0,
                    interpolation_mode(interpolation),
                    Some(&src_f),
                );
                rt.EndDraw(None, None)
            }
            .map_err(|e| RenderError::transient(operation, format!("EndDraw failed: {e}")))
        }
    }

    impl RenderEngine for Direct2dSection {
        fn mode(&self) -> RenderMode {
            RenderMode::Hardware
        }

        fn buffer(&self) -> &SharedBuffer {
            &self.buffer
        }

        fn capture(&mut self, rect: &Rect, mode: CaptureMode) -> Result<()> {
            match &self.dib {
                Some(dib) if !self.released => dib.capture(rect, mode),
                _ => Err(RenderError::Uninitialized("direct2d engine was released")),
            }
        }

        fn present(&mut self, rect: &Rect) -> Result<()> {
            self.check_live()?;
            let Some(r) = clip_to_buffer(rect, self.dimension) else {
                return Ok(());
            };
            self.upload(&r)?;
            self.draw(&r, &r, Interpolation::NearestNeighbor, false, "present")
        }

        fn present_scaled(&mut self, src: &Rect, dst: &Rect) -> Result<()> {
            self.check_live()?;
            let Some(s) = clip_to_buffer(src, self.dimension) else {
                return Ok(());
            };
            if dst.is_empty() {
                return Ok(());
            }
            self.upload(&s)?;
            self.draw(&s, dst, Interpolation::for_scale(&s, dst), true, "scaled present")
        }

        fn resize(&mut self, rect: &Rect) -> Result<()> {
            if self.released {
                return Err(RenderError::Uninitialized("direct2d engine was released"));
            }
            match &self.target {
                Some(Target::Hwnd(t)) => {
                    let size = size_u(rect.width(), rect.height());
                    unsafe { t.Resize(&size) }
                        .map_err(|e| RenderError::transient("resize", format!("{e}")))
                }
                Some(Target::Dc { target, dc }) => {
                    let target = target.clone();
                    let old_dc = *dc;
                    let new_dc = self
                        .bind_window_dc(&target, rect.size())
                        .map_err(|e| RenderError::transient("resize", e))?;
                    unsafe { ReleaseDC(self.window.hwnd(), old_dc) };
                    self.target = Some(Target::Dc { target, dc: new_dc });
                    debug!("dc render target rebound at {}x{}", rect.width(), rect.height());
                    Ok(())
                }
                None => Err(RenderError::Uninitialized("direct2d engine was released")),
            }
        }

        fn release(&mut self) {
            if self.released {
                return;
            }
            self.buffer.revoke();
            self.dib = None;
            self.bitmap = None;
            if let Some(Target::Dc { dc, .. }) = self.target.take() {
                unsafe { ReleaseDC(self.window.hwnd(), dc) };
            }
            self.factory = None;
            self.released = true;
            debug!("direct2d engine released");
        }
    }

    impl Drop for Direct2dSection {
        fn drop(&mut self) {
            self.release();
        }
    }
}

#[cfg(target_os = "windows")]
pub use platform::{Direct2dSection, is_available};

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
pub mod stub {
    use crate::buffer::SharedBuffer;
    use crate::engine::{CaptureMode, EngineSpec, RenderEngine, RenderMode};
    use crate::error::{RenderError, Result};
    use crate::geometry::Rect;

    /// Direct2D is only available on Windows.
    pub fn is_available() -> bool {
        false
    }

    pub struct Direct2dSection {
        buffer: SharedBuffer,
    }

    impl Direct2dSection {
        pub fn new(_spec: &EngineSpec) -> Result<Self> {
            Err(RenderError::construction(
                RenderMode::Hardware,
                "Direct2D is only available on Windows",
            ))
        }

        fn unsupported(operation: &'static str) -> RenderError {
            RenderError::Unsupported {
                operation,
                mode: RenderMode::Hardware,
            }
        }
    }

    impl RenderEngine for Direct2dSection {
        fn mode(&self) -> RenderMode {
            RenderMode::Hardware
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
