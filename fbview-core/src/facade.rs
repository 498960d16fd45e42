//! The display surface: what the rest of the viewer draws into.
//!
//! A [`DisplaySurface`] is a [`PixelSurface`] whose memory belongs to a
//! render engine. It is created empty and becomes usable once
//! [`attach`](DisplaySurface::attach) (or
//! [`set_properties`](DisplaySurface::set_properties)) has built a
//! [`RenderCoordinator`] for a window.
//!
//! Because the engine decides the buffer layout, the generic structural
//! mutators a plain surface would offer are rejected with
//! [`RenderError::InvalidOperation`] and leave the surface untouched.

use tracing::{debug, error, info};

use crate::buffer::SharedBuffer;
use crate::config::RenderConfig;
use crate::coordinator::{ModeSwitch, RenderCoordinator};
use crate::engine::{CaptureMode, EngineSpec, RenderBackend, RenderMode};
use crate::error::{RenderError, Result};
use crate::geometry::{Dimension, Rect};
use crate::pattern;
use crate::pixel::PixelFormat;
use crate::surface::PixelSurface;
use crate::window::WindowHandle;

pub struct DisplaySurface<B: RenderBackend + Clone> {
    surface: PixelSurface,
    coordinator: Option<RenderCoordinator<B>>,
    backend: B,
    config: RenderConfig,
}

impl<B: RenderBackend + Clone> DisplaySurface<B> {
    /// An unattached surface. Presentation fails with `Uninitialized`
    /// until [`attach`](Self::attach) succeeds.
    pub fn new(backend: B, config: RenderConfig) -> Self {
        Self {
            surface: PixelSurface::new(),
            coordinator: None,
            backend,
            config,
        }
    }

    // ── Attachment ───────────────────────────────────────────────

    /// Bind to `window` with the configured preferred mode.
    pub fn set_properties(
        &mut self,
        dimension: Dimension,
        format: PixelFormat,
        window: WindowHandle,
    ) -> Result<()> {
        let mode = self.config.preferred_mode;
        self.attach(dimension, format, window, mode)
    }

    /// Tear down any existing engine and build a new one for `window`.
    pub fn attach(
        &mut self,
        dimension: Dimension,
        format: PixelFormat,
        window: WindowHandle,
        mode: RenderMode,
    ) -> Result<()> {
        if !format.is_supported() {
            return Err(RenderError::InvalidOperation(
                "pixel format must use 8, 16 or 32 bits per pixel",
            ));
        }

        self.release();

        let spec = EngineSpec::new(format, dimension, window);
        self.surface.set_properties_without_resize(spec.dimension(), format);

        match RenderCoordinator::new(
            self.backend.clone(),
            spec,
            mode,
            &self.config,
            &mut self.surface,
        ) {
            Ok(coordinator) => {
                info!(
                    "display surface attached to window {window}: {}x{}, {} bpp, {} mode",
                    spec.dimension().width,
                    spec.dimension().height,
                    format.bits_per_pixel,
                    coordinator.mode().unwrap_or_default(),
                );
                self.coordinator = Some(coordinator);
                Ok(())
            }
            Err(e) => {
                error!("could not attach display surface to window {window}: {e}");
                self.surface.set_buffer(None);
                Err(e)
            }
        }
    }

    /// Destroy the coordinator and its engine. Idempotent.
    pub fn release(&mut self) {
        if let Some(mut coordinator) = self.coordinator.take() {
            coordinator.destroy(&mut self.surface);
            debug!("display surface released");
        }
        self.surface.set_buffer(None);
    }

    pub fn is_attached(&self) -> bool {
        self.coordinator.is_some()
    }

    fn coordinator_mut(&mut self) -> Result<&mut RenderCoordinator<B>> {
        self.coordinator
            .as_mut()
            .ok_or(RenderError::Uninitialized("display surface is not attached to a window"))
    }

    // ── Presentation ─────────────────────────────────────────────

    /// Capture screen content at `rect` into the buffer.
    pub fn capture(&mut self, rect: &Rect) -> Result<()> {
        self.coordinator_mut()?.capture(rect, CaptureMode::Opaque)
    }

    /// Like [`capture`](Self::capture) but includes layered windows.
    pub fn capture_transparent(&mut self, rect: &Rect) -> Result<()> {
        self.coordinator_mut()?.capture(rect, CaptureMode::IncludeLayered)
    }

    pub fn present(&mut self, rect: &Rect) -> Result<()> {
        self.coordinator_mut()?.present(rect)
    }

    pub fn present_scaled(&mut self, src: &Rect, dst: &Rect) -> Result<()> {
        self.coordinator_mut()?.present_scaled(src, dst)
    }

    /// Notify the engine that the target window changed size.
    pub fn resize(&mut self, rect: &Rect) -> Result<()> {
        self.coordinator_mut()?.resize(rect)
    }

    /// Active mode; `Software` while unattached.
    pub fn render_mode(&self) -> RenderMode {
        self.coordinator
            .as_ref()
            .and_then(RenderCoordinator::mode)
            .unwrap_or_default()
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) -> Result<ModeSwitch> {
        let coordinator = self
            .coordinator
            .as_mut()
            .ok_or(RenderError::Uninitialized("display surface is not attached to a window"))?;
        coordinator.set_mode(mode, &mut self.surface)
    }

    pub fn hardware_available(&self) -> bool {
        self.backend.hardware_available()
    }

    /// Draw the diagnostic pattern and present the whole surface.
    pub fn draw_test_pattern(&mut self) -> Result<()> {
        self.coordinator_mut()?;
        pattern::draw_test_pattern(&mut self.surface)?;
        let rect = self.surface.dimension().to_rect();
        self.present(&rect)
    }

    // ── Pixel access ─────────────────────────────────────────────

    /// Read-only view of the underlying surface, e.g. as a copy source.
    pub fn surface(&self) -> &PixelSurface {
        &self.surface
    }

    pub fn buffer(&self) -> Option<SharedBuffer> {
        self.surface.buffer()
    }

    pub fn dimension(&self) -> Dimension {
        self.surface.dimension()
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.surface.pixel_format()
    }

    pub fn bits_per_pixel(&self) -> u8 {
        self.surface.bits_per_pixel()
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.surface.bytes_per_pixel()
    }

    pub fn bytes_per_row(&self) -> usize {
        self.surface.bytes_per_row()
    }

    pub fn buffer_size(&self) -> usize {
        self.surface.buffer_size()
    }

    pub fn pixel_offset(&self, x: i32, y: i32) -> Option<usize> {
        self.surface.pixel_offset(x, y)
    }

    pub fn fill_rect(&mut self, rect: &Rect, color: u32) -> Result<()> {
        self.surface.fill_rect(rect, color)
    }

    pub fn copy_from(&mut self, dst_rect: &Rect, src: &PixelSurface, src_x: i32, src_y: i32) -> Result<()> {
        self.surface.copy_from(dst_rect, src, src_x, src_y)
    }

    pub fn copy_from_all(&mut self, src: &PixelSurface, src_x: i32, src_y: i32) -> Result<()> {
        self.surface.copy_from_all(src, src_x, src_y)
    }

    pub fn move_rect(&mut self, dst_rect: &Rect, src_x: i32, src_y: i32) -> Result<()> {
        self.surface.move_rect(dst_rect, src_x, src_y)
    }

    pub fn cmp_from(&self, dst_rect: &Rect, src: &PixelSurface, src_x: i32, src_y: i32) -> Result<bool> {
        self.surface.cmp_from(dst_rect, src, src_x, src_y)
    }

    pub fn overlay(
        &mut self,
        dst_rect: &Rect,
        src: &PixelSurface,
        src_x: i32,
        src_y: i32,
        and_mask: &[u8],
    ) -> Result<()> {
        self.surface.overlay(dst_rect, src, src_x, src_y, and_mask)
    }

    pub fn is_equal_to(&self, other: &PixelSurface) -> bool {
        self.surface.is_equal_to(other)
    }

    // ── Rejected mutators ────────────────────────────────────────

    pub fn set_dimension(&mut self, _dimension: Dimension) -> Result<()> {
        Err(rejected("set_dimension"))
    }

    pub fn set_dimension_rect(&mut self, _rect: &Rect) -> Result<()> {
        Err(rejected("set_dimension_rect"))
    }

    pub fn set_pixel_format(&mut self, _format: PixelFormat) -> Result<()> {
        Err(rejected("set_pixel_format"))
    }

    pub fn set_buffer(&mut self, _buffer: Option<&SharedBuffer>) -> Result<()> {
        Err(rejected("set_buffer"))
    }

    pub fn set_properties_without_window(&mut self, _dimension: Dimension, _format: PixelFormat) -> Result<()> {
        Err(rejected("set_properties_without_window"))
    }

    pub fn set_properties_without_resize(&mut self, _dimension: Dimension, _format: PixelFormat) -> Result<()> {
        Err(rejected("set_properties_without_resize"))
    }

    pub fn set_empty_dimension(&mut self, _rect: &Rect) -> Result<()> {
        Err(rejected("set_empty_dimension"))
    }

    pub fn set_empty_pixel_format(&mut self, _format: PixelFormat) -> Result<()> {
        Err(rejected("set_empty_pixel_format"))
    }

    pub fn assign_properties(&mut self, _src: &PixelSurface) -> Result<()> {
        Err(rejected("assign_properties"))
    }

    pub fn clone_from_surface(&mut self, _src: &PixelSurface) -> Result<()> {
        Err(rejected("clone_from_surface"))
    }
}

impl<B: RenderBackend + Clone> Drop for DisplaySurface<B> {
    fn drop(&mut self) {
        self.release();
    }
}

fn rejected(operation: &'static str) -> RenderError {
    debug!("{operation} rejected: the render engine owns the buffer layout");
    RenderError::InvalidOperation(operation)
}
