//! Render engines: the backends that hold a presentable bitmap, capture
//! screen content into it and present it to a window.
//!
//! ```text
//!              ┌──────────────────────┐
//!              │   RenderCoordinator  │
//!              └──────────┬───────────┘
//!                         │ RenderBackend
//!           ┌─────────────┴─────────────┐
//!  ┌────────▼────────┐         ┌────────▼────────┐
//!  │   GdiSection    │         │ Direct2dSection │
//!  │ (software, DIB) │         │   (hardware)    │
//!  └─────────────────┘         └─────────────────┘
//! ```
//!
//! | Module     | Purpose                                           |
//! |------------|---------------------------------------------------|
//! | `gdi`      | DIB section + `BitBlt`/`StretchBlt` presentation   |
//! | `direct2d` | Direct2D render target + bitmap presentation       |

pub mod direct2d;
pub mod gdi;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::buffer::SharedBuffer;
use crate::error::Result;
use crate::geometry::{Dimension, Rect};
use crate::pixel::PixelFormat;
use crate::window::WindowHandle;

pub use direct2d::Direct2dSection;
pub use gdi::GdiSection;

// ── RenderMode ───────────────────────────────────────────────────

/// Which engine variant is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// GDI DIB section. Always available, maximal compatibility.
    #[default]
    Software,
    /// Direct2D, hardware accelerated where the driver allows it.
    Hardware,
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderMode::Software => write!(f, "software"),
            RenderMode::Hardware => write!(f, "hardware"),
        }
    }
}

// ── CaptureMode ──────────────────────────────────────────────────

/// What a screen capture includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureMode {
    /// Plain copy of the composed screen.
    Opaque,
    /// Also include layered (transparent) windows.
    IncludeLayered,
}

// ── Interpolation ────────────────────────────────────────────────

/// Sampling used when presenting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interpolation {
    NearestNeighbor,
    Linear,
}

impl Interpolation {
    /// Nearest neighbour for 1:1 presents, linear for real scaling.
    pub fn for_scale(src: &Rect, dst: &Rect) -> Self {
        if src.width() == dst.width() && src.height() == dst.height() {
            Interpolation::NearestNeighbor
        } else {
            Interpolation::Linear
        }
    }
}

/// `rect` clipped to a buffer of `dimension`, `None` if nothing is left.
///
/// Both engines clip every present source this way before blitting.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn clip_to_buffer(rect: &Rect, dimension: Dimension) -> Option<Rect> {
    rect.intersection(&dimension.to_rect())
}

// ── EngineSpec ───────────────────────────────────────────────────

/// Everything an engine needs to build its resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSpec {
    format: PixelFormat,
    /// Always at least 1×1.
    dimension: Dimension,
    window: WindowHandle,
}

impl EngineSpec {
    /// Degenerate dimensions are raised to 1×1 rather than rejected.
    pub fn new(format: PixelFormat, dimension: Dimension, window: WindowHandle) -> Self {
        Self {
            format,
            dimension: dimension.clamped(),
            window,
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn window(&self) -> WindowHandle {
        self.window
    }

    /// Size of the pixel buffer the engine must expose.
    pub fn buffer_len(&self) -> usize {
        self.dimension.area() * self.format.bytes_per_pixel()
    }
}

// ── RenderEngine ─────────────────────────────────────────────────

/// Uniform contract of both engine variants.
///
/// An engine is built by its [`RenderBackend`]; a constructed engine
/// exposes a buffer of [`EngineSpec::buffer_len`] bytes that stays the
/// same object until [`release`](Self::release).
pub trait RenderEngine {
    /// The variant this engine implements.
    fn mode(&self) -> RenderMode;

    /// The pixel memory remote updates are written into.
    fn buffer(&self) -> &SharedBuffer;

    /// Pull on-screen content at `rect` into the buffer.
    fn capture(&mut self, rect: &Rect, mode: CaptureMode) -> Result<()>;

    /// Push the buffer at `rect` to the target window, 1:1.
    fn present(&mut self, rect: &Rect) -> Result<()>;

    /// Push `src` of the buffer to `dst` of the window, scaled.
    fn present_scaled(&mut self, src: &Rect, dst: &Rect) -> Result<()>;

    /// Adapt presentation resources to a new window size. The buffer
    /// keeps its logical dimension.
    fn resize(&mut self, rect: &Rect) -> Result<()>;

    /// Release every resource in reverse acquisition order. Idempotent.
    fn release(&mut self);
}

// ── RenderBackend ────────────────────────────────────────────────

/// Factory for the two engine variants plus the hardware probe.
pub trait RenderBackend {
    type Software: RenderEngine;
    type Hardware: RenderEngine;

    /// Whether the hardware engine can be used on this system at all.
    fn hardware_available(&self) -> bool;

    fn create_software(&self, spec: &EngineSpec) -> Result<Self::Software>;

    fn create_hardware(&self, spec: &EngineSpec) -> Result<Self::Hardware>;
}

/// GDI for software, Direct2D for hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32Backend;

impl RenderBackend for Win32Backend {
    type Software = GdiSection;
    type Hardware = Direct2dSection;

    fn hardware_available(&self) -> bool {
        direct2d::is_available()
    }

    fn create_software(&self, spec: &EngineSpec) -> Result<GdiSection> {
        GdiSection::new(spec)
    }

    fn create_hardware(&self, spec: &EngineSpec) -> Result<Direct2dSection> {
        Direct2dSection::new(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_clamps_dimension() {
        let spec = EngineSpec::new(PixelFormat::BGRX32, Dimension::new(0, -4), WindowHandle::NULL);
        assert_eq!(spec.dimension(), Dimension::new(1, 1));
        assert_eq!(spec.buffer_len(), 4);
    }

    #[test]
    fn interpolation_policy() {
        let a = Rect::new(0, 0, 100, 100);
        assert_eq!(
            Interpolation::for_scale(&a, &a.translated(10, 10)),
            Interpolation::NearestNeighbor
        );
        assert_eq!(
            Interpolation::for_scale(&a, &Rect::new(0, 0, 200, 100)),
            Interpolation::Linear
        );
    }

    #[test]
    fn present_source_is_clipped_to_buffer() {
        let dim = Dimension::new(64, 48);
        assert_eq!(
            clip_to_buffer(&Rect::new(-10, 40, 100, 100), dim),
            Some(Rect::new(0, 40, 64, 48))
        );
        assert_eq!(clip_to_buffer(&Rect::new(64, 0, 80, 10), dim), None);
        assert_eq!(clip_to_buffer(&dim.to_rect(), dim), Some(dim.to_rect()));
    }

    #[test]
    fn render_mode_serde_names() {
        #[derive(Serialize, Deserialize)]
        struct Wrap {
            mode: RenderMode,
        }
        let text = toml::to_string(&Wrap {
            mode: RenderMode::Hardware,
        })
        .unwrap();
        assert!(text.contains("\"hardware\""));
        let back: Wrap = toml::from_str("mode = \"software\"").unwrap();
        assert_eq!(back.mode, RenderMode::Software);
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn win32_backend_is_unavailable_off_windows() {
        let backend = Win32Backend;
        let spec = EngineSpec::new(PixelFormat::BGRX32, Dimension::new(8, 8), WindowHandle::NULL);
        assert!(!backend.hardware_available());
        assert!(backend.create_software(&spec).is_err());
        assert!(backend.create_hardware(&spec).is_err());
    }
}
