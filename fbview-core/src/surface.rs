//! The pixel surface: a row-major raster view over engine-owned memory.
//!
//! A [`PixelSurface`] never allocates or frees the memory it draws into.
//! Its buffer is (re)pointed with [`PixelSurface::set_buffer`] by the
//! render coordinator whenever the active engine changes.
//!
//! All rectangle arguments are clipped against the bounds of every
//! surface involved; a rectangle clipped to nothing is a successful
//! no-op.

use std::ops::{Deref, DerefMut};
use std::rc::{Rc, Weak};

use crate::buffer::{BufferView, PixelBuffer, SharedBuffer};
use crate::error::{RenderError, Result};
use crate::geometry::{Dimension, Rect};
use crate::pixel::PixelFormat;

// ── PixelSurface ─────────────────────────────────────────────────

/// Pixel format, dimension and a non-owning view of the pixel memory.
#[derive(Debug, Clone)]
pub struct PixelSurface {
    view: BufferView,
    format: PixelFormat,
    dimension: Dimension,
}

impl Default for PixelSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl PixelSurface {
    /// An empty, unbacked surface.
    pub fn new() -> Self {
        Self {
            view: Weak::new(),
            format: PixelFormat::default(),
            dimension: Dimension::default(),
        }
    }

    /// An unbacked surface with the given layout.
    pub fn with_properties(dimension: Dimension, format: PixelFormat) -> Self {
        Self {
            view: Weak::new(),
            format,
            dimension,
        }
    }

    /// Change dimension and format without touching the buffer.
    pub fn set_properties_without_resize(&mut self, dimension: Dimension, format: PixelFormat) {
        self.dimension = dimension;
        self.format = format;
    }

    /// Point the surface at `buffer` (or at nothing). Never takes ownership.
    pub fn set_buffer(&mut self, buffer: Option<&SharedBuffer>) {
        self.view = buffer.map(Rc::downgrade).unwrap_or_default();
    }

    /// The current pixel memory, if it is still alive.
    pub fn buffer(&self) -> Option<SharedBuffer> {
        self.view.upgrade().filter(|b| !b.is_revoked())
    }

    pub fn is_backed(&self) -> bool {
        self.buffer().is_some()
    }

    /// `true` when the surface currently views exactly `buffer`.
    pub fn is_backed_by(&self, buffer: &SharedBuffer) -> bool {
        self.buffer().is_some_and(|b| Rc::ptr_eq(&b, buffer))
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    pub fn bits_per_pixel(&self) -> u8 {
        self.format.bits_per_pixel
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.format.bytes_per_pixel()
    }

    pub fn bytes_per_row(&self) -> usize {
        self.dimension.width.max(0) as usize * self.bytes_per_pixel()
    }

    pub fn buffer_size(&self) -> usize {
        self.bytes_per_row() * self.dimension.height.max(0) as usize
    }

    fn bounds(&self) -> Rect {
        self.dimension.to_rect()
    }

    /// Byte offset of pixel `(x, y)`, `None` outside the surface.
    pub fn pixel_offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.dimension.width || y >= self.dimension.height {
            return None;
        }
        Some(y as usize * self.bytes_per_row() + x as usize * self.bytes_per_pixel())
    }

    fn row_offset(&self, x: i32, y: i32) -> usize {
        y as usize * self.bytes_per_row() + x as usize * self.bytes_per_pixel()
    }

    /// The backing buffer, checked to be large enough for this surface.
    fn backing(&self) -> Result<SharedBuffer> {
        let buffer = self
            .buffer()
            .ok_or(RenderError::Uninitialized("surface has no pixel buffer"))?;
        if buffer.len() < self.buffer_size() {
            return Err(RenderError::InvalidOperation(
                "pixel buffer is smaller than the surface",
            ));
        }
        Ok(buffer)
    }

    fn check_format(&self, other: &PixelSurface) -> Result<()> {
        if self.format != other.format {
            return Err(RenderError::FormatMismatch(
                "source and destination surfaces use different pixel formats",
            ));
        }
        Ok(())
    }

    // ── Raster operations ────────────────────────────────────────

    /// Fill `rect` with `color` (a packed pixel value).
    pub fn fill_rect(&mut self, rect: &Rect, color: u32) -> Result<()> {
        let Some(r) = rect.intersection(&self.bounds()) else {
            return Ok(());
        };
        let buffer = self.backing()?;
        let bpp = self.bytes_per_pixel();
        let stride = self.bytes_per_row();
        let mut pixel = [0u8; 4];
        self.format.write_pixel(color, &mut pixel);

        let row_len = r.width() as usize * bpp;
        let first = self.row_offset(r.left, r.top);
        buffer.with_bytes_mut(|bytes| {
            for chunk in bytes[first..first + row_len].chunks_exact_mut(bpp) {
                chunk.copy_from_slice(&pixel[..bpp]);
            }
            for y in 1..r.height() as usize {
                let start = first + y * stride;
                bytes.copy_within(first..first + row_len, start);
            }
        })
    }

    /// Copy the rectangle at `(src_x, src_y)` of `src` into `dst_rect`.
    pub fn copy_from(
        &mut self,
        dst_rect: &Rect,
        src: &PixelSurface,
        src_x: i32,
        src_y: i32,
    ) -> Result<()> {
        self.check_format(src)?;
        let Some((d, sx, sy)) = clip_copy(dst_rect, self.bounds(), src_x, src_y, src.bounds())
        else {
            return Ok(());
        };
        let dst_buf = self.backing()?;
        let src_buf = src.backing()?;

        let row_len = d.width() as usize * self.bytes_per_pixel();
        let copy_rows = |dst: &mut [u8], source: &[u8]| {
            for y in 0..d.height() {
                let so = src.row_offset(sx, sy + y);
                let doff = self.row_offset(d.left, d.top + y);
                dst[doff..doff + row_len].copy_from_slice(&source[so..so + row_len]);
            }
        };

        if Rc::ptr_eq(&dst_buf, &src_buf) {
            let source = src_buf
                .snapshot()
                .ok_or(RenderError::Uninitialized("pixel buffer was released"))?;
            dst_buf.with_bytes_mut(|dst| copy_rows(dst, &source))
        } else {
            dst_buf.with_bytes_mut(|dst| src_buf.with_bytes(|source| copy_rows(dst, source)))?
        }
    }

    /// Copy the whole of `src`, starting at `(src_x, src_y)`, to the origin.
    pub fn copy_from_all(&mut self, src: &PixelSurface, src_x: i32, src_y: i32) -> Result<()> {
        let rect = self.bounds();
        self.copy_from(&rect, src, src_x, src_y)
    }

    /// Move the rectangle at `(src_x, src_y)` to `dst_rect` within this
    /// surface. Overlapping source and destination are handled.
    pub fn move_rect(&mut self, dst_rect: &Rect, src_x: i32, src_y: i32) -> Result<()> {
        let bounds = self.bounds();
        let Some((d, sx, sy)) = clip_copy(dst_rect, bounds, src_x, src_y, bounds) else {
            return Ok(());
        };
        let buffer = self.backing()?;
        let row_len = d.width() as usize * self.bytes_per_pixel();
        let rows: Vec<i32> = if sy < d.top {
            (0..d.height()).rev().collect()
        } else {
            (0..d.height()).collect()
        };
        buffer.with_bytes_mut(|bytes| {
            for y in rows {
                let so = self.row_offset(sx, sy + y);
                let doff = self.row_offset(d.left, d.top + y);
                bytes.copy_within(so..so + row_len, doff);
            }
        })
    }

    /// `true` when `dst_rect` of this surface equals the rectangle at
    /// `(src_x, src_y)` of `src`.
    pub fn cmp_from(
        &self,
        dst_rect: &Rect,
        src: &PixelSurface,
        src_x: i32,
        src_y: i32,
    ) -> Result<bool> {
        self.check_format(src)?;
        let Some((d, sx, sy)) = clip_copy(dst_rect, self.bounds(), src_x, src_y, src.bounds())
        else {
            return Ok(true);
        };
        let dst_buf = self.backing()?;
        let src_buf = src.backing()?;
        let row_len = d.width() as usize * self.bytes_per_pixel();

        dst_buf.with_bytes(|dst| {
            src_buf.with_bytes(|source| {
                (0..d.height()).all(|y| {
                    let so = src.row_offset(sx, sy + y);
                    let doff = self.row_offset(d.left, d.top + y);
                    dst[doff..doff + row_len] == source[so..so + row_len]
                })
            })
        })?
    }

    /// Copy pixels of `src` whose bit in `and_mask` is set.
    ///
    /// The mask holds one bit per source pixel, most significant bit
    /// first, each row padded to a whole byte (cursor shape layout).
    pub fn overlay(
        &mut self,
        dst_rect: &Rect,
        src: &PixelSurface,
        src_x: i32,
        src_y: i32,
        and_mask: &[u8],
    ) -> Result<()> {
        self.check_format(src)?;
        let mask_row = (src.dimension.width.max(0) as usize).div_ceil(8);
        if and_mask.len() < mask_row * src.dimension.height.max(0) as usize {
            return Err(RenderError::InvalidOperation(
                "overlay mask is shorter than the source surface",
            ));
        }
        let Some((d, sx, sy)) = clip_copy(dst_rect, self.bounds(), src_x, src_y, src.bounds())
        else {
            return Ok(());
        };
        let dst_buf = self.backing()?;
        let src_buf = src.backing()?;
        let bpp = self.bytes_per_pixel();

        let blend = |dst: &mut [u8], source: &[u8]| {
            for y in 0..d.height() {
                let my = (sy + y) as usize;
                for x in 0..d.width() {
                    let mx = (sx + x) as usize;
                    if and_mask[my * mask_row + mx / 8] & (0x80 >> (mx % 8)) == 0 {
                        continue;
                    }
                    let so = src.row_offset(sx + x, sy + y);
                    let doff = self.row_offset(d.left + x, d.top + y);
                    dst[doff..doff + bpp].copy_from_slice(&source[so..so + bpp]);
                }
            }
        };

        if Rc::ptr_eq(&dst_buf, &src_buf) {
            let source = src_buf
                .snapshot()
                .ok_or(RenderError::Uninitialized("pixel buffer was released"))?;
            dst_buf.with_bytes_mut(|dst| blend(dst, &source))
        } else {
            dst_buf.with_bytes_mut(|dst| src_buf.with_bytes(|source| blend(dst, source)))?
        }
    }

    /// Same layout and identical pixels.
    pub fn is_equal_to(&self, other: &PixelSurface) -> bool {
        if self.dimension != other.dimension || self.format != other.format {
            return false;
        }
        let (Ok(a), Ok(b)) = (self.backing(), other.backing()) else {
            return false;
        };
        let size = self.buffer_size();
        a.with_bytes(|x| b.with_bytes(|y| x[..size] == y[..size]))
            .and_then(|r| r)
            .unwrap_or(false)
    }
}

/// Clip a copy of `dst` from `(src_x, src_y)` against both bounds.
///
/// Returns the clipped destination and its matching source origin.
fn clip_copy(
    dst: &Rect,
    dst_bounds: Rect,
    src_x: i32,
    src_y: i32,
    src_bounds: Rect,
) -> Option<(Rect, i32, i32)> {
    let dx = src_x.checked_sub(dst.left)?;
    let dy = src_y.checked_sub(dst.top)?;
    let d = dst.intersection(&dst_bounds)?;
    let s = d.checked_translated(dx, dy)?.intersection(&src_bounds)?;
    let d = s.checked_translated(dx.checked_neg()?, dy.checked_neg()?)?;
    Some((d, s.left, s.top))
}

// ── OwnedSurface ─────────────────────────────────────────────────

/// A surface together with heap memory it views.
///
/// Used for scratch images (decoded rectangles, cursor shapes) that are
/// not tied to a render engine.
#[derive(Debug)]
pub struct OwnedSurface {
    buffer: SharedBuffer,
    surface: PixelSurface,
}

impl OwnedSurface {
    pub fn new(dimension: Dimension, format: PixelFormat) -> Self {
        let mut surface = PixelSurface::with_properties(dimension, format);
        let buffer = PixelBuffer::owned(surface.buffer_size());
        surface.set_buffer(Some(&buffer));
        Self { buffer, surface }
    }

    /// The heap memory this surface owns.
    pub fn memory(&self) -> &SharedBuffer {
        &self.buffer
    }
}

impl Deref for OwnedSurface {
    type Target = PixelSurface;

    fn deref(&self) -> &PixelSurface {
        &self.surface
    }
}

impl DerefMut for OwnedSurface {
    fn deref_mut(&mut self) -> &mut PixelSurface {
        &mut self.surface
    }
}
