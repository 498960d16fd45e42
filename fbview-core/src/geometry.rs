//! Rectangles and dimensions in frame buffer pixel coordinates.

use serde::{Deserialize, Serialize};

// ── Rect ─────────────────────────────────────────────────────────

/// An axis-aligned rectangle, `right` and `bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Build from an origin and a size.
    pub const fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub const fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub const fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    /// `true` when the rectangle covers no pixels.
    pub const fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width() as i64 * self.height() as i64
        }
    }

    /// Move the rectangle by `(dx, dy)`.
    pub const fn translated(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }

    /// [`translated`](Self::translated), `None` if any edge overflows.
    pub fn checked_translated(&self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self::new(
            self.left.checked_add(dx)?,
            self.top.checked_add(dy)?,
            self.right.checked_add(dx)?,
            self.bottom.checked_add(dy)?,
        ))
    }

    /// Overlap of two rectangles, `None` if they do not intersect.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let r = Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        (!r.is_empty()).then_some(r)
    }

    pub fn size(&self) -> Dimension {
        Dimension::new(self.width(), self.height())
    }
}

// ── Dimension ────────────────────────────────────────────────────

/// Width and height of a surface in pixels.
///
/// Signed on purpose: callers hand over whatever the window system
/// reported, including zero or negative sizes for minimised windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimension {
    pub width: i32,
    pub height: i32,
}

impl Dimension {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// The same dimension with each axis raised to at least one pixel.
    ///
    /// GDI and Direct2D both reject zero-sized surfaces.
    pub fn clamped(&self) -> Self {
        Self::new(self.width.max(1), self.height.max(1))
    }

    /// Number of pixels, zero for degenerate sizes.
    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width as usize * self.height as usize
        }
    }

    /// The rectangle `(0, 0) – (width, height)`.
    pub const fn to_rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
}

impl From<Rect> for Dimension {
    fn from(rect: Rect) -> Self {
        rect.size()
    }
}
