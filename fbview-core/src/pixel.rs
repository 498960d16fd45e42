//! Pixel layout descriptions.

use serde::{Deserialize, Serialize};

// ── PixelFormat ──────────────────────────────────────────────────

/// True-colour pixel layout: storage size, byte order and where each
/// channel lives inside a pixel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelFormat {
    /// Storage size of one pixel: 8, 16 or 32.
    pub bits_per_pixel: u8,
    /// Number of meaningful bits.
    pub color_depth: u8,
    /// Multi-byte pixels are stored most significant byte first.
    pub big_endian: bool,
    pub red_max: u16,
    pub green_max: u16,
    pub blue_max: u16,
    pub red_shift: u8,
    pub green_shift: u8,
    pub blue_shift: u8,
}

impl PixelFormat {
    /// 32-bit little-endian `B, G, R, X` (GDI DIB and DXGI B8G8R8A8 layout).
    pub const BGRX32: PixelFormat = PixelFormat {
        bits_per_pixel: 32,
        color_depth: 24,
        big_endian: false,
        red_max: 255,
        green_max: 255,
        blue_max: 255,
        red_shift: 16,
        green_shift: 8,
        blue_shift: 0,
    };

    /// 16-bit little-endian 5-6-5.
    pub const RGB565: PixelFormat = PixelFormat {
        bits_per_pixel: 16,
        color_depth: 16,
        big_endian: false,
        red_max: 31,
        green_max: 63,
        blue_max: 31,
        red_shift: 11,
        green_shift: 5,
        blue_shift: 0,
    };

    /// Bytes consumed by a single pixel.
    pub const fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_pixel as usize).div_ceil(8)
    }

    /// Only byte-aligned storage sizes are supported.
    pub const fn is_supported(&self) -> bool {
        matches!(self.bits_per_pixel, 8 | 16 | 32)
    }

    /// 32-bit little-endian `B, G, R, X`: the only layout the Win32
    /// engines present.
    pub fn is_bgrx32(&self) -> bool {
        self.bits_per_pixel == 32
            && !self.big_endian
            && (self.red_max, self.green_max, self.blue_max) == (255, 255, 255)
            && (self.red_shift, self.green_shift, self.blue_shift) == (16, 8, 0)
    }

    /// Pack 8-bit channel intensities into a pixel value.
    pub fn pack_rgb(&self, r: u8, g: u8, b: u8) -> u32 {
        let scale = |v: u8, max: u16| (v as u32 * max as u32 + 127) / 255;
        (scale(r, self.red_max) << self.red_shift)
            | (scale(g, self.green_max) << self.green_shift)
            | (scale(b, self.blue_max) << self.blue_shift)
    }

    /// Serialise a pixel value into `out` (`bytes_per_pixel` bytes).
    pub fn write_pixel(&self, value: u32, out: &mut [u8]) {
        let bpp = self.bytes_per_pixel();
        let bytes = if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        if self.big_endian {
            out[..bpp].copy_from_slice(&bytes[4 - bpp..]);
        } else {
            out[..bpp].copy_from_slice(&bytes[..bpp]);
        }
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::BGRX32
    }
}
