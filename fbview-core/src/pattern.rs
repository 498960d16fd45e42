//! Diagnostic test pattern: eight vertical colour bars with a crosshair
//! at the centre.

use crate::error::Result;
use crate::geometry::Rect;
use crate::surface::PixelSurface;

/// Bar colours, left to right.
pub const BARS: [(u8, u8, u8); 8] = [
    (255, 255, 255),
    (255, 255, 0),
    (0, 255, 255),
    (0, 255, 0),
    (255, 0, 255),
    (255, 0, 0),
    (0, 0, 255),
    (0, 0, 0),
];

/// Half-length of each crosshair arm in pixels.
pub const CROSSHAIR_ARM: i32 = 10;

/// Fill the whole surface with the bar pattern and mark its centre.
pub fn draw_test_pattern(surface: &mut PixelSurface) -> Result<()> {
    let dim = surface.dimension();
    let format = surface.pixel_format();
    let bar_width = (dim.width / BARS.len() as i32).max(1);

    for (i, &(r, g, b)) in BARS.iter().enumerate() {
        let left = i as i32 * bar_width;
        let right = if i == BARS.len() - 1 {
            dim.width
        } else {
            left + bar_width
        };
        surface.fill_rect(&Rect::new(left, 0, right, dim.height), format.pack_rgb(r, g, b))?;
    }

    // grey shows up on every bar
    let marker = format.pack_rgb(128, 128, 128);
    draw_crosshair(surface, dim.width / 2, dim.height / 2, marker)
}

/// Draw a one-pixel crosshair centred on `(x, y)`. Arms are clipped to
/// the surface.
pub fn draw_crosshair(surface: &mut PixelSurface, x: i32, y: i32, color: u32) -> Result<()> {
    surface.fill_rect(&Rect::new(x - CROSSHAIR_ARM, y, x + CROSSHAIR_ARM + 1, y + 1), color)?;
    surface.fill_rect(&Rect::new(x, y - CROSSHAIR_ARM, x + 1, y + CROSSHAIR_ARM + 1), color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Dimension;
    use crate::pixel::PixelFormat;
    use crate::surface::OwnedSurface;

    fn pixel(surface: &OwnedSurface, x: i32, y: i32) -> u32 {
        let offset = surface.pixel_offset(x, y).unwrap();
        surface
            .memory()
            .with_bytes(|b| u32::from_le_bytes(b[offset..offset + 4].try_into().unwrap()))
            .unwrap()
    }

    #[test]
    fn bars_cover_the_surface() {
        let mut surface = OwnedSurface::new(Dimension::new(64, 32), PixelFormat::BGRX32);
        draw_test_pattern(&mut surface).unwrap();

        assert_eq!(pixel(&surface, 0, 0), 0x00FF_FFFF);
        assert_eq!(pixel(&surface, 8, 0), 0x00FF_FF00);
        assert_eq!(pixel(&surface, 63, 31), 0);
    }

    #[test]
    fn crosshair_marks_centre() {
        let mut surface = OwnedSurface::new(Dimension::new(64, 32), PixelFormat::BGRX32);
        draw_test_pattern(&mut surface).unwrap();

        let grey = PixelFormat::BGRX32.pack_rgb(128, 128, 128);
        assert_eq!(pixel(&surface, 32, 16), grey);
        assert_eq!(pixel(&surface, 32 - CROSSHAIR_ARM, 16), grey);
        assert_eq!(pixel(&surface, 32, 16 + CROSSHAIR_ARM), grey);
        assert_ne!(pixel(&surface, 33, 17), grey);
    }

    #[test]
    fn narrow_surface_still_draws() {
        let mut surface = OwnedSurface::new(Dimension::new(3, 2), PixelFormat::RGB565);
        draw_test_pattern(&mut surface).unwrap();
    }

    #[test]
    fn unbacked_surface_fails() {
        let mut surface = PixelSurface::with_properties(Dimension::new(8, 8), PixelFormat::BGRX32);
        assert!(draw_test_pattern(&mut surface).is_err());
    }
}
