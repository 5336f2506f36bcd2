//! Background color sampling
//!
//! The mask color is taken from a single sample pixel near the bottom-left
//! corner of the page, rendered at native resolution. Flat white or tinted
//! pages sample correctly; textured backgrounds at the sample point do not.

use super::types::{CleanError, Result};
use crate::document::raster::BASE_DPI;
use crate::document::{Color, Page, Rect};

/// Sample distance from the bottom edge: the pixel spans `[h - 10, h - 9]`
const SAMPLE_OFFSET: f32 = 10.0;

/// Sample edge length
const SAMPLE_SIZE: f32 = 1.0;

/// Sample rectangle for a page of the given height (page space)
pub fn sample_rect(page_height: f32) -> Rect {
    let top = page_height - SAMPLE_OFFSET;
    Rect::new(0.0, top, SAMPLE_SIZE, top + SAMPLE_SIZE)
}

/// Sample the page background color from the sample pixel
pub fn sample_background(page: &Page<'_>) -> Result<Color> {
    let area = sample_rect(page.height());
    let image = page.render(BASE_DPI, Some(&area))?;
    let pixel = image.get_pixel_checked(0, 0).ok_or(CleanError::EmptySample)?;
    Ok(Color::from_rgb8(pixel.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rect_position() {
        let area = sample_rect(792.0);
        assert_eq!(area, Rect::new(0.0, 782.0, 1.0, 783.0));
        assert_eq!(area.width(), 1.0);
        assert_eq!(area.height(), 1.0);
    }
}
