//! Alpha compositing of label glyphs onto the output page.

use image::{RgbImage, RgbaImage};

use crate::error::PageError;

/// Blend an RGBA glyph onto the page at `(x, y)`.
///
/// Per pixel, the glyph's alpha modulated by `opacity` weighs the
/// glyph color against the page color; fully transparent glyph pixels
/// leave the page untouched. Fails with
/// [`PageError::InvalidComposite`] when the glyph does not lie fully
/// inside the page.
pub fn overlay_rgba(
    page: &mut RgbImage,
    glyph: &RgbaImage,
    x: i32,
    y: i32,
    opacity: f32,
) -> Result<(), PageError> {
    let (pw, ph) = page.dimensions();
    let (gw, gh) = glyph.dimensions();
    if x < 0 || y < 0 || x as u32 + gw > pw || y as u32 + gh > ph {
        return Err(PageError::InvalidComposite {
            x,
            y,
            width: gw,
            height: gh,
            page_width: pw,
            page_height: ph,
        });
    }

    for gy in 0..gh {
        for gx in 0..gw {
            let src = glyph.get_pixel(gx, gy).0;
            let alpha = src[3];
            if alpha == 0 {
                continue;
            }
            let factor = (alpha as f32 / 255.0) * opacity;
            let dst = page.get_pixel_mut(x as u32 + gx, y as u32 + gy);
            for c in 0..3 {
                let blended = src[c] as f32 * factor + dst.0[c] as f32 * (1.0 - factor);
                dst.0[c] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    #[test]
    fn opaque_glyph_replaces_page_pixels() {
        let mut page = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
        let glyph = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
        overlay_rgba(&mut page, &glyph, 3, 4, 1.0).expect("in bounds");
        assert_eq!(page.get_pixel(3, 4).0, [10, 20, 30]);
        assert_eq!(page.get_pixel(2, 4).0, [255, 255, 255]);
    }

    #[test]
    fn transparent_pixels_leave_page_untouched() {
        let mut page = RgbImage::from_pixel(4, 4, Rgb([100, 100, 100]));
        let glyph = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        overlay_rgba(&mut page, &glyph, 0, 0, 1.0).expect("in bounds");
        assert_eq!(page.get_pixel(0, 0).0, [100, 100, 100]);
    }

    #[test]
    fn opacity_halves_the_blend() {
        let mut page = RgbImage::from_pixel(1, 1, Rgb([200, 200, 200]));
        let glyph = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        overlay_rgba(&mut page, &glyph, 0, 0, 0.5).expect("in bounds");
        assert_eq!(page.get_pixel(0, 0).0, [100, 100, 100]);
    }

    #[test]
    fn out_of_bounds_composite_is_an_error() {
        let mut page = RgbImage::new(8, 8);
        let glyph = RgbaImage::new(4, 4);
        assert!(matches!(
            overlay_rgba(&mut page, &glyph, 6, 0, 1.0),
            Err(PageError::InvalidComposite { .. })
        ));
        assert!(matches!(
            overlay_rgba(&mut page, &glyph, -1, 0, 1.0),
            Err(PageError::InvalidComposite { .. })
        ));
    }
}
