//! Foreground/background classification.
//!
//! Pixels are classified by an HSV band on OpenCV-style scales (hue
//! 0..=180, saturation 0..=255, value 0..=230): everything that is not
//! near-white counts as foreground. The hue and saturation bounds span
//! their full ranges, so only the value bound is live — the page is
//! printed ink on paper, and ink of any hue qualifies.

use image::{GrayImage, RgbImage};

/// Upper bound of the value channel; brighter pixels are background.
const VALUE_UPPER: u8 = 230;

/// Classify a decoded RGB page into a 0/255 foreground mask.
pub fn binarize(image: &RgbImage) -> GrayImage {
    let (w, h) = image.dimensions();
    let mut out = GrayImage::new(w, h);
    for (src, dst) in image.pixels().zip(out.pixels_mut()) {
        let [r, g, b] = src.0;
        // HSV value channel is max(R, G, B).
        let value = r.max(g).max(b);
        dst.0 = [if value <= VALUE_UPPER { 255 } else { 0 }];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn dark_ink_is_foreground_white_paper_is_not() {
        let mut img = RgbImage::from_pixel(4, 1, Rgb([255, 255, 255]));
        img.put_pixel(0, 0, Rgb([0, 0, 0])); // black ink
        img.put_pixel(1, 0, Rgb([180, 30, 30])); // dark red ink
        img.put_pixel(2, 0, Rgb([235, 235, 235])); // near-white paper

        let bin = binarize(&img);
        assert_eq!(bin.get_pixel(0, 0).0[0], 255);
        assert_eq!(bin.get_pixel(1, 0).0[0], 255);
        assert_eq!(bin.get_pixel(2, 0).0[0], 0);
        assert_eq!(bin.get_pixel(3, 0).0[0], 0);
    }

    #[test]
    fn value_bound_is_inclusive() {
        let img = RgbImage::from_pixel(1, 1, Rgb([230, 230, 230]));
        assert_eq!(binarize(&img).get_pixel(0, 0).0[0], 255);
    }
}
