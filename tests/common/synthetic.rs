//! Synthetic page, template, and label-art builders shared by the
//! integration tests.

use std::path::PathBuf;

use image::{Rgb, RgbImage, Rgba, RgbaImage};

pub const PAPER: Rgb<u8> = Rgb([255, 255, 255]);
pub const INK: Rgb<u8> = Rgb([0, 0, 0]);

/// Fresh per-test scratch directory under the system temp dir.
pub fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("staffnote-test-{}-{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

/// Blank white page.
pub fn blank_page(w: u32, h: u32) -> RgbImage {
    RgbImage::from_pixel(w, h, PAPER)
}

/// Full-width horizontal ink line of the given thickness.
pub fn draw_line(page: &mut RgbImage, y: u32, thickness: u32) {
    for yy in y..(y + thickness).min(page.height()) {
        for x in 0..page.width() {
            page.put_pixel(x, yy, INK);
        }
    }
}

/// One five-line staff with the given grid spacing.
pub fn draw_staff(page: &mut RgbImage, top_y: u32, grid: u32, thickness: u32) {
    for i in 0..5 {
        draw_line(page, top_y + i * grid, thickness);
    }
}

/// Filled ink rectangle, e.g. a note head.
pub fn draw_blob(page: &mut RgbImage, x: u32, y: u32, w: u32, h: u32) {
    for yy in y..(y + h).min(page.height()) {
        for xx in x..(x + w).min(page.width()) {
            page.put_pixel(xx, yy, INK);
        }
    }
}

/// Note-glyph template: a solid ink rectangle on white.
pub fn note_template(w: u32, h: u32) -> RgbImage {
    let mut tpl = RgbImage::from_pixel(w, h, PAPER);
    draw_blob(&mut tpl, 0, 0, w, h);
    tpl
}

/// Staff-reference template: five lines at the given grid spacing on
/// a white background, sized to one staff system.
pub fn staff_template(w: u32, grid: u32, thickness: u32) -> RgbImage {
    let h = 4 * grid + thickness + 6;
    let mut tpl = RgbImage::from_pixel(w, h, PAPER);
    for i in 0..5 {
        draw_line(&mut tpl, 3 + i * grid, thickness);
    }
    tpl
}

/// Opaque single-color label glyph.
pub fn label_glyph(w: u32, h: u32, color: [u8; 3]) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([color[0], color[1], color[2], 255]))
}
