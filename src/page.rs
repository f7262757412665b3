//! Per-page orchestration.
//!
//! Staff-line detection and note-candidate detection both consume the
//! same source image; their outputs meet in the placement engine. The
//! page-to-template scale factor is estimated first by matching a
//! staff-reference template over a small range of scales.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use log::debug;

use crate::config::RunConfig;
use crate::error::PageError;
use crate::geometry::generate_step;
use crate::notes;
use crate::place::{place_labels, GlyphCache};
use crate::pool::WorkerPool;
use crate::raster::{binarize, global_max, match_template};
use crate::staff::detect_staff_lines;

/// Number of scale-search intervals; 21 scales are probed.
const SCALE_SEARCH_SPLIT: usize = 20;

/// Search half-width around the configured sheet scale, relative.
const SCALE_SEARCH_SPREAD: f32 = 0.2;

/// Probe scales around `sheet_scale` and return the one whose resized
/// staff template correlates best with the page. Scales at which the
/// template no longer fits inside the page are skipped.
pub fn best_template_scale(
    page_bin: &GrayImage,
    staff_bin: &GrayImage,
    sheet_scale: f32,
) -> Result<f32, PageError> {
    let range = (
        sheet_scale * (1.0 - SCALE_SEARCH_SPREAD),
        sheet_scale * (1.0 + SCALE_SEARCH_SPREAD),
    );
    let mut best: Option<(f32, f32)> = None;
    for scale in generate_step(range, SCALE_SEARCH_SPLIT) {
        let w = (staff_bin.width() as f32 * scale).round() as u32;
        let h = (staff_bin.height() as f32 * scale).round() as u32;
        if w == 0 || h == 0 {
            continue;
        }
        let resized = imageops::resize(staff_bin, w, h, FilterType::Triangle);
        let Some(score) = match_template(page_bin, &resized) else {
            debug!("scale {scale}: template does not fit, skipped");
            continue;
        };
        if let Some((_, _, peak)) = global_max(&score) {
            if best.map_or(true, |(_, best_peak)| peak > best_peak) {
                best = Some((scale, peak));
            }
        }
    }
    match best {
        Some((scale, peak)) => {
            debug!("scale search: best {scale} (peak {peak:.4})");
            Ok(scale)
        }
        None => Err(PageError::Job(
            "staff template larger than page at every candidate scale".into(),
        )),
    }
}

/// Annotate one page: returns the labeled image. All stage failures
/// propagate; the caller decides whether to continue with other pages.
pub fn annotate_page(
    path: &Path,
    config: &RunConfig,
    pool: &WorkerPool,
    glyphs: &mut GlyphCache,
) -> Result<RgbImage, PageError> {
    let mut page = image::open(path)?.to_rgb8();
    let page_bin = binarize(&page);

    let staff_template = image::open(&config.staff_template)?.to_rgb8();
    let scale_factor = best_template_scale(&page_bin, &binarize(&staff_template), config.sheet_scale)?;
    debug!("detect scale_factor: {scale_factor}");

    let layout = detect_staff_lines(&page_bin)?;

    let templates = notes::list_templates(&config.template_dir)?;
    let candidates = notes::detect_candidates(
        pool,
        path,
        &templates,
        scale_factor,
        config.note_match_threshold,
        page.dimensions(),
    )?;

    place_labels(
        &mut page,
        &layout,
        &candidates,
        config.key_signature(),
        glyphs,
        scale_factor,
        config.font_scale,
        config.font_opacity,
    )?;
    Ok(page)
}
