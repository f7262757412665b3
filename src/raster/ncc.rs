//! Normalized cross-correlation template scoring.
//!
//! Computes the `TM_CCORR_NORMED` score surface: for every placement
//! of the template inside the image, the dot product of the two
//! windows divided by the geometric mean of their energies. Scores lie
//! in `[0, 1]` for non-negative inputs, with 1 at a perfect match.
//!
//! Window energies of the image are taken from a summed-area table so
//! a scan costs O(W·H·tw·th) for the dot products alone; rows of the
//! output are scored in parallel.

use image::GrayImage;
use rayon::prelude::*;

/// Dense score surface of size `(iw - tw + 1) × (ih - th + 1)`.
#[derive(Clone, Debug)]
pub struct ScoreMap {
    pub w: usize,
    pub h: usize,
    pub data: Vec<f32>,
}

impl ScoreMap {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.w + x]
    }
}

/// Score every placement of `template` inside `image`.
///
/// Both inputs are single-channel; values are normalized to `[0, 1]`
/// before correlation. Returns `None` when the template is empty or
/// does not fit inside the image.
pub fn match_template(image: &GrayImage, template: &GrayImage) -> Option<ScoreMap> {
    let (iw, ih) = (image.width() as usize, image.height() as usize);
    let (tw, th) = (template.width() as usize, template.height() as usize);
    if tw == 0 || th == 0 || tw > iw || th > ih {
        return None;
    }

    let img: Vec<f32> = image.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
    let tpl: Vec<f32> = template
        .as_raw()
        .iter()
        .map(|&v| v as f32 / 255.0)
        .collect();
    let tpl_energy: f64 = tpl.iter().map(|&v| (v * v) as f64).sum();

    // Summed-area table of squared image values, one extra row/column
    // of zeros so window sums need no boundary cases.
    let mut sq = vec![0f64; (iw + 1) * (ih + 1)];
    for y in 0..ih {
        let mut row_acc = 0f64;
        for x in 0..iw {
            let v = img[y * iw + x] as f64;
            row_acc += v * v;
            sq[(y + 1) * (iw + 1) + (x + 1)] = sq[y * (iw + 1) + (x + 1)] + row_acc;
        }
    }
    let window_energy = |x: usize, y: usize| -> f64 {
        let s = |xx: usize, yy: usize| sq[yy * (iw + 1) + xx];
        s(x + tw, y + th) - s(x, y + th) - s(x + tw, y) + s(x, y)
    };

    let out_w = iw - tw + 1;
    let out_h = ih - th + 1;
    let mut data = vec![0f32; out_w * out_h];
    data.par_chunks_mut(out_w).enumerate().for_each(|(y, row)| {
        for (x, cell) in row.iter_mut().enumerate() {
            let mut dot = 0f32;
            for ty in 0..th {
                let img_row = &img[(y + ty) * iw + x..][..tw];
                let tpl_row = &tpl[ty * tw..][..tw];
                for (a, b) in img_row.iter().zip(tpl_row) {
                    dot += a * b;
                }
            }
            let denom = (tpl_energy * window_energy(x, y)).sqrt();
            *cell = if denom > 1e-12 {
                (dot as f64 / denom) as f32
            } else {
                0.0
            };
        }
    });

    Some(ScoreMap {
        w: out_w,
        h: out_h,
        data,
    })
}

/// True when `(x, y)` holds the maximum score within the square
/// neighborhood of the given radius, clamped at the borders. Ties with
/// a neighbor count as a maximum.
pub fn is_local_max(score: &ScoreMap, x: usize, y: usize, radius: usize) -> bool {
    let v = score.get(x, y);
    let x0 = x.saturating_sub(radius);
    let y0 = y.saturating_sub(radius);
    let x1 = (x + radius).min(score.w - 1);
    let y1 = (y + radius).min(score.h - 1);
    for yy in y0..=y1 {
        for xx in x0..=x1 {
            if score.get(xx, yy) > v {
                return false;
            }
        }
    }
    true
}

/// Location and value of the global score peak, `None` for an empty
/// surface.
pub fn global_max(score: &ScoreMap) -> Option<(usize, usize, f32)> {
    let mut best: Option<(usize, usize, f32)> = None;
    for y in 0..score.h {
        for x in 0..score.w {
            let v = score.get(x, y);
            if best.map_or(true, |(_, _, bv)| v > bv) {
                best = Some((x, y, v));
            }
        }
    }
    best
}
