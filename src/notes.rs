//! Note-candidate detection.
//!
//! Fans one match job per note-glyph template out over the worker
//! pool, merges the returned boxes, drops spatial duplicates (the same
//! physical note matched by several templates), and orders the
//! survivors in reading order.

use std::path::Path;

use log::debug;

use crate::error::PageError;
use crate::pool::protocol::MatchRequest;
use crate::pool::WorkerPool;
use crate::raster::OccupancyMask;

/// Axis-aligned box where a note-glyph template matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Candidate {
    #[inline]
    pub fn center_x(&self) -> i32 {
        self.x + self.width / 2
    }

    #[inline]
    pub fn center_y(&self) -> i32 {
        self.y + self.height / 2
    }
}

/// Dedup window half-side for a page scale: a square of roughly
/// 25 template-scaled pixels claims one note.
pub fn dedup_half_side(scale_factor: f32) -> i32 {
    (25.0 * scale_factor / 2.0).round() as i32
}

/// Note-glyph template file names in `dir`, sorted for deterministic
/// dispatch order.
pub fn list_templates(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| {
            Path::new(name)
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    matches!(
                        ext.to_ascii_lowercase().as_str(),
                        "png" | "jpg" | "jpeg" | "bmp"
                    )
                })
        })
        .collect();
    names.sort();
    Ok(names)
}

/// Detect note candidates on a page: concurrent per-template matching,
/// spatial deduplication, reading-order sort.
pub fn detect_candidates(
    pool: &WorkerPool,
    image_path: &Path,
    templates: &[String],
    scale_factor: f32,
    threshold: f32,
    page_dims: (u32, u32),
) -> Result<Vec<Candidate>, PageError> {
    let per_template: Vec<Result<Vec<[i32; 4]>, PageError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = templates
            .iter()
            .map(|name| {
                let request = MatchRequest {
                    image_path: image_path.to_path_buf(),
                    template_name: name.clone(),
                    scale_factor,
                    threshold,
                };
                scope.spawn(move || pool.dispatch(&request))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(_) => Err(PageError::Job("match thread panicked".into())),
            })
            .collect()
    });

    let mut merged = Vec::new();
    for boxes in per_template {
        for [x, y, width, height] in boxes? {
            merged.push(Candidate {
                x,
                y,
                width,
                height,
            });
        }
    }
    debug!("matched boxes: {}", merged.len());

    let half_side = dedup_half_side(scale_factor);
    let mut kept = dedup_candidates(&merged, page_dims, half_side);
    debug!("deduplicated candidates: {}", kept.len());

    sort_reading_order(&mut kept, half_side);
    Ok(kept)
}

/// Order-dependent greedy spatial filter: the first candidate to claim
/// a neighborhood wins; later candidates whose window already contains
/// a claimed center are dropped.
pub(crate) fn dedup_candidates(
    candidates: &[Candidate],
    page_dims: (u32, u32),
    half_side: i32,
) -> Vec<Candidate> {
    let mut claimed = OccupancyMask::new(page_dims.0, page_dims.1);
    let mut kept = Vec::with_capacity(candidates.len());
    for &candidate in candidates {
        let (cx, cy) = (candidate.center_x(), candidate.center_y());
        let side = half_side * 2 + 1;
        if claimed.any_marked(cx - half_side, cy - half_side, side, side) {
            debug!("note point ({cx}, {cy}) skip");
            continue;
        }
        claimed.mark(cx, cy);
        kept.push(candidate);
    }
    kept
}

/// Reading order: candidates whose x differs by less than `half_side`
/// count as the same column and sort by y; otherwise by ascending x.
pub(crate) fn sort_reading_order(candidates: &mut [Candidate], half_side: i32) {
    candidates.sort_by(|a, b| {
        if (a.x - b.x).abs() < half_side {
            a.y.cmp(&b.y)
        } else {
            a.x.cmp(&b.x)
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(x: i32, y: i32) -> Candidate {
        Candidate {
            x,
            y,
            width: 10,
            height: 10,
        }
    }

    #[test]
    fn nearby_duplicates_are_dropped_first_wins() {
        let candidates = vec![candidate(50, 50), candidate(54, 52), candidate(120, 50)];
        let kept = dedup_candidates(&candidates, (300, 200), 6);
        assert_eq!(kept, vec![candidate(50, 50), candidate(120, 50)]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let candidates = vec![
            candidate(10, 10),
            candidate(12, 11),
            candidate(80, 40),
            candidate(83, 44),
            candidate(200, 90),
        ];
        let once = dedup_candidates(&candidates, (300, 200), 6);
        let twice = dedup_candidates(&once, (300, 200), 6);
        assert_eq!(once, twice);
    }

    #[test]
    fn dedup_near_page_border_does_not_panic() {
        let candidates = vec![
            Candidate {
                x: -2,
                y: -2,
                width: 6,
                height: 6,
            },
            candidate(1, 1),
        ];
        let kept = dedup_candidates(&candidates, (100, 100), 6);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn reading_order_groups_near_equal_x_by_y() {
        let mut candidates = vec![candidate(100, 80), candidate(103, 20), candidate(40, 50)];
        sort_reading_order(&mut candidates, 6);
        assert_eq!(
            candidates,
            vec![candidate(40, 50), candidate(103, 20), candidate(100, 80)]
        );
    }

    #[test]
    fn distinct_columns_sort_by_x() {
        let mut candidates = vec![candidate(200, 10), candidate(50, 90), candidate(120, 50)];
        sort_reading_order(&mut candidates, 6);
        let xs: Vec<i32> = candidates.iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![50, 120, 200]);
    }
}
