//! Staff-line detection and grid-spacing estimation.
//!
//! Works on the binarized page. Staff lines are the only near-full
//! width horizontal structures on a score page, so detection scans
//! each row for unbroken foreground runs of at least 70% of the page
//! width (zero gap tolerance). A physical line a few pixels thick
//! produces one detection per row; the cluster pass keeps the topmost
//! detection of each physical line by dropping every segment whose y
//! lies within `max(rows/200, 1)` pixels of the previously kept one.
//!
//! Grid spacing is estimated with a single greedy pass over the sorted
//! line ys: a running reference delta plus run length, reset whenever
//! a new delta deviates by more than 20% relative. Four consecutive
//! agreeing deltas pin down one staff; their average is the grid
//! height and the run start is the first staff line of the page.

use image::GrayImage;
use log::debug;

use crate::error::{PageError, MIN_STAFF_LINES};
use crate::geometry::Segment;

/// Minimum line length as a fraction of page width.
const MIN_LINE_WIDTH_FRACTION: f32 = 0.7;

/// Maximum deviation from horizontal, in degrees.
const HORIZONTAL_TOL_DEG: f32 = 10.0;

/// Relative tolerance for two line spacings to count as equal.
const DELTA_TOLERANCE: f32 = 0.2;

/// Number of consecutive agreeing spacings that pin down a staff.
const STABLE_RUN: usize = 4;

/// Detected staff geometry of one page.
#[derive(Clone, Debug)]
pub struct StaffLayout {
    /// Surviving horizontal lines, sorted by top y.
    pub lines: Vec<Segment>,
    /// Vertical spacing between adjacent staff lines.
    pub grid_height: f32,
    /// Index into `lines` of the first line of the first staff.
    pub first_line_idx: usize,
}

impl StaffLayout {
    /// Top-line y of every staff: every 5th line starting at
    /// `first_line_idx`.
    pub fn staff_tops(&self) -> Vec<i32> {
        self.lines[self.first_line_idx..]
            .iter()
            .step_by(5)
            .map(|line| line.top_y())
            .collect()
    }
}

/// Detect the staff lines of a binarized page and estimate the grid
/// spacing.
pub fn detect_staff_lines(bin: &GrayImage) -> Result<StaffLayout, PageError> {
    let min_len = (bin.width() as f32 * MIN_LINE_WIDTH_FRACTION) as u32;
    let segments = scan_horizontal_runs(bin, min_len);
    debug!("lines num: {}", segments.len());

    let mut lines: Vec<Segment> = segments
        .into_iter()
        .filter(|seg| seg.is_near_horizontal(HORIZONTAL_TOL_DEG))
        .collect();
    debug!("horizontal lines num: {}", lines.len());

    lines.sort_by_key(Segment::top_y);
    let y_threshold = ((bin.height() / 200).max(1)) as i32;
    let lines = dedup_lines(lines, y_threshold);
    debug!("deduplicated lines num: {}", lines.len());

    if lines.len() < MIN_STAFF_LINES {
        return Err(PageError::StaffNotFound { found: lines.len() });
    }

    let ys: Vec<i32> = lines.iter().map(Segment::top_y).collect();
    let (grid_height, first_line_idx) =
        estimate_grid(&ys).ok_or(PageError::GridHeightUndetermined)?;
    debug!("grid_height: {grid_height}, first_line_idx: {first_line_idx}");

    Ok(StaffLayout {
        lines,
        grid_height,
        first_line_idx,
    })
}

/// Unbroken foreground runs of at least `min_len` pixels, one segment
/// per row that carries one.
fn scan_horizontal_runs(bin: &GrayImage, min_len: u32) -> Vec<Segment> {
    let mut segments = Vec::new();
    for (y, row) in bin.rows().enumerate() {
        let mut run_start: Option<usize> = None;
        for (x, px) in row.enumerate() {
            if px.0[0] != 0 {
                run_start.get_or_insert(x);
            } else if let Some(start) = run_start.take() {
                if (x - start) as u32 >= min_len {
                    segments.push(Segment::horizontal(start as i32, x as i32 - 1, y as i32));
                }
            }
        }
        if let Some(start) = run_start {
            let end = bin.width() as usize;
            if (end - start) as u32 >= min_len {
                segments.push(Segment::horizontal(start as i32, end as i32 - 1, y as i32));
            }
        }
    }
    segments
}

/// Drop every segment whose y lies within `threshold` pixels of the
/// last kept segment's y. Input must be sorted by top y; the lowest-y
/// member of each cluster survives.
fn dedup_lines(lines: Vec<Segment>, threshold: i32) -> Vec<Segment> {
    let mut kept: Vec<Segment> = Vec::with_capacity(lines.len());
    for line in lines {
        match kept.last() {
            Some(last) if line.top_y() <= last.top_y() + threshold => {}
            _ => kept.push(line),
        }
    }
    kept
}

/// One greedy pass over consecutive y-deltas; returns the grid height
/// and the index of the first line of the stable run.
fn estimate_grid(ys: &[i32]) -> Option<(f32, usize)> {
    let mut last_diff = (ys[1] - ys[0]) as f32;
    let mut count = 1usize;
    let mut sum = last_diff;
    for i in 2..ys.len() {
        let delta = (ys[i] - ys[i - 1]) as f32;
        if (last_diff - delta).abs() / last_diff <= DELTA_TOLERANCE {
            count += 1;
            sum += delta;
        } else {
            last_diff = delta;
            sum = delta;
            count = 1;
        }
        if count >= STABLE_RUN {
            return Some((sum / STABLE_RUN as f32, i - STABLE_RUN));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horizontal(y: i32) -> Segment {
        Segment::horizontal(0, 100, y)
    }

    #[test]
    fn dedup_keeps_lowest_y_of_each_cluster() {
        let lines = vec![
            horizontal(10),
            horizontal(11),
            horizontal(12),
            horizontal(30),
            horizontal(30),
            horizontal(33),
        ];
        let kept = dedup_lines(lines, 2);
        let ys: Vec<i32> = kept.iter().map(Segment::top_y).collect();
        assert_eq!(ys, vec![10, 30, 33]);
    }

    #[test]
    fn dedup_with_no_duplicates_is_identity() {
        let lines: Vec<Segment> = (0..5).map(|i| horizontal(i * 20)).collect();
        let kept = dedup_lines(lines.clone(), 2);
        assert_eq!(kept, lines);
    }

    #[test]
    fn estimate_grid_finds_a_stable_run() {
        // One staff with spacing 20 after two stray lines.
        let ys = [0, 7, 40, 60, 80, 100, 120];
        let (grid, first) = estimate_grid(&ys).expect("stable run exists");
        assert_eq!(grid, 20.0);
        assert_eq!(first, 2);
    }

    #[test]
    fn estimate_grid_tolerates_twenty_percent_jitter() {
        let ys = [0, 20, 38, 60, 81];
        let (grid, first) = estimate_grid(&ys).expect("jittered run accepted");
        assert_eq!(first, 0);
        assert!((grid - 20.25).abs() < 1e-3, "grid={grid}");
    }

    #[test]
    fn estimate_grid_fails_without_a_stable_run() {
        let ys = [0, 10, 30, 70, 150, 310];
        assert!(estimate_grid(&ys).is_none());
    }

    #[test]
    fn staff_tops_take_every_fifth_line() {
        let lines: Vec<Segment> = [0, 20, 40, 60, 80, 200, 220, 240, 260, 280]
            .iter()
            .map(|&y| horizontal(y))
            .collect();
        let layout = StaffLayout {
            lines,
            grid_height: 20.0,
            first_line_idx: 0,
        };
        assert_eq!(layout.staff_tops(), vec![0, 200]);
    }

    #[test]
    fn scan_requires_unbroken_runs() {
        let mut bin = GrayImage::new(100, 3);
        for x in 0..100 {
            bin.put_pixel(x, 0, image::Luma([255]));
        }
        // Row 1: a single-pixel gap splits the run below min length.
        for x in 0..100 {
            if x != 50 {
                bin.put_pixel(x, 1, image::Luma([255]));
            }
        }
        let segments = scan_horizontal_runs(&bin, 70);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].top_y(), 0);
    }

    #[test]
    fn too_few_lines_is_staff_not_found() {
        let bin = GrayImage::new(100, 50);
        match detect_staff_lines(&bin) {
            Err(PageError::StaffNotFound { found }) => assert_eq!(found, 0),
            other => panic!("expected StaffNotFound, got {other:?}"),
        }
    }
}
