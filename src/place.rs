//! Label placement.
//!
//! Maps each note candidate to its staff and scale-degree letter,
//! resolves the key-signature spelling, and composites the matching
//! label glyph next to the note. A page-sized occupancy mask records
//! every drawn footprint; the placement search walks down, up, then
//! left from the preferred position to dodge earlier labels, and after
//! 30 failed attempts accepts the last tried position regardless of
//! overlap. That fallback is deliberate best-effort: a crowded system
//! gets an overlapping label rather than none.

use std::collections::HashMap;
use std::path::PathBuf;

use image::imageops::{self, FilterType};
use image::{RgbImage, RgbaImage};
use log::debug;

use crate::error::PageError;
use crate::notes::Candidate;
use crate::raster::{overlay_rgba, OccupancyMask};
use crate::staff::StaffLayout;
use crate::tone::{calc_tune, map_note_with_tone, KeySignature};

/// Letters of consecutive scale degrees above the top line, low
/// (bass) staves.
const LOW_STAFF_LETTERS: [char; 7] = ['A', 'B', 'C', 'D', 'E', 'F', 'G'];

/// Same cycle for high (treble) staves.
const HIGH_STAFF_LETTERS: [char; 7] = ['F', 'G', 'A', 'B', 'C', 'D', 'E'];

/// Attempts per direction of the placement search.
const SEARCH_PHASE_LEN: i32 = 10;

/// Label art register: which subdirectory the glyph art lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Register {
    Low,
    High,
}

impl Register {
    fn dir_name(self) -> &'static str {
        match self {
            Register::Low => "low",
            Register::High => "high",
        }
    }
}

/// Pitch derived from a candidate's position on its staff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pitch {
    pub letter: char,
    pub is_high_staff: bool,
}

/// Assign a vertical center to the first staff whose capture window
/// `[top - 5·grid, top + 7·grid]` contains it, and read off the
/// scale-degree letter. `None` when no staff captures the center.
pub fn assign_pitch(center_y: i32, staff_tops: &[i32], grid_height: f32) -> Option<Pitch> {
    let (staff_idx, top_y) = staff_tops.iter().enumerate().find(|&(_, &top)| {
        let y = center_y as f32;
        y >= top as f32 - 5.0 * grid_height && y <= top as f32 + 7.0 * grid_height
    })?;

    let raw = (((*top_y - center_y) as f32 / grid_height) * 2.0).round() as i32;
    let offset = normalize_degree_offset(raw);
    let is_high_staff = staff_idx % 2 == 0;
    let letter = if is_high_staff {
        HIGH_STAFF_LETTERS[offset]
    } else {
        LOW_STAFF_LETTERS[offset]
    };
    Some(Pitch {
        letter,
        is_high_staff,
    })
}

/// Fold a raw scale-degree offset into `[0, 7)` by repeated ±7.
pub(crate) fn normalize_degree_offset(raw: i32) -> usize {
    let mut offset = raw;
    while offset < 0 {
        offset += 7;
    }
    while offset >= 7 {
        offset -= 7;
    }
    offset as usize
}

/// Per-scale cache of label glyphs, lazily loaded from the label art
/// directory and resized on first use at a given scale.
pub struct GlyphCache {
    label_dir: PathBuf,
    glyphs: HashMap<(Register, String, u32), RgbaImage>,
}

/// Scales hash by their rounded per-mille value.
fn scale_key(scale: f32) -> u32 {
    (scale * 1000.0).round() as u32
}

impl GlyphCache {
    pub fn new(label_dir: PathBuf) -> Self {
        Self {
            label_dir,
            glyphs: HashMap::new(),
        }
    }

    /// Glyph for `name` in `register` at `scale`, rendered and cached
    /// on first use.
    pub fn get(
        &mut self,
        name: &str,
        register: Register,
        scale: f32,
    ) -> Result<&RgbaImage, PageError> {
        let key = (register, name.to_string(), scale_key(scale));
        if !self.glyphs.contains_key(&key) {
            let base = self.base_glyph(name, register)?;
            let scaled = if scale_key(scale) == scale_key(1.0) {
                base
            } else {
                let w = (base.width() as f32 * scale).round().max(1.0) as u32;
                let h = (base.height() as f32 * scale).round().max(1.0) as u32;
                imageops::resize(&base, w, h, FilterType::Triangle)
            };
            self.glyphs.insert(key.clone(), scaled);
        }
        Ok(&self.glyphs[&key])
    }

    fn base_glyph(&mut self, name: &str, register: Register) -> Result<RgbaImage, PageError> {
        let key = (register, name.to_string(), scale_key(1.0));
        if let Some(base) = self.glyphs.get(&key) {
            return Ok(base.clone());
        }
        let path = self
            .label_dir
            .join(register.dir_name())
            .join(format!("{name}.png"));
        let base = image::open(&path)?.to_rgba8();
        self.glyphs.insert(key, base.clone());
        Ok(base)
    }
}

/// Find a position for a label whose footprint is the candidate box,
/// starting glyph-width left of the candidate. Never fails: after 30
/// failed attempts the last tried position is returned even if it
/// overlaps or hangs off the page.
pub(crate) fn search_position(
    mask: &OccupancyMask,
    candidate: &Candidate,
    glyph_width: i32,
    step_unit: i32,
) -> (i32, i32) {
    let mut x = 0;
    let mut y = 0;
    let mut try_count = 0i32;
    loop {
        if try_count % SEARCH_PHASE_LEN == 0 {
            x = candidate.x - glyph_width;
            y = candidate.y;
        }

        if mask.is_clear(x, y, candidate.width, candidate.height) {
            break;
        }

        if try_count <= SEARCH_PHASE_LEN {
            y += step_unit;
        } else if try_count <= 2 * SEARCH_PHASE_LEN {
            y -= step_unit;
        } else if try_count <= 3 * SEARCH_PHASE_LEN {
            x -= step_unit;
        } else {
            debug!(
                "placement for ({}, {}) kept overlapping position after {} attempts",
                candidate.x, candidate.y, try_count
            );
            break;
        }
        try_count += 1;
    }
    (x, y)
}

/// Annotate a page in place: one label per candidate that maps to a
/// staff.
pub fn place_labels(
    page: &mut RgbImage,
    layout: &StaffLayout,
    candidates: &[Candidate],
    key: KeySignature,
    glyphs: &mut GlyphCache,
    scale_factor: f32,
    font_scale: f32,
    font_opacity: f32,
) -> Result<(), PageError> {
    let staff_tops = layout.staff_tops();
    let tonic = calc_tune(key.direction, key.count);
    let step_unit = (10.0 * scale_factor).round() as i32;
    let mut drawn = OccupancyMask::new(page.width(), page.height());

    for candidate in candidates {
        let Some(pitch) = assign_pitch(candidate.center_y(), &staff_tops, layout.grid_height)
        else {
            continue;
        };
        let Some(name) = map_note_with_tone(pitch.letter, tonic, key.direction) else {
            debug!("letter {} has no spelling in {tonic}", pitch.letter);
            continue;
        };
        let register = if pitch.is_high_staff {
            Register::High
        } else {
            Register::Low
        };
        let glyph = glyphs.get(name, register, scale_factor * font_scale)?;

        let (x, y) = search_position(&drawn, candidate, glyph.width() as i32, step_unit);
        overlay_rgba(page, glyph, x, y, font_opacity)?;
        drawn.mark_rect(x, y, candidate.width, candidate.height);
    }
    Ok(())
}
