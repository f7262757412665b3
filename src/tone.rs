//! Key-signature arithmetic.
//!
//! A key signature is a direction (sharps or flats) plus a mark count.
//! `calc_tune` resolves it to the tonic via the circle of fifths
//! (sharps) or fourths (flats); `map_note_with_tone` spells a natural
//! letter the way the resulting major scale spells it — F in G major
//! becomes #F.

use serde::{Deserialize, Serialize};

/// Chromatic sequence anchored at C, sharp spellings.
pub const CHROMATIC_RISE: [&str; 12] = [
    "C", "#C", "D", "#D", "E", "F", "#F", "G", "#G", "A", "#A", "B",
];

/// Chromatic sequence anchored at C, flat spellings.
pub const CHROMATIC_REDUCE: [&str; 12] = [
    "C", "bD", "D", "bE", "E", "F", "bG", "G", "bA", "A", "bB", "B",
];

/// Semitone distances between consecutive degrees of a major scale.
const MAJOR_SCALE_STEPS: [usize; 7] = [2, 2, 1, 2, 2, 2, 1];

/// Whether the key signature marks raise or lower their letters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Rise,
    Reduce,
}

fn chromatic(direction: Direction) -> &'static [&'static str; 12] {
    match direction {
        Direction::Rise => &CHROMATIC_RISE,
        Direction::Reduce => &CHROMATIC_REDUCE,
    }
}

/// Key signature of a run: mark direction plus mark count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeySignature {
    pub direction: Direction,
    pub count: u32,
}

impl KeySignature {
    /// Signed form used in configuration: negative counts are flats.
    pub fn from_signed(tune: i32) -> Self {
        Self {
            direction: if tune < 0 {
                Direction::Reduce
            } else {
                Direction::Rise
            },
            count: tune.unsigned_abs(),
        }
    }

    /// Display name of the key's tonic.
    pub fn tonic(&self) -> &'static str {
        calc_tune(self.direction, self.count)
    }
}

/// Tonic of a key signature with `count` marks in `direction`.
///
/// An odd count shifts the base from C one fifth up (to G) for sharps
/// or one fourth up (to F) for flats; the remaining even count walks
/// the chromatic sequence a whole tone per pair of marks, wrapping
/// modulo 12.
pub fn calc_tune(direction: Direction, count: u32) -> &'static str {
    let list = chromatic(direction);
    let mut count = count as i32;
    let mut base = 0i32; // C
    match direction {
        Direction::Reduce => {
            if count % 2 != 0 {
                base = 5; // F
                count -= 1;
            }
            list[(base - count).rem_euclid(12) as usize]
        }
        Direction::Rise => {
            if count % 2 != 0 {
                base = 7; // G
                count -= 1;
            }
            list[(base + count).rem_euclid(12) as usize]
        }
    }
}

/// Spelling of the natural letter `letter` within the major scale of
/// `tonic`.
///
/// The scale is built by walking [`MAJOR_SCALE_STEPS`] through the
/// chromatic sequence starting at the tonic; the first member whose
/// spelling contains the letter wins. `None` only when `tonic` is not
/// a member of the direction's chromatic sequence or the letter is not
/// a scale letter.
pub fn map_note_with_tone(letter: char, tonic: &str, direction: Direction) -> Option<&'static str> {
    let list = chromatic(direction);
    let tonic_idx = list.iter().position(|&n| n == tonic)?;
    let mut semitone = 0usize;
    let mut scale = [""; 7];
    for (slot, step) in MAJOR_SCALE_STEPS.iter().enumerate() {
        scale[slot] = list[(tonic_idx + semitone) % 12];
        semitone += step;
    }
    scale.iter().find(|name| name.contains(letter)).copied()
}
