//! Raster primitives for the recognition pipeline.
//!
//! Decode/encode and resizing are delegated to the `image` crate; this
//! module owns the page-specific operations built on top of it:
//!
//! - `binarize`: foreground/background classification by a fixed
//!   HSV band.
//! - `ncc`: normalized cross-correlation score surfaces and
//!   local-maxima tests.
//! - `mask`: the single-channel occupancy bitmap shared by spatial
//!   deduplication and label placement.
//! - `compose`: alpha compositing of RGBA label glyphs onto RGB pages.

pub mod binarize;
pub mod compose;
pub mod mask;
pub mod ncc;

pub use self::binarize::binarize;
pub use self::compose::overlay_rgba;
pub use self::mask::OccupancyMask;
pub use self::ncc::{global_max, is_local_max, match_template, ScoreMap};
