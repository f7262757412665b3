#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod geometry;
pub mod notes;
pub mod page;
pub mod place;
pub mod pool;
pub mod raster;
pub mod staff;
pub mod tone;

// Main entry points.
pub use crate::config::{load_config, RunConfig};
pub use crate::error::PageError;
pub use crate::page::annotate_page;
pub use crate::pool::WorkerPool;

// Stage-level results.
pub use crate::notes::Candidate;
pub use crate::place::GlyphCache;
pub use crate::staff::StaffLayout;
pub use crate::tone::KeySignature;

/// Small prelude for quick experiments.
pub mod prelude {
    pub use crate::place::GlyphCache;
    pub use crate::{annotate_page, load_config, PageError, RunConfig, WorkerPool};
}
