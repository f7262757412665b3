//! Run configuration.
//!
//! Loaded once per run from a JSON file; the library consumes it
//! read-only. The signed `tune` field encodes the key signature:
//! negative values are flats, the magnitude is the mark count.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::tone::KeySignature;

#[derive(Clone, Debug, Deserialize)]
pub struct RunConfig {
    /// Signed key signature: `2` = two sharps, `-3` = three flats.
    pub tune: i32,

    /// Correlation threshold above which a template cell counts as a
    /// note candidate.
    pub note_match_threshold: f32,

    /// Extra scale applied to label glyphs on top of the page scale.
    #[serde(default = "default_font_scale")]
    pub font_scale: f32,

    /// Opacity of composited labels in `[0, 1]`.
    pub font_opacity: f32,

    /// Center of the page-to-template scale search.
    pub sheet_scale: f32,

    /// Explicit allow-list of input file names; empty means all.
    #[serde(default)]
    pub files: Vec<String>,

    /// Worker pool size.
    #[serde(default = "default_worker_num")]
    pub worker_num: usize,

    /// Directory of page images to annotate.
    pub input_dir: PathBuf,

    /// Destination directory for annotated pages.
    pub output_dir: PathBuf,

    /// Directory of note-glyph templates.
    pub template_dir: PathBuf,

    /// Directory of note-name label art (`low/` and `high/` subdirs).
    pub label_dir: PathBuf,

    /// Staff-reference template image used for scale estimation.
    pub staff_template: PathBuf,
}

fn default_font_scale() -> f32 {
    0.8
}

fn default_worker_num() -> usize {
    8
}

impl RunConfig {
    pub fn key_signature(&self) -> KeySignature {
        KeySignature::from_signed(self.tune)
    }

    /// True when `name` passes the allow-list.
    pub fn file_allowed(&self, name: &str) -> bool {
        self.files.is_empty() || self.files.iter().any(|f| f == name)
    }
}

/// Read and parse a JSON run configuration.
pub fn load_config(path: &Path) -> Result<RunConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let config: RunConfig = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    Ok(config)
}
