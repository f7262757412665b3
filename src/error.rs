//! Page-level error taxonomy.
//!
//! Every failure mode that aborts a single page lands here; the batch
//! entry point catches `PageError` per file, logs it, and moves on to
//! the next page. Worker-process failures travel back over the wire as
//! structured payloads and surface as [`PageError::Job`].

use std::path::PathBuf;

/// Minimum number of stable horizontal lines required for a page to
/// contain at least two five-line staves.
pub const MIN_STAFF_LINES: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// Fewer than [`MIN_STAFF_LINES`] horizontal lines survived
    /// deduplication.
    #[error("no staff detected: {found} stable horizontal lines, need at least {MIN_STAFF_LINES}")]
    StaffNotFound { found: usize },

    /// No run of four consecutive line spacings agreed within
    /// tolerance, so the staff grid spacing could not be estimated.
    #[error("failed to determine staff grid height from line spacings")]
    GridHeightUndetermined,

    /// A worker endpoint did not accept a connection within the
    /// bounded retry budget.
    #[error("worker endpoint {endpoint} unavailable after {attempts} attempts: {source}")]
    EndpointUnavailable {
        endpoint: PathBuf,
        attempts: usize,
        source: std::io::Error,
    },

    /// A label composite would fall outside the page.
    #[error(
        "composite region ({x}, {y}) {width}x{height} exceeds page bounds {page_width}x{page_height}"
    )]
    InvalidComposite {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        page_width: u32,
        page_height: u32,
    },

    /// A template-match job failed on the worker side (unreadable
    /// image, missing template, degenerate sizes).
    #[error("template match job failed: {0}")]
    Job(String),

    /// A frame arrived but its payload could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    /// Image decode/encode failure.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// Filesystem or socket failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
