//! Worker-side match service.
//!
//! One process per pool slot. The service binds its endpoint, then
//! answers one request per connection: decode and binarize the page
//! and the named template, scale the template, score the correlation
//! surface, and reply with the thresholded local maxima. Job failures
//! (unreadable paths, degenerate sizes) are reported back as error
//! payloads; the process keeps serving.

use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;

use image::imageops::{self, FilterType};
use log::{debug, info, warn};

use crate::error::PageError;
use crate::pool::protocol::{read_frame, write_frame, MatchReply, MatchRequest};
use crate::raster::{binarize, is_local_max, match_template};

/// Half-side of the square suppression neighborhood (11×11).
const LOCAL_MAX_RADIUS: usize = 5;

/// Bind `endpoint` and serve match requests until the process is
/// killed. A stale socket file from a previous run is removed first.
pub fn serve(endpoint: &Path, template_dir: &Path) -> std::io::Result<()> {
    if endpoint.exists() {
        std::fs::remove_file(endpoint)?;
    }
    let listener = UnixListener::bind(endpoint)?;
    info!("worker listening on {}", endpoint.display());

    for stream in listener.incoming() {
        match stream {
            Ok(mut stream) => {
                if let Err(err) = handle_connection(&mut stream, template_dir) {
                    warn!("connection failed: {err}");
                }
            }
            Err(err) => warn!("accept failed: {err}"),
        }
    }
    Ok(())
}

fn handle_connection(stream: &mut UnixStream, template_dir: &Path) -> std::io::Result<()> {
    let payload = read_frame(stream)?;
    let reply = match serde_json::from_slice::<MatchRequest>(&payload) {
        Ok(request) => match run_match(&request, template_dir) {
            Ok(boxes) => MatchReply::Boxes(boxes),
            Err(err) => MatchReply::Error {
                error: err.to_string(),
            },
        },
        Err(err) => MatchReply::Error {
            error: format!("malformed request: {err}"),
        },
    };
    write_frame(stream, &reply)
}

/// Execute one match job: boxes `[x, y, width, height]` of every
/// thresholded local maximum of the score surface.
pub fn run_match(request: &MatchRequest, template_dir: &Path) -> Result<Vec<[i32; 4]>, PageError> {
    let page = image::open(&request.image_path)?.to_rgb8();
    let page_bin = binarize(&page);

    let template = image::open(template_dir.join(&request.template_name))?.to_rgb8();
    let template_bin = binarize(&template);
    let scaled_w = (template_bin.width() as f32 * request.scale_factor).round() as u32;
    let scaled_h = (template_bin.height() as f32 * request.scale_factor).round() as u32;
    if scaled_w == 0 || scaled_h == 0 {
        return Err(PageError::Job(format!(
            "template {} degenerates at scale {}",
            request.template_name, request.scale_factor
        )));
    }
    let template_scaled = imageops::resize(&template_bin, scaled_w, scaled_h, FilterType::Triangle);

    let score = match_template(&page_bin, &template_scaled).ok_or_else(|| {
        PageError::Job(format!(
            "template {} ({scaled_w}x{scaled_h}) larger than page",
            request.template_name
        ))
    })?;

    let mut boxes = Vec::new();
    for y in 0..score.h {
        for x in 0..score.w {
            if score.get(x, y) > request.threshold && is_local_max(&score, x, y, LOCAL_MAX_RADIUS) {
                boxes.push([x as i32, y as i32, scaled_w as i32, scaled_h as i32]);
            }
        }
    }
    debug!(
        "template {}: {} matches above {}",
        request.template_name,
        boxes.len(),
        request.threshold
    );
    Ok(boxes)
}
