//! Wire protocol between the dispatcher and match workers.
//!
//! One request, one response per connection. Frames are compact
//! serde-JSON records terminated by the two-byte sentinel `\n\n`;
//! compact JSON contains no newlines, so the sentinel cannot occur
//! inside a payload. The receiver buffers until it sees the sentinel,
//! then decodes.

use std::io::{self, Read, Write};
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Two-byte frame terminator.
pub const FRAME_TERMINATOR: &[u8; 2] = b"\n\n";

/// One template-match job.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    /// Page image the worker decodes itself.
    pub image_path: PathBuf,
    /// Template file name, resolved against the worker's template dir.
    pub template_name: String,
    /// Page-to-template scale applied to the template before matching.
    pub scale_factor: f32,
    /// Correlation score threshold.
    pub threshold: f32,
}

/// Worker response: matched boxes `[x, y, width, height]`, or a
/// structured job failure.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchReply {
    Boxes(Vec<[i32; 4]>),
    Error { error: String },
}

/// Serialize `value` and append the frame terminator.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, value: &T) -> io::Result<()> {
    let payload = serde_json::to_vec(value)?;
    writer.write_all(&payload)?;
    writer.write_all(FRAME_TERMINATOR)?;
    writer.flush()
}

/// Read bytes until the frame terminator, returning the payload with
/// the terminator stripped. A closed connection before the terminator
/// is an `UnexpectedEof`.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before frame terminator",
            ));
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.ends_with(FRAME_TERMINATOR) {
            buf.truncate(buf.len() - FRAME_TERMINATOR.len());
            return Ok(buf);
        }
    }
}

/// Read one frame and decode its payload.
pub fn read_message<R: Read, T: DeserializeOwned>(reader: &mut R) -> io::Result<T> {
    let payload = read_frame(reader)?;
    serde_json::from_slice(&payload).map_err(io::Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frames_round_trip() {
        let request = MatchRequest {
            image_path: PathBuf::from("input/page1.png"),
            template_name: "quarter.png".into(),
            scale_factor: 0.5,
            threshold: 0.92,
        };
        let mut wire = Vec::new();
        write_frame(&mut wire, &request).expect("write");
        assert!(wire.ends_with(FRAME_TERMINATOR));

        let decoded: MatchRequest = read_message(&mut Cursor::new(wire)).expect("read");
        assert_eq!(decoded.template_name, "quarter.png");
        assert_eq!(decoded.scale_factor, 0.5);
    }

    #[test]
    fn request_uses_camel_case_keys() {
        let request = MatchRequest {
            image_path: PathBuf::from("p.png"),
            template_name: "t.png".into(),
            scale_factor: 1.0,
            threshold: 0.9,
        };
        let json = serde_json::to_string(&request).expect("serialize");
        assert!(json.contains("\"imagePath\""), "{json}");
        assert!(json.contains("\"templateName\""), "{json}");
        assert!(json.contains("\"scaleFactor\""), "{json}");
    }

    #[test]
    fn reply_decodes_boxes_and_errors() {
        let boxes: MatchReply = serde_json::from_str("[[1,2,3,4],[5,6,7,8]]").expect("boxes");
        match boxes {
            MatchReply::Boxes(b) => assert_eq!(b, vec![[1, 2, 3, 4], [5, 6, 7, 8]]),
            MatchReply::Error { .. } => panic!("expected boxes"),
        }

        let err: MatchReply =
            serde_json::from_str(r#"{"error": "template missing"}"#).expect("error payload");
        match err {
            MatchReply::Error { error } => assert_eq!(error, "template missing"),
            MatchReply::Boxes(_) => panic!("expected error"),
        }
    }

    #[test]
    fn truncated_frame_is_an_eof() {
        let mut cursor = Cursor::new(b"[[1,2,3,4]]".to_vec());
        let err = read_frame(&mut cursor).expect_err("missing terminator");
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
