use std::path::Path;

use log::{debug, warn};

use super::model::{Decoded, Dimensions};
use crate::error::{PreprocessError, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Decode a raw file: a `width height` header line followed by
/// `width * height` sample bytes.
pub fn decode(path: &Path) -> Result<Decoded> {
    let bytes = std::fs::read(path).map_err(|e| PreprocessError::io(path, e))?;
    let decoded = decode_bytes(path, &bytes)?;
    debug!("decoded {} ({})", path.display(), decoded.dims);
    Ok(decoded)
}

/// Decode an in-memory copy of a raw file. `path` is only used for errors.
pub fn decode_bytes(path: &Path, bytes: &[u8]) -> Result<Decoded> {
    let (header, payload) = split_header(bytes);
    let dims = Dimensions::from_header_bytes(header).map_err(|_| {
        PreprocessError::MalformedHeader {
            path: path.to_path_buf(),
            line: String::from_utf8_lossy(header).into_owned(),
        }
    })?;

    let expected = dims.sample_count();
    if payload.len() < expected {
        return Err(PreprocessError::TruncatedData {
            path: path.to_path_buf(),
            expected,
            actual: payload.len(),
        });
    }
    if payload.len() > expected {
        warn!(
            "{}: ignoring {} bytes past the {dims} payload",
            path.display(),
            payload.len() - expected
        );
    }

    // Every byte is a sample; there is no sentinel value.
    Ok(Decoded {
        dims,
        samples: payload[..expected].to_vec(),
    })
}

/// Split at the first newline. A file with no newline is all header.
fn split_header(bytes: &[u8]) -> (&[u8], &[u8]) {
    match bytes.iter().position(|&b| b == b'\n') {
        Some(nl) => {
            let header = &bytes[..nl];
            let header = header.strip_suffix(b"\r").unwrap_or(header);
            (header, &bytes[nl + 1..])
        }
        None => (bytes, &bytes[bytes.len()..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(header: &str, payload: &[u8]) -> Vec<u8> {
        let mut bytes = format!("{header}\n").into_bytes();
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn keeps_every_byte_value() {
        // 0xff used to be stripped as a sentinel; 0x0a is a newline byte.
        let payload = [0, 10, 255, 128, 13, 7];
        let decoded = decode_bytes(Path::new("t.input"), &raw("3 2", &payload)).unwrap();
        assert_eq!(decoded.dims, Dimensions { width: 3, height: 2 });
        assert_eq!(decoded.samples, payload);
    }

    #[test]
    fn accepts_crlf_header() {
        let mut bytes = b"2 1\r\n".to_vec();
        bytes.extend_from_slice(&[4, 5]);
        let decoded = decode_bytes(Path::new("t"), &bytes).unwrap();
        assert_eq!(decoded.samples, vec![4, 5]);
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let err = decode_bytes(Path::new("t"), &raw("3 3", &[1, 2, 3])).unwrap_err();
        match err {
            PreprocessError::TruncatedData { expected, actual, .. } => {
                assert_eq!((expected, actual), (9, 3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn surplus_payload_is_dropped() {
        let decoded = decode_bytes(Path::new("t"), &raw("2 1", &[1, 2, 3, 4])).unwrap();
        assert_eq!(decoded.samples, vec![1, 2]);
    }

    #[test]
    fn malformed_header_reports_line() {
        let err = decode_bytes(Path::new("t"), &raw("3 x", &[0; 9])).unwrap_err();
        assert!(matches!(err, PreprocessError::MalformedHeader { ref line, .. } if line == "3 x"));
        assert!(decode_bytes(Path::new("t"), b"").is_err());
    }

    #[test]
    fn overflowing_header_is_malformed() {
        let header = format!("{0} {0}", 1usize << (usize::BITS / 2));
        let err = decode_bytes(Path::new("t"), &raw(&header, &[1, 2])).unwrap_err();
        assert!(matches!(err, PreprocessError::MalformedHeader { ref line, .. } if *line == header));
    }
}
