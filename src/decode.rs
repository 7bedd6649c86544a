//! Body decoding: transport decompression plus charset resolution.
//!
//! Captured bytes arrive exactly as they crossed the wire, so they may still
//! carry a `Content-Encoding`. This module unwraps gzip/zlib streams and turns
//! the raw bytes into a `String` using the charset declared by the media type.
//! Charset resolution never fails; unknown labels degrade to UTF-8 so a bad
//! header cannot cost us the whole trace.

use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};

/// A body that could not be decompressed. The failure is rendered into the
/// trace as a diagnostic; it is never surfaced to the request path.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("gzip decode failed: {0}")]
    Gzip(std::io::Error),
    #[error("zlib decode failed: {0}")]
    Zlib(std::io::Error),
}

/// Decode captured bytes into text.
///
/// `content_encoding` is matched case-insensitively: `gzip` and `zlib`/
/// `deflate` are decompressed first (HTTP `deflate` is the zlib-wrapped
/// format), anything else is treated as identity. `charset` is the label from
/// the media type, if any.
pub fn decode_body(
    bytes: &[u8],
    content_encoding: Option<&str>,
    charset: Option<&str>,
) -> Result<String, DecodeError> {
    let encoding = content_encoding.map(str::trim).unwrap_or("");
    if encoding.eq_ignore_ascii_case("gzip") {
        let mut raw = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut raw)
            .map_err(DecodeError::Gzip)?;
        Ok(decode_charset(&raw, charset))
    } else if encoding.eq_ignore_ascii_case("zlib") || encoding.eq_ignore_ascii_case("deflate") {
        let mut raw = Vec::new();
        ZlibDecoder::new(bytes)
            .read_to_end(&mut raw)
            .map_err(DecodeError::Zlib)?;
        Ok(decode_charset(&raw, charset))
    } else {
        Ok(decode_charset(bytes, charset))
    }
}

/// Decode bytes with the named charset, falling back to UTF-8 for absent or
/// unrecognized labels. Malformed sequences are replaced, never fatal.
fn decode_charset(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .and_then(|label| encoding_rs::Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn identity_round_trip() {
        let text = "plain body ünïcode";
        assert_eq!(decode_body(text.as_bytes(), None, None).unwrap(), text);
    }

    #[test]
    fn gzip_round_trip() {
        let text = "{\"compressed\": true}";
        let decoded = decode_body(&gzip(text.as_bytes()), Some("gzip"), None).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn zlib_and_deflate_round_trip() {
        let text = "deflated payload";
        let compressed = zlib(text.as_bytes());
        assert_eq!(
            decode_body(&compressed, Some("zlib"), None).unwrap(),
            text
        );
        assert_eq!(
            decode_body(&compressed, Some("deflate"), None).unwrap(),
            text
        );
    }

    #[test]
    fn encoding_name_is_case_insensitive() {
        let text = "GZIP in caps";
        let decoded = decode_body(&gzip(text.as_bytes()), Some("GZip"), None).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn unrecognized_encoding_decodes_directly() {
        let text = "brotli is not ours";
        assert_eq!(decode_body(text.as_bytes(), Some("br"), None).unwrap(), text);
    }

    #[test]
    fn corrupt_gzip_is_an_error() {
        let err = decode_body(b"\x1f\x8b definitely not gzip", Some("gzip"), None).unwrap_err();
        assert!(matches!(err, DecodeError::Gzip(_)));
        assert!(err.to_string().contains("gzip decode failed"));
    }

    #[test]
    fn declared_charset_is_honored() {
        // "café" in ISO-8859-1: é is a single 0xE9 byte.
        let latin1 = [b'c', b'a', b'f', 0xE9];
        assert_eq!(
            decode_body(&latin1, None, Some("iso-8859-1")).unwrap(),
            "café"
        );
    }

    #[test]
    fn unknown_charset_falls_back_to_utf8() {
        let text = "fallback text";
        assert_eq!(
            decode_body(text.as_bytes(), None, Some("no-such-charset")).unwrap(),
            text
        );
    }
}
