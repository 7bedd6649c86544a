//! Body rendering: pretty-printing and the probable-binary heuristic.
//!
//! Takes the captured bytes plus whatever the transport declared about them
//! and produces a [`RenderedBody`]. Structured kinds get re-indented; anything
//! that fails to parse is logged as-is (a best-effort trace beats no trace).
//! Truncation is not this module's job; the emitter chunks long lines.

use serde::Serialize;
use serde_json::json;

use crate::classify::{self, ContentKind, MediaType};
use crate::decode;
use crate::types::RenderedBody;

/// How many leading bytes the binary heuristic looks at.
const BINARY_SAMPLE_BYTES: usize = 64;
/// How many code points of the sample are inspected.
const BINARY_SAMPLE_CHARS: usize = 16;

const BINARY_OMITTED: &str = "binary body omitted";

/// Render captured body bytes into trace text.
///
/// A loggable declared type goes through decode + pretty-print. A declared but
/// non-loggable type is reported as omitted binary. With no declared type the
/// byte-sampling heuristic decides; survivors are rendered as plain UTF-8.
pub(crate) fn render_body(
    bytes: &[u8],
    media_type: Option<&MediaType>,
    content_encoding: Option<&str>,
) -> RenderedBody {
    match media_type {
        Some(mt) if classify::is_loggable(Some(mt)) => {
            match decode::decode_body(bytes, content_encoding, mt.charset.as_deref()) {
                Ok(text) => render_text(text, classify::classify(Some(mt))),
                Err(err) => decode_failure(&err.to_string()),
            }
        }
        Some(_) => binary_omitted(bytes.len()),
        None => {
            if probably_binary(bytes) {
                binary_omitted(bytes.len())
            } else {
                match decode::decode_body(bytes, content_encoding, None) {
                    Ok(text) => render_text(text, ContentKind::Plain),
                    Err(err) => decode_failure(&err.to_string()),
                }
            }
        }
    }
}

fn render_text(text: String, kind: ContentKind) -> RenderedBody {
    match kind {
        ContentKind::Json => RenderedBody::text(pretty_json(&text).unwrap_or(text)),
        ContentKind::Xml => RenderedBody::text(pretty_xml(&text).unwrap_or(text)),
        _ => RenderedBody::text(text),
    }
}

fn binary_omitted(len: usize) -> RenderedBody {
    RenderedBody::omitted(format!("{BINARY_OMITTED} ({len} bytes)"), BINARY_OMITTED)
}

/// Single-key diagnostic object so the trace stays well-formed where a JSON
/// body was expected.
fn decode_failure(message: &str) -> RenderedBody {
    RenderedBody::omitted(json!({ "decodeError": message }).to_string(), message)
}

/// Re-serialize valid JSON with a 3-space indent, preserving key order as
/// encountered. Returns `None` when the input is not strict JSON.
fn pretty_json(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"   ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser).ok()?;
    String::from_utf8(out).ok()
}

/// Re-indent XML by streaming events through an indenting writer. Returns
/// `None` on malformed input.
fn pretty_xml(text: &str) -> Option<String> {
    use quick_xml::events::Event;
    use quick_xml::{Reader, Writer};

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 3);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(event) => writer.write_event(event).ok()?,
            Err(_) => return None,
        }
    }
    String::from_utf8(writer.into_inner()).ok()
}

/// Sampling heuristic for untyped bodies: look at the first 64 bytes, decode
/// up to 16 code points, and call it binary on the first control character
/// that is not whitespace.
pub(crate) fn probably_binary(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(BINARY_SAMPLE_BYTES)];
    String::from_utf8_lossy(sample)
        .chars()
        .take(BINARY_SAMPLE_CHARS)
        .any(|c| c.is_control() && !c.is_whitespace())
}
