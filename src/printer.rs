//! Trace layout: turns captured snapshots into emitted line blocks.
//!
//! Runs on the dispatch worker, never on the request path. Each call renders
//! one complete block (request or response) and pushes it through the emitter
//! in a single pass, which is what keeps concurrent exchanges from shuffling
//! lines mid-block.

use std::fmt::Write;

use serde_json::json;

use crate::emit::LineEmitter;
use crate::format;
use crate::types::{CapturedRequest, CapturedResponse, RenderedBody};

pub(crate) fn print_request(emitter: &LineEmitter, tag: &str, req: &CapturedRequest) {
    let mut head = String::new();
    let _ = writeln!(head, "--> {} {} [#{}]", req.method, req.uri, req.correlation_id);
    write_headers(&mut head, &req.headers);
    emitter.emit_block(tag, head.trim_end_matches('\n'), true);

    emit_body(
        emitter,
        tag,
        req.body.as_deref(),
        req.body_error.as_deref(),
        req.media_type.as_ref(),
        req.content_encoding.as_deref(),
    );

    let end = match &req.body {
        Some(body) if !body.is_empty() => {
            format!("--> END {} ({}-byte body)", req.method, body.len())
        }
        _ => format!("--> END {}", req.method),
    };
    emitter.emit_block(tag, &end, true);
}

pub(crate) fn print_response(emitter: &LineEmitter, tag: &str, resp: &CapturedResponse) {
    let mut head = String::new();
    let _ = writeln!(
        head,
        "<-- {} {} ({}ms) [#{}]",
        resp.status,
        resp.uri,
        resp.elapsed.as_millis(),
        resp.correlation_id
    );
    write_headers(&mut head, &resp.headers);
    emitter.emit_block(tag, head.trim_end_matches('\n'), true);

    emit_body(
        emitter,
        tag,
        resp.body.as_deref(),
        resp.body_error.as_deref(),
        resp.media_type.as_ref(),
        resp.content_encoding.as_deref(),
    );

    emitter.emit_block(tag, "<-- END HTTP", true);
}

fn write_headers(out: &mut String, headers: &[(String, String)]) {
    for (name, value) in headers {
        let _ = writeln!(out, "{name}: {value}");
    }
}

/// Render and emit the body portion of a block, if there is one. Header and
/// marker lines are wrap-chunked; rendered body text goes out unwrapped, one
/// physical line per logical line.
fn emit_body(
    emitter: &LineEmitter,
    tag: &str,
    body: Option<&[u8]>,
    body_error: Option<&str>,
    media_type: Option<&crate::classify::MediaType>,
    content_encoding: Option<&str>,
) {
    let rendered = match (body_error, body) {
        (Some(err), _) => Some(capture_failure(err)),
        (None, Some(bytes)) if !bytes.is_empty() => {
            Some(format::render_body(bytes, media_type, content_encoding))
        }
        _ => None,
    };
    if let Some(rendered) = rendered {
        let wrap = rendered.omitted_reason.is_some();
        emitter.emit_block(tag, &rendered.text, wrap);
    }
}

fn capture_failure(message: &str) -> RenderedBody {
    RenderedBody::omitted(json!({ "captureError": message }).to_string(), message)
}
