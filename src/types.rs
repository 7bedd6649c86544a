//! Snapshots of intercepted traffic.
//!
//! A [`CapturedRequest`]/[`CapturedResponse`] is taken at interception time
//! and moved, by value, into the render task. All downstream work operates on
//! these copies; the live request and response streams are never re-read.

use axum::http::{Method, StatusCode, Uri};
use bytes::Bytes;
use std::time::Duration;

use crate::classify::MediaType;

/// Request snapshot handed to the render pipeline.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// Process-unique id pairing this request with its response block.
    pub correlation_id: u64,
    pub method: Method,
    pub uri: Uri,
    /// Header pairs in wire order, duplicates preserved. Values are decoded
    /// lossily for display; this is a trace, not a proxy.
    pub headers: Vec<(String, String)>,
    /// Tee'd copy of the body, present once the original stream finished.
    pub body: Option<Bytes>,
    /// Set when the body stream failed mid-capture.
    pub body_error: Option<String>,
    pub content_encoding: Option<String>,
    pub media_type: Option<MediaType>,
}

/// Response snapshot handed to the render pipeline.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    /// Matches the [`CapturedRequest::correlation_id`] of the same exchange.
    pub correlation_id: u64,
    pub status: StatusCode,
    /// URI of the originating request, repeated here so a response-only trace
    /// still says what was asked for.
    pub uri: Uri,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub body_error: Option<String>,
    pub content_encoding: Option<String>,
    pub media_type: Option<MediaType>,
    /// Latency to response headers, measured around the inner service call.
    /// Render cost is excluded by construction.
    pub elapsed: Duration,
}

/// Outcome of rendering a captured body.
///
/// Either printable text ready for line emission, or a placeholder whose
/// `omitted_reason` says why the real content was withheld (binary content,
/// broken compressed stream, unreadable body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBody {
    pub text: String,
    pub omitted_reason: Option<String>,
}

impl RenderedBody {
    pub(crate) fn text(text: String) -> Self {
        Self {
            text,
            omitted_reason: None,
        }
    }

    pub(crate) fn omitted(text: String, reason: impl Into<String>) -> Self {
        Self {
            text,
            omitted_reason: Some(reason.into()),
        }
    }
}
