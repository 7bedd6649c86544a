//! # Wiretap
//!
//! A tower middleware for axum that traces HTTP exchanges to a line-oriented
//! log sink. It watches requests and responses flow through without altering
//! them, then renders a human-readable trace of each exchange off the request
//! path: headers, timing, and bodies that are decompressed, charset-decoded,
//! and pretty-printed when they turn out to be structured text.
//!
//! ## Features
//!
//! - **Transparent**: bodies are tee'd, never consumed; the inner service and
//!   the client see exactly the bytes they would have seen without the layer
//! - **Off the hot path**: all decode/format/emit work runs on a shared
//!   background worker, so request latency is unaffected by logging cost
//! - **Sink-safe**: output is chunked to a maximum line length and tagged with
//!   rotating markers to defeat transports that truncate long lines or
//!   coalesce rapidly repeated identical lines
//! - **Body-aware**: gzip/zlib decompression, charset resolution, JSON/XML
//!   pretty-printing, and a sampling heuristic that keeps binary payloads out
//!   of the trace
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use axum::{routing::get, Router};
//! use wiretap::{TrafficLogConfig, TrafficLogLayer, Verbosity};
//!
//! async fn hello() -> &'static str {
//!     "Hello, World!"
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TrafficLogConfig {
//!         verbosity: Verbosity::All,
//!         ..TrafficLogConfig::default()
//!     };
//!
//!     let app = Router::new()
//!         .route("/hello", get(hello))
//!         .layer(TrafficLogLayer::new(config));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```
//!
//! ## Custom sinks
//!
//! The default sink forwards lines to `tracing`. Anything implementing
//! [`LogSink`] can take its place:
//!
//! ```rust
//! use wiretap::{LogSink, TrafficLogConfig, TrafficLogLayer};
//!
//! struct StderrSink;
//!
//! impl LogSink for StderrSink {
//!     fn emit(&self, tag: &str, line: &str) {
//!         eprintln!("{tag} {line}");
//!     }
//! }
//!
//! let layer = TrafficLogLayer::with_sink(TrafficLogConfig::default(), StderrSink);
//! ```

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap},
    response::Response,
};
use std::{
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};
use tracing::debug;

pub mod classify;
pub mod decode;
pub mod emit;
pub mod format;
pub mod types;

mod dispatch;
mod printer;
mod tee;

pub use classify::{ContentKind, MediaType};
pub use emit::{LogSink, TracingSink, DEFAULT_MAX_LINE_LENGTH};
pub use types::{CapturedRequest, CapturedResponse, RenderedBody};

use emit::LineEmitter;
use tee::tee_body;

/// Monotonic per-process exchange counter; stamped on both blocks of an
/// exchange so a reader can pair them when traces interleave.
static EXCHANGE_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_correlation_id() -> u64 {
    EXCHANGE_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Which sides of an exchange are captured and traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Trace nothing; the layer becomes a pass-through.
    None,
    /// Trace requests only.
    RequestOnly,
    /// Trace responses only.
    ResponseOnly,
    /// Trace both sides.
    #[default]
    All,
}

impl Verbosity {
    fn request(self) -> bool {
        matches!(self, Verbosity::RequestOnly | Verbosity::All)
    }

    fn response(self) -> bool {
        matches!(self, Verbosity::ResponseOnly | Verbosity::All)
    }
}

/// Configuration for the traffic log layer. Fixed once the layer is built.
#[derive(Debug, Clone)]
pub struct TrafficLogConfig {
    /// Master switch; `false` disables all capture and emission.
    pub enabled: bool,
    /// Which sides of each exchange to trace.
    pub verbosity: Verbosity,
    /// Sink tag for request blocks.
    pub request_tag: String,
    /// Sink tag for response blocks.
    pub response_tag: String,
    /// Maximum physical line length when wrapping, in characters.
    pub max_line_length: usize,
}

impl Default for TrafficLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            verbosity: Verbosity::All,
            request_tag: "Request".to_string(),
            response_tag: "Response".to_string(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// Tower layer installing the traffic observer.
///
/// ```rust,no_run
/// use axum::{routing::get, Router};
/// use wiretap::{TrafficLogConfig, TrafficLogLayer};
///
/// # async fn hello() -> &'static str { "hi" }
/// let app: Router = Router::new()
///     .route("/hello", get(hello))
///     .layer(TrafficLogLayer::new(TrafficLogConfig::default()));
/// ```
#[derive(Clone)]
pub struct TrafficLogLayer {
    config: Arc<TrafficLogConfig>,
    emitter: Arc<LineEmitter>,
}

impl TrafficLogLayer {
    /// Build a layer emitting through the default [`TracingSink`].
    pub fn new(config: TrafficLogConfig) -> Self {
        Self::with_sink(config, TracingSink)
    }

    /// Build a layer emitting through a custom sink.
    pub fn with_sink<S: LogSink>(config: TrafficLogConfig, sink: S) -> Self {
        let emitter = Arc::new(LineEmitter::new(Arc::new(sink), config.max_line_length));
        Self {
            config: Arc::new(config),
            emitter,
        }
    }
}

impl<S> Layer<S> for TrafficLogLayer {
    type Service = TrafficLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TrafficLogService {
            inner,
            config: self.config.clone(),
            emitter: self.emitter.clone(),
        }
    }
}

/// Tower service wrapping an inner service with traffic capture.
///
/// Created by [`TrafficLogLayer`]; not used directly. The synchronous portion
/// of a call is limited to header snapshots and installing the body tee;
/// everything else happens after the response has been handed back.
#[derive(Clone)]
pub struct TrafficLogService<S> {
    inner: S,
    config: Arc<TrafficLogConfig>,
    emitter: Arc<LineEmitter>,
}

/// Header snapshot plus the body-framing headers the render step needs.
fn snapshot_headers(headers: &HeaderMap) -> (Vec<(String, String)>, Option<String>, Option<MediaType>) {
    let mut pairs = Vec::with_capacity(headers.len());
    // HeaderMap::iter yields the name once per associated value, so duplicate
    // headers come through in order.
    for (name, value) in headers.iter() {
        pairs.push((
            name.as_str().to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        ));
    }
    let content_encoding = headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(MediaType::parse);
    (pairs, content_encoding, media_type)
}

impl<S> Service<Request> for TrafficLogService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future =
        Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let verbosity = self.config.verbosity;
        if !self.config.enabled || verbosity == Verbosity::None {
            return Box::pin(self.inner.call(request));
        }

        let correlation_id = next_correlation_id();
        let config = self.config.clone();
        let emitter = self.emitter.clone();

        let method = request.method().clone();
        let uri = request.uri().clone();
        debug!(%method, %uri, correlation_id, "intercepting exchange");

        // Request side: snapshot headers and tee the body, then hand the
        // snapshot to the render queue once the inner service has drained it.
        let request_task = if verbosity.request() {
            let (headers, content_encoding, media_type) = snapshot_headers(request.headers());
            let body = std::mem::replace(request.body_mut(), Body::empty());
            let (teed, capture) = tee_body(body);
            *request.body_mut() = teed;

            let emitter = emitter.clone();
            let config = config.clone();
            let method = method.clone();
            let uri = uri.clone();
            Some(tokio::spawn(async move {
                let (body, body_error) = match capture.await {
                    Ok(bytes) => (Some(bytes), None),
                    Err(err) => (None, Some(err.to_string())),
                };
                let captured = CapturedRequest {
                    correlation_id,
                    method,
                    uri,
                    headers,
                    body,
                    body_error,
                    content_encoding,
                    media_type,
                };
                dispatch::dispatch(Box::new(move || {
                    printer::print_request(&emitter, &config.request_tag, &captured);
                }));
            }))
        } else {
            None
        };

        let started = Instant::now();
        let inner_future = self.inner.call(request);

        Box::pin(async move {
            let mut response = inner_future.await?;
            // Latency to response headers; render cost never shows up here.
            let elapsed = started.elapsed();

            if verbosity.response() {
                let status = response.status();
                let (headers, content_encoding, media_type) = snapshot_headers(response.headers());
                let body = std::mem::replace(response.body_mut(), Body::empty());
                let (teed, capture) = tee_body(body);
                *response.body_mut() = teed;

                tokio::spawn(async move {
                    // Keep queue order per exchange: the request block must be
                    // enqueued before the response block.
                    if let Some(task) = request_task {
                        let _ = task.await;
                    }
                    let (body, body_error) = match capture.await {
                        Ok(bytes) => (Some(bytes), None),
                        Err(err) => (None, Some(err.to_string())),
                    };
                    let captured = CapturedResponse {
                        correlation_id,
                        status,
                        uri,
                        headers,
                        body,
                        body_error,
                        content_encoding,
                        media_type,
                        elapsed,
                    };
                    dispatch::dispatch(Box::new(move || {
                        printer::print_response(&emitter, &config.response_tag, &captured);
                    }));
                });
            }

            Ok(response)
        })
    }
}
