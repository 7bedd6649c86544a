//! Non-destructive body capture.
//!
//! HTTP body streams are single-use, so the trace must never read what the
//! real consumer has not seen yet. The tee forwards every chunk unchanged
//! while pushing a copy onto a channel; the returned future resolves to the
//! accumulated bytes once the stream finishes. Downstream rendering only ever
//! touches the copy.

use axum::body::{Body, Bytes};
use futures::{Future, StreamExt};
use http_body_util::BodyExt;
use std::pin::Pin;
use tokio::sync::mpsc;

/// The original body stream failed while the tee was watching it.
#[derive(Debug, thiserror::Error)]
#[error("body stream failed during capture: {0}")]
pub struct CaptureError(pub(crate) String);

type CaptureFuture = Pin<Box<dyn Future<Output = Result<Bytes, CaptureError>> + Send>>;

/// Wrap `body` so it streams through untouched while a copy accumulates.
///
/// Returns the replacement body and a future resolving to the captured bytes
/// when the stream completes. A stream error is reported on both sides: the
/// consumer sees the original error, the capture future yields
/// [`CaptureError`].
pub(crate) fn tee_body<B>(body: B) -> (Body, CaptureFuture)
where
    B: axum::body::HttpBody<Data = Bytes, Error = axum::Error> + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();

    let forwarded = body.into_data_stream().map(move |result| {
        let copy = match &result {
            Ok(chunk) => Ok(chunk.clone()),
            Err(err) => Err(CaptureError(err.to_string())),
        };
        let _ = tx.send(copy);
        result
    });

    let capture = Box::pin(async move {
        let mut buf = Vec::new();
        while let Some(chunk) = rx.recv().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(buf))
    });

    (Body::from_stream(forwarded), capture)
}
