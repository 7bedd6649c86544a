use axum::{
    body::Body,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use std::time::Duration;
use tokio::{net::TcpListener, time::sleep};
use tower::ServiceBuilder;
use tracing::{info, Level};
use wiretap::{TrafficLogConfig, TrafficLogLayer, Verbosity};

async fn hello_handler() -> impl IntoResponse {
    sleep(Duration::from_millis(100)).await; // Simulate some work
    "Hello, World!"
}

async fn echo_handler(body: Bytes) -> impl IntoResponse {
    format!("Echo: {}", String::from_utf8_lossy(&body))
}

async fn json_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "demo",
        "nested": { "answer": 42 },
        "items": ["a", "b", "c"]
    }))
}

async fn xml_handler() -> impl IntoResponse {
    Response::builder()
        .header("content-type", "application/xml")
        .body(Body::from("<doc><title>demo</title><body>hi</body></doc>"))
        .unwrap()
}

async fn binary_handler() -> impl IntoResponse {
    Response::builder()
        .header("content-type", "application/octet-stream")
        .body(Body::from(vec![0u8, 1, 2, 3, 254, 255]))
        .unwrap()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let config = TrafficLogConfig {
        verbosity: Verbosity::All,
        ..TrafficLogConfig::default()
    };

    let app = Router::new()
        .route("/hello", get(hello_handler))
        .route("/echo", post(echo_handler))
        .route("/json", get(json_handler))
        .route("/xml", get(xml_handler))
        .route("/binary", get(binary_handler))
        .layer(ServiceBuilder::new().layer(TrafficLogLayer::new(config)));

    info!("Demo server endpoints:");
    info!("  GET  /hello   - Simple greeting");
    info!("  POST /echo    - Echo request body");
    info!("  GET  /json    - Pretty-printed JSON trace");
    info!("  GET  /xml     - Pretty-printed XML trace");
    info!("  GET  /binary  - Binary body, omitted from the trace");
    info!("");
    info!("Try these commands:");
    info!("  curl http://localhost:3000/hello");
    info!("  curl -X POST -H 'content-type: application/json' -d '{{\"a\":1}}' http://localhost:3000/echo");
    info!("  curl http://localhost:3000/json");
    info!("  curl http://localhost:3000/binary");

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    info!("Demo server listening on http://localhost:3000");

    axum::serve(listener, app).await?;

    Ok(())
}
