//! HTTP request handlers
//!
//! Contains handlers for all HTTP endpoints.

use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use serde::Serialize;
use tracing::{debug, instrument};

use super::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Health status
    status: String,
    /// Application version
    version: String,
    /// Number of monitored PDUs
    pdus: usize,
}

/// Root endpoint - displays basic info
pub async fn root(State(state): State<AppState>) -> Html<String> {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>rPDU-Exporter</title>
</head>
<body>
    <h1>rPDU-Exporter</h1>
    <p>Version: {}</p>
    <ul>
        <li><a href="/health">Health Check</a></li>
        <li><a href="{}">Metrics</a></li>
    </ul>
</body>
</html>"#,
        env!("CARGO_PKG_VERSION"),
        state.config.server.path
    );
    Html(html)
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pdus: state.exporter.pdus().len(),
    })
}

/// Metrics endpoint - reads all PDUs and returns Prometheus format
#[instrument(skip(state), name = "metrics_handler")]
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let mut output = state.exporter.collect().await;

    // Exporter self-metrics
    output.push_str(&state.exporter.internal_metrics().render());

    let scrape_duration = start.elapsed().as_secs_f64();
    output.push_str(&format!(
        r#"# HELP raritan_exporter_info rPDU-Exporter information
# TYPE raritan_exporter_info gauge
raritan_exporter_info{{version="{}"}} 1
# HELP raritan_exporter_scrape_duration_seconds Time spent serving this scrape
# TYPE raritan_exporter_scrape_duration_seconds gauge
raritan_exporter_scrape_duration_seconds {}
"#,
        env!("CARGO_PKG_VERSION"),
        scrape_duration,
    ));

    debug!(
        duration_ms = start.elapsed().as_millis() as u64,
        "scrape complete"
    );

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        output,
    )
}
