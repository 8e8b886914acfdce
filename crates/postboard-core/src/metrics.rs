//! Prometheus metrics helpers for Postboard.
//!
//! # Usage
//!
//! ```rust,ignore
//! use postboard_core::metrics::{init_metrics, start_metrics_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let handle = init_metrics();
//!     start_metrics_server(9090, handle).await.unwrap();
//!
//!     metrics::counter!("ingest_events_received_total").increment(1);
//! }
//! ```
//!
//! # Metric Naming Conventions
//!
//! - Prefix: component name (`ingest_`, `query_`)
//! - Suffix: unit or type (`_total`, `_seconds`)
//! - Labels: only small, closed sets (relay hop, failure reason)

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

/// Initialize the Prometheus metrics recorder.
///
/// Must be called once at startup before any metrics are recorded.
///
/// # Panics
///
/// Panics if a recorder is already installed.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    register_common_metrics();

    handle
}

/// Serve `/metrics` on `port` from a background task.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "metrics server stopped");
        }
    });

    Ok(())
}

fn register_common_metrics() {
    // =========================================================================
    // Ingest pipeline
    // =========================================================================

    describe_counter!(
        "ingest_events_received_total",
        "Raw events accepted by the listener"
    );
    describe_counter!(
        "ingest_relay_dropped_total",
        "Items dropped because the downstream relay was full (label: hop)"
    );
    describe_counter!(
        "ingest_parse_failures_total",
        "Raw events discarded by the parser (label: reason)"
    );
    describe_counter!(
        "ingest_records_parsed_total",
        "Raw events successfully parsed into records"
    );
    describe_counter!(
        "ingest_records_saved_total",
        "Records written to the document store"
    );
    describe_counter!(
        "ingest_save_failures_total",
        "Records the document store failed to write"
    );

    // =========================================================================
    // Read path
    // =========================================================================

    describe_histogram!(
        "query_duration_seconds",
        "Time spent answering read queries (label: operation)"
    );
}
