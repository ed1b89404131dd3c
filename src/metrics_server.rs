// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Optional HTTP endpoint exposing `/metrics` and `/healthz`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::metrics::gather_metrics;
use crate::record_store::RecordStore;

/// Build the router. `/healthz` reports the number of resolvable hosts.
pub fn router(store: RecordStore) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(health_handler))
        .with_state(store)
}

/// Bind the metrics listener.
///
/// # Errors
///
/// Returns [`StartupError::MetricsBind`] if the address cannot be bound.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, StartupError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::MetricsBind { addr, source })
}

/// Serve the metrics endpoint on an already bound listener.
///
/// # Errors
///
/// Returns an error if the HTTP server fails.
pub async fn serve(listener: TcpListener, store: RecordStore) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Metrics endpoint listening (http)");
    }
    axum::serve(listener, router(store)).await
}

async fn metrics_handler() -> (StatusCode, String) {
    match gather_metrics() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn health_handler(State(store): State<RecordStore>) -> (StatusCode, String) {
    (StatusCode::OK, format!("ok records={}\n", store.len()))
}
