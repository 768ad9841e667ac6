// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP endpoints for Prometheus scraping and kubelet probes.
//!
//! - `/metrics` - Prometheus text exposition of [`crate::metrics`]
//! - `/healthz` - liveness, always `200 ok`
//! - `/readyz` - readiness, `200 ok` once the controllers are started

use crate::constants::{HEALTH_PATH, METRICS_SERVER_PATH, READY_PATH};
use crate::metrics::gather_metrics;
use anyhow::{Context as _, Result};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Readiness flag flipped once the controllers are running.
#[derive(Debug, Default, Clone)]
pub struct Readiness(Arc<AtomicBool>);

impl Readiness {
    pub fn set_ready(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

async fn metrics_handler() -> impl IntoResponse {
    match gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn ready_handler(State(readiness): State<Readiness>) -> impl IntoResponse {
    if readiness.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

/// Router serving the metrics and probe endpoints.
pub fn router(readiness: Readiness) -> Router {
    Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(HEALTH_PATH, get(health_handler))
        .route(READY_PATH, get(ready_handler))
        .with_state(readiness)
}

/// Serve the metrics and probe endpoints on `bind_address` until the task is dropped.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run_metrics_server(bind_address: &str, readiness: Readiness) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("failed to bind metrics server to {bind_address}"))?;
    info!(address = %bind_address, "Metrics server listening");

    axum::serve(listener, router(readiness))
        .await
        .context("metrics server failed")
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod server_tests;
