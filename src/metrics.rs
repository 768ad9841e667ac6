// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Vault operator.
//!
//! All metrics carry the prefix `vault_ops_community_dev_` (prometheus-safe
//! version of the API group).
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - reconciliation outcomes, durations and requeues
//! - **Resource Lifecycle Metrics** - objects created or removed in Vault
//! - **Vault Client Metrics** - HTTP requests sent to Vault by outcome
//! - **Status Metrics** - optimistic-concurrency conflicts while writing status
//! - **Bootstrap Metrics** - phases reached by `VaultServer` bootstrap
//!
//! # Example
//!
//! ```rust,no_run
//! use vault_operator::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("Policy", std::time::Duration::from_millis(120));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all operator metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "vault_ops_community_dev";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry, exposed on the `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn register_counter(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help);
    let counter = CounterVec::new(opts, labels).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
}

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (e.g., `Secret`, `AppRole`)
/// - `status`: Outcome (`success`, `error`, `requeue`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "reconciliations_total",
        "Total number of reconciliations by resource type and status",
        &["resource_type", "status"],
    )
});

/// Duration of reconciliations in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of requeue operations
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `reason`: Reason for requeue (`error`, `timeout`)
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "requeues_total",
        "Total number of requeue operations by resource type and reason",
        &["resource_type", "reason"],
    )
});

// ============================================================================
// Resource Lifecycle Metrics
// ============================================================================

/// Objects created in Vault or Kubernetes by the operator
pub static RESOURCES_CREATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "resources_created_total",
        "Total number of objects created by resource type",
        &["resource_type"],
    )
});

/// Objects removed from Vault during finalization
pub static RESOURCES_DELETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "resources_deleted_total",
        "Total number of objects removed during finalization by resource type",
        &["resource_type"],
    )
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by resource type and error category
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `error_type`: Category of error (`reconcile_error`, `timeout`, `client_resolution`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "errors_total",
        "Total number of errors by resource type and error category",
        &["resource_type", "error_type"],
    )
});

// ============================================================================
// Vault Client Metrics
// ============================================================================

/// HTTP requests sent to Vault
///
/// Labels:
/// - `operation`: the `VaultApi` call (`kv2_read`, `unseal`, ...)
/// - `outcome`: `success`, `not_found`, `error`, `transport_error`
pub static VAULT_REQUESTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "vault_requests_total",
        "Total number of HTTP requests sent to Vault by operation and outcome",
        &["operation", "outcome"],
    )
});

// ============================================================================
// Status Metrics
// ============================================================================

/// Status writes rejected with 409 Conflict and retried
pub static STATUS_CONFLICTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "status_conflicts_total",
        "Total number of status update conflicts by resource type",
        &["resource_type"],
    )
});

// ============================================================================
// Bootstrap Metrics
// ============================================================================

/// Phases reached at the end of a `VaultServer` bootstrap pass
pub static BOOTSTRAP_PHASE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "bootstrap_phase_total",
        "Total number of VaultServer bootstrap passes by resulting phase",
        &["phase"],
    )
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a reconciliation requeue
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled
/// * `reason` - Reason for requeue (e.g., `error`, `timeout`)
pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "requeue"])
        .inc();
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

pub fn record_resource_created(resource_type: &str) {
    RESOURCES_CREATED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

pub fn record_resource_deleted(resource_type: &str) {
    RESOURCES_DELETED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Record an error
///
/// # Arguments
/// * `resource_type` - The kind of resource where error occurred
/// * `error_type` - Category of error
pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

/// Record one Vault HTTP request
pub fn record_vault_request(operation: &str, outcome: &str) {
    VAULT_REQUESTS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Record a status update conflict that will be retried
pub fn record_status_conflict(resource_type: &str) {
    STATUS_CONFLICTS_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Record the phase a bootstrap pass ended in
pub fn record_bootstrap_phase(phase: &str) {
    BOOTSTRAP_PHASE_TOTAL.with_label_values(&[phase]).inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
