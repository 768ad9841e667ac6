// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration loaded from environment variables.
//!
//! Every setting has a default from [`crate::constants`] and can be overridden
//! through the environment:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `VAULT_REQUEST_TIMEOUT_SECS` | 5 |
//! | `RECONCILE_TIMEOUT_SECS` | 60 |
//! | `SUCCESS_REQUEUE_SECS` | 300 |
//! | `ERROR_REQUEUE_SECS` | 60 |
//! | `METRICS_BIND_ADDRESS` | `0.0.0.0:8080` |

use crate::constants::{
    ERROR_REQUEUE_DURATION_SECS, METRICS_SERVER_BIND_ADDRESS, RECONCILE_TIMEOUT_SECS,
    SUCCESS_REQUEUE_DURATION_SECS, VAULT_REQUEST_TIMEOUT_SECS,
};
use std::time::Duration;
use tracing::warn;

/// Runtime settings shared by every controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Timeout applied to every request sent to a Vault server
    pub vault_request_timeout: Duration,
    /// Deadline for one reconciliation invocation
    pub reconcile_timeout: Duration,
    /// Requeue interval after a successful reconciliation
    pub success_requeue: Duration,
    /// Requeue interval after a failed reconciliation
    pub error_requeue: Duration,
    /// Listen address of the metrics and health server
    pub metrics_bind_address: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            vault_request_timeout: Duration::from_secs(VAULT_REQUEST_TIMEOUT_SECS),
            reconcile_timeout: Duration::from_secs(RECONCILE_TIMEOUT_SECS),
            success_requeue: Duration::from_secs(SUCCESS_REQUEUE_DURATION_SECS),
            error_requeue: Duration::from_secs(ERROR_REQUEUE_DURATION_SECS),
            metrics_bind_address: METRICS_SERVER_BIND_ADDRESS.to_string(),
        }
    }
}

impl OperatorConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = |key: &str, default: u64| {
            Duration::from_secs(var_or_default(&lookup, key, default).max(1))
        };

        Self {
            vault_request_timeout: secs("VAULT_REQUEST_TIMEOUT_SECS", VAULT_REQUEST_TIMEOUT_SECS),
            reconcile_timeout: secs("RECONCILE_TIMEOUT_SECS", RECONCILE_TIMEOUT_SECS),
            success_requeue: secs("SUCCESS_REQUEUE_SECS", SUCCESS_REQUEUE_DURATION_SECS),
            error_requeue: secs("ERROR_REQUEUE_SECS", ERROR_REQUEUE_DURATION_SECS),
            metrics_bind_address: lookup("METRICS_BIND_ADDRESS")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| METRICS_SERVER_BIND_ADDRESS.to_string()),
        }
    }
}

/// Read a variable through `lookup` or return `default` when unset or unparsable.
fn var_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(
                variable = key,
                value = %raw,
                default = %default,
                "Invalid value for environment variable, using default"
            );
            default
        }),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
