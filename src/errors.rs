// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for Vault operations and server bootstrap.
//!
//! [`VaultError`] classifies every failure of the Vault capability layer so that
//! operators can tell a legitimate "absent" answer apart from transport or
//! server-side failures. [`BootstrapError`] attaches the lifecycle phase a
//! `VaultServer` failed in.

use crate::crd::Phase;
use thiserror::Error;

/// Errors returned by the Vault capability interface and the operators built on it.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The desired state is invalid and was rejected before calling Vault.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Vault answered 404 for the requested path.
    #[error("not found: {path}")]
    NotFound {
        /// Request path that was not found
        path: String,
        /// Entries of the `errors` array in the response body (may be empty)
        errors: Vec<String>,
    },

    /// The request never produced an HTTP response (connect, timeout, body read).
    #[error("request to {path} failed: {source}")]
    Transport {
        /// Request path
        path: String,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// Vault returned a non-success status other than 404.
    #[error("{path} returned HTTP {status}: {}", errors.join("; "))]
    OperationFailed {
        /// HTTP status code returned by Vault
        status: u16,
        /// Request path
        path: String,
        /// Entries of the `errors` array in the response body
        errors: Vec<String>,
    },

    /// Checking whether a resource exists failed with something other than not-found.
    #[error("not possible to check if {path} exists: {source}")]
    ExistenceCheck {
        /// Path whose existence was checked
        path: String,
        #[source]
        source: Box<VaultError>,
    },

    /// A success response could not be decoded into the expected shape.
    #[error("unexpected response from {path}: {message}")]
    InvalidResponse {
        /// Request path
        path: String,
        /// What was missing or malformed
        message: String,
    },
}

impl VaultError {
    /// Returns `true` when Vault reported the resource as absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Short label used for metrics (`validation`, `not_found`, `transport`, ...).
    #[must_use]
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Transport { .. } => "transport",
            Self::OperationFailed { .. } => "operation_failed",
            Self::ExistenceCheck { .. } => "existence_check",
            Self::InvalidResponse { .. } => "invalid_response",
        }
    }
}

/// Failure of one `VaultServer` bootstrap step, tagged with the phase it leaves the server in.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{phase}: {message}")]
pub struct BootstrapError {
    /// Phase to report on the `VaultServer` status
    pub phase: Phase,
    /// Human-readable failure description
    pub message: String,
}

impl BootstrapError {
    pub fn new(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }
}

/// Errors raised while resolving the Vault client for a resource's server reference.
#[derive(Debug, Error)]
pub enum ClientResolutionError {
    /// The referenced `VaultServer` does not exist.
    #[error("VaultServer {namespace}/{name} not found")]
    ServerNotFound { namespace: String, name: String },

    /// The credential secret of the referenced server does not exist yet.
    #[error("credential secret {namespace}/{name} not found")]
    CredentialsNotFound { namespace: String, name: String },

    /// The credential secret exists but carries no usable root token.
    #[error("credential secret {namespace}/{name} has no {key} entry")]
    MissingRootToken {
        namespace: String,
        name: String,
        key: String,
    },

    /// Looking up the server or its secret failed.
    #[error("failed to look up {what}: {source}")]
    Lookup {
        what: String,
        #[source]
        source: kube::Error,
    },

    /// Building the Vault client failed.
    #[error("failed to build Vault client for {endpoint}: {source}")]
    Client {
        endpoint: String,
        #[source]
        source: VaultError,
    },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
