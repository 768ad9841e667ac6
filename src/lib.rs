// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Vault Operator for Kubernetes
//!
//! A Kubernetes operator that reconciles HashiCorp Vault configuration from
//! Custom Resource Definitions (CRDs).
//!
//! ## Overview
//!
//! - [`crd`] - Custom Resource Definition types (`VaultServer`, `Secret`,
//!   `Policy`, `AuthMethod`, `UserPass`, `AppRole`)
//! - [`vault`] - Vault HTTP capability interface and idempotent operators
//! - [`reconcilers`] - Reconciliation logic for each resource type
//! - [`resource_controller`] - Controller wiring, deadlines and error policy
//! - [`context`] - Shared context and Vault client resolution
//! - [`metrics`] and [`server`] - Prometheus metrics and probe endpoints
//!
//! ## Example
//!
//! ```rust,no_run
//! use vault_operator::crd::{PolicySpec, ServerReference};
//!
//! let spec = PolicySpec {
//!     server_ref: ServerReference {
//!         name: "vault".to_string(),
//!         namespace: Some("vault-system".to_string()),
//!     },
//!     name: "read-billing".to_string(),
//!     rules: vec![r#"path "secret/data/billing/*" { capabilities = ["read"] }"#.to_string()],
//! };
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod metrics;
pub mod reconcilers;
pub mod resource_controller;
pub mod server;
pub mod vault;
