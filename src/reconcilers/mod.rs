// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation logic for the operator's custom resources.
//!
//! # Reconciliation Architecture
//!
//! 1. **Resolve** - Look up the referenced `VaultServer` and its root token
//! 2. **Finalize** - Add the finalizer, or clean up Vault for deleted resources
//! 3. **Synchronize** - Apply the desired state through the Vault operators
//! 4. **Status** - Report the outcome back to Kubernetes
//!
//! The Kubernetes side effects of a pass go through [`cluster::ClusterOps`].
//!
//! # Available Reconcilers
//!
//! - [`reconcile_vault_server`] - Bootstraps (initializes and unseals) Vault servers
//! - [`reconcile_vault_resource`] - Generic pass for the kinds below
//!   - [`secret`] - KV-v2 secrets
//!   - [`policy`] - ACL policies
//!   - [`authmethod`] - Auth method mounts
//!   - [`userpass`] - Username/password accounts
//!   - [`approle`] - `AppRole` roles and exported credentials

pub mod approle;
pub mod authmethod;
pub mod cluster;
pub mod finalizers;
pub mod lifecycle;
pub mod policy;
pub mod retry;
pub mod secret;
pub mod status;
pub mod userpass;
pub mod vaultserver;

pub use lifecycle::{reconcile_vault_resource, VaultResource};
pub use vaultserver::reconcile_vault_server;
