// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for Vault configuration.
//!
//! This module defines all Kubernetes Custom Resource Definitions used by the
//! operator to drive a Vault server declaratively.
//!
//! # Resource Types
//!
//! ## Infrastructure
//!
//! - [`VaultServer`] - Connection descriptor for a Vault deployment; bootstraps
//!   (initializes and unseals) the server and stores its root credentials
//!
//! ## Vault Configuration
//!
//! - [`VaultSecret`] - KV-v2 secret, written once with optional generated values
//! - [`Policy`] - ACL policy
//! - [`AuthMethod`] - Auth method mount
//! - [`UserPass`] - Username/password account
//! - [`AppRole`] - `AppRole` role, optionally exported as a Kubernetes secret
//!
//! Every configuration kind points at its server through a [`ServerReference`].
//!
//! # Example
//!
//! ```rust,no_run
//! use vault_operator::crd::{PolicySpec, ServerReference};
//!
//! let spec = PolicySpec {
//!     server_ref: ServerReference {
//!         name: "vault".to_string(),
//!         namespace: Some("vault-system".to_string()),
//!     },
//!     name: "read-only".to_string(),
//!     rules: vec![r#"path "secret/data/*" { capabilities = ["read"] }"#.to_string()],
//! };
//! ```

use crate::constants::{CLUSTER_DNS_SUFFIX, DEFAULT_APPROLE_MOUNT, DEFAULT_USERPASS_MOUNT};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in status subresources to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. This operator reports `Ready`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Reference from a configuration resource to the `VaultServer` it targets.
///
/// When `namespace` is omitted the referencing resource's own namespace is used.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerReference {
    /// Name of the `VaultServer`.
    pub name: String,

    /// Namespace of the `VaultServer`. Defaults to the referencing resource's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ServerReference {
    /// Namespace of the referenced server, falling back to `default_namespace`.
    #[must_use]
    pub fn namespace_or<'a>(&'a self, default_namespace: &'a str) -> &'a str {
        match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => ns,
            _ => default_namespace,
        }
    }
}

/// Status shared by every resource synchronized into Vault.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Whether the last reconciliation applied the desired state to Vault.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synchronized: Option<bool>,

    /// Outcome of the last reconciliation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// When the status was last written (RFC3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

// ============================================================================
// VaultServer
// ============================================================================

/// Bootstrap phase of a `VaultServer`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The spec failed validation; nothing was attempted.
    DataNotValidated,
    /// The health endpoint could not be reached.
    NotReachable,
    /// The server answered its health probe.
    Reachable,
    /// The initialization status could not be read.
    InitializationUnknown,
    /// Initialization was attempted and failed.
    NotInitialized,
    /// The seal status could not be read.
    SealStatusUnknown,
    /// Submitting an unseal key failed.
    UnsealError,
    /// The root credentials could not be persisted.
    SaveSecretFailed,
    /// The root credentials could not be read back.
    ReadSecretFailed,
    /// Every requested bootstrap step succeeded.
    Unsealed,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataNotValidated => "DataNotValidated",
            Self::NotReachable => "NotReachable",
            Self::Reachable => "Reachable",
            Self::InitializationUnknown => "InitializationUnknown",
            Self::NotInitialized => "NotInitialized",
            Self::SealStatusUnknown => "SealStatusUnknown",
            Self::UnsealError => "UnsealError",
            Self::SaveSecretFailed => "SaveSecretFailed",
            Self::ReadSecretFailed => "ReadSecretFailed",
            Self::Unsealed => "Unsealed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network location of the Vault service.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VaultServerConfig {
    /// Kubernetes service name (or host name) of the Vault API.
    pub service_name: String,

    /// API port. `0` leaves the port out of the endpoint.
    #[serde(default)]
    pub port: i32,

    /// Namespace of the service. When empty the bare service name is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl VaultServerConfig {
    /// Derive the Vault HTTP endpoint.
    ///
    /// `http://<service>[.<namespace>.svc.cluster.local][:<port>]`
    #[must_use]
    pub fn endpoint(&self) -> String {
        let mut endpoint = format!("http://{}", self.service_name);
        if let Some(ns) = self.namespace.as_deref().filter(|ns| !ns.is_empty()) {
            endpoint.push_str(&format!(".{ns}.{CLUSTER_DNS_SUFFIX}"));
        }
        if self.port != 0 {
            endpoint.push_str(&format!(":{}", self.port));
        }
        endpoint
    }
}

/// `VaultServer` describes how to reach a Vault deployment and whether the
/// operator should bootstrap it.
///
/// # Example
///
/// ```yaml
/// apiVersion: vault.ops.community.dev/v1alpha1
/// kind: VaultServer
/// metadata:
///   name: vault
///   namespace: vault-system
/// spec:
///   server:
///     serviceName: vault
///     namespace: vault-system
///     port: 8200
///   init: true
///   autoUnseal: true
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "vault.ops.community.dev",
    version = "v1alpha1",
    kind = "VaultServer",
    namespaced,
    shortname = "vs",
    doc = "VaultServer describes a Vault deployment. The operator probes it, optionally initializes and unseals it, and stores its root credentials in a companion Secret."
)]
#[kube(status = "VaultServerStatus")]
#[serde(rename_all = "camelCase")]
pub struct VaultServerSpec {
    /// Where the Vault API is served.
    pub server: VaultServerConfig,

    /// Initialize Vault (3 key shares, threshold 3) when it is not initialized yet.
    #[serde(default)]
    pub init: bool,

    /// Unseal Vault with the stored key shares whenever it is sealed.
    #[serde(default)]
    pub auto_unseal: bool,
}

/// `VaultServer` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VaultServerStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

// ============================================================================
// Secret
// ============================================================================

/// A KV-v2 secret written into Vault once.
///
/// Values equal to `{{random}}` are replaced with a generated 32 character
/// alphanumeric string when the secret is created. An existing secret is never
/// overwritten.
///
/// # Example
///
/// ```yaml
/// apiVersion: vault.ops.community.dev/v1alpha1
/// kind: Secret
/// metadata:
///   name: db-credentials
/// spec:
///   serverRef:
///     name: vault
///     namespace: vault-system
///   mountPath: secret
///   path: apps/billing
///   name: db
///   data:
///     user: billing
///     password: "{{random}}"
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "vault.ops.community.dev",
    version = "v1alpha1",
    kind = "Secret",
    root = "VaultSecret",
    namespaced,
    doc = "Secret is a KV-v2 secret created once in Vault. Values set to {{random}} are generated on creation."
)]
#[kube(status = "SyncStatus")]
#[serde(rename_all = "camelCase")]
pub struct VaultSecretSpec {
    pub server_ref: ServerReference,

    /// Mount path of the KV-v2 secret engine (e.g. `secret`).
    pub mount_path: String,

    /// Path of the secret below the mount.
    #[serde(default)]
    pub path: String,

    /// Final path segment of the secret.
    pub name: String,

    /// Key/value pairs stored in the secret.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

// ============================================================================
// Policy
// ============================================================================

/// An ACL policy. Rules are joined with CRLF into a single policy document.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "vault.ops.community.dev",
    version = "v1alpha1",
    kind = "Policy",
    namespaced,
    doc = "Policy is a Vault ACL policy assembled from an ordered list of rules."
)]
#[kube(status = "SyncStatus")]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    pub server_ref: ServerReference,

    /// Name of the policy in Vault.
    pub name: String,

    /// Policy rules in HCL. At least one rule is required.
    #[serde(default)]
    pub rules: Vec<String>,
}

// ============================================================================
// AuthMethod
// ============================================================================

/// An auth method enabled at a mount path.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "vault.ops.community.dev",
    version = "v1alpha1",
    kind = "AuthMethod",
    namespaced,
    doc = "AuthMethod enables a Vault auth method at a mount path."
)]
#[kube(status = "SyncStatus")]
#[serde(rename_all = "camelCase")]
pub struct AuthMethodSpec {
    pub server_ref: ServerReference,

    /// Mount path of the auth method (e.g. `userpass`).
    pub path: String,

    /// Auth method type (e.g. `userpass`, `approle`, `kubernetes`).
    #[serde(rename = "type")]
    pub method_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ============================================================================
// UserPass
// ============================================================================

fn default_userpass_mount() -> String {
    DEFAULT_USERPASS_MOUNT.to_string()
}

/// A userpass account. Created once; password and policies are not resynchronized.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "vault.ops.community.dev",
    version = "v1alpha1",
    kind = "UserPass",
    namespaced,
    doc = "UserPass creates a username/password account under a userpass auth mount."
)]
#[kube(status = "SyncStatus")]
#[serde(rename_all = "camelCase")]
pub struct UserPassSpec {
    pub server_ref: ServerReference,

    /// Mount path of the userpass auth method.
    #[serde(default = "default_userpass_mount")]
    pub mount_path: String,

    pub username: String,

    pub password: String,

    /// Token policies attached to the account.
    #[serde(default)]
    pub policies: Vec<String>,
}

// ============================================================================
// AppRole
// ============================================================================

fn default_approle_mount() -> String {
    DEFAULT_APPROLE_MOUNT.to_string()
}

/// Where to materialize the role id and a freshly minted secret id.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppRoleExport {
    /// Namespace receiving the `approle-<name>-secret` Secret.
    pub namespace: String,
}

/// An `AppRole` role, optionally exported as a Kubernetes secret.
///
/// # Example
///
/// ```yaml
/// apiVersion: vault.ops.community.dev/v1alpha1
/// kind: AppRole
/// metadata:
///   name: ci
/// spec:
///   serverRef:
///     name: vault
///   name: ci-runner
///   policies: ["ci-read"]
///   secretIdTtl: 3600
///   export:
///     namespace: ci
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "vault.ops.community.dev",
    version = "v1alpha1",
    kind = "AppRole",
    namespaced,
    doc = "AppRole creates or updates a Vault AppRole role and can export its credentials to a Secret."
)]
#[kube(status = "SyncStatus")]
#[serde(rename_all = "camelCase")]
pub struct AppRoleSpec {
    pub server_ref: ServerReference,

    /// Mount path of the approle auth method.
    #[serde(default = "default_approle_mount")]
    pub mount_path: String,

    /// Role name in Vault.
    pub name: String,

    #[serde(default)]
    pub policies: Vec<String>,

    /// Time-to-live of generated secret ids in seconds. `0` means no expiry.
    #[serde(default)]
    #[schemars(range(min = 0))]
    pub secret_id_ttl: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<AppRoleExport>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
