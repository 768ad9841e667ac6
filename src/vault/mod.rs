// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Vault capability interface and the idempotent operators built on it.
//!
//! [`VaultApi`] exposes the raw Vault HTTP verbs the operator needs. The
//! production implementation is [`client::VaultHttpClient`]; reconcilers only
//! ever see `&dyn VaultApi`, which lets tests substitute an in-memory fake.
//!
//! The operators in the submodules add the idempotence rules on top:
//!
//! - [`secret_engine`] - mount secret engines once
//! - [`kv`] - create-once KV-v2 secrets with random value generation
//! - [`policy`] - ACL policies
//! - [`auth`] - auth method mounts
//! - [`userpass`] - username/password accounts
//! - [`approle`] - `AppRole` roles and credentials
//! - [`system`] - initialization and seal state

use crate::errors::VaultError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub mod approle;
pub mod auth;
pub mod client;
pub mod kv;
pub mod policy;
pub mod secret_engine;
pub mod system;
pub mod userpass;

#[cfg(test)]
pub(crate) mod testing;

/// Response of `GET /v1/sys/health`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    #[serde(default)]
    pub initialized: bool,
    #[serde(default)]
    pub sealed: bool,
    #[serde(default)]
    pub standby: bool,
    #[serde(default)]
    pub version: Option<String>,
}

/// Body of `PUT /v1/sys/init`.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct InitRequest {
    pub secret_shares: u32,
    pub secret_threshold: u32,
}

/// Root token and unseal key shares returned when Vault is initialized.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct InitResponse {
    /// Unseal key shares in share order (hex encoded)
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub keys_base64: Vec<String>,
    pub root_token: String,
}

/// Response of `GET /v1/sys/seal-status` and `PUT /v1/sys/unseal`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct SealStatus {
    pub sealed: bool,
    /// Key shares required to unseal
    #[serde(default, rename = "t")]
    pub threshold: u32,
    /// Total key shares
    #[serde(default, rename = "n")]
    pub shares: u32,
    /// Shares submitted so far
    #[serde(default)]
    pub progress: u32,
}

/// One entry of the secret-engine or auth-method mount tables.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct MountInfo {
    #[serde(rename = "type")]
    pub mount_type: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Role configuration written to `auth/<mount>/role/<name>`.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct AppRoleConfig {
    pub token_policies: Vec<String>,
    /// Secret id TTL as a duration string understood by Vault (seconds)
    pub secret_id_ttl: String,
}

/// Raw Vault HTTP capabilities used by the operators.
///
/// Implementations return [`VaultError::NotFound`] for 404 responses and
/// [`VaultError::OperationFailed`] for every other non-success status.
/// Mount table keys are returned as Vault reports them, with a trailing `/`.
#[async_trait]
pub trait VaultApi: Send + Sync {
    async fn health(&self) -> Result<HealthStatus, VaultError>;
    async fn init_status(&self) -> Result<bool, VaultError>;
    async fn initialize(&self, request: &InitRequest) -> Result<InitResponse, VaultError>;
    async fn seal_status(&self) -> Result<SealStatus, VaultError>;
    async fn unseal(&self, key: &str) -> Result<SealStatus, VaultError>;

    async fn list_mounts(&self) -> Result<BTreeMap<String, MountInfo>, VaultError>;
    async fn enable_mount(&self, path: &str, engine_type: &str) -> Result<(), VaultError>;
    async fn disable_mount(&self, path: &str) -> Result<(), VaultError>;

    /// Read the current version of a KV-v2 secret.
    async fn kv2_read(
        &self,
        mount: &str,
        path: &str,
    ) -> Result<BTreeMap<String, serde_json::Value>, VaultError>;
    async fn kv2_write(
        &self,
        mount: &str,
        path: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<(), VaultError>;
    async fn kv2_delete(&self, mount: &str, path: &str) -> Result<(), VaultError>;

    async fn write_policy(&self, name: &str, document: &str) -> Result<(), VaultError>;
    async fn delete_policy(&self, name: &str) -> Result<(), VaultError>;

    async fn list_auth_methods(&self) -> Result<BTreeMap<String, MountInfo>, VaultError>;
    async fn enable_auth_method(
        &self,
        path: &str,
        method_type: &str,
        description: Option<&str>,
    ) -> Result<(), VaultError>;
    async fn disable_auth_method(&self, path: &str) -> Result<(), VaultError>;

    async fn list_users(&self, mount: &str) -> Result<Vec<String>, VaultError>;
    async fn write_user(
        &self,
        mount: &str,
        username: &str,
        password: &str,
        policies: &[String],
    ) -> Result<(), VaultError>;
    async fn delete_user(&self, mount: &str, username: &str) -> Result<(), VaultError>;

    async fn write_approle(
        &self,
        mount: &str,
        role: &str,
        config: &AppRoleConfig,
    ) -> Result<(), VaultError>;
    async fn read_role_id(&self, mount: &str, role: &str) -> Result<String, VaultError>;
    async fn generate_secret_id(&self, mount: &str, role: &str) -> Result<String, VaultError>;
    async fn delete_approle(&self, mount: &str, role: &str) -> Result<(), VaultError>;
}

/// Builds Vault clients for a resolved endpoint and token.
pub trait VaultClientFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    fn build(
        &self,
        endpoint: &str,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Arc<dyn VaultApi>, VaultError>;
}

/// Factory producing [`client::VaultHttpClient`] instances.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpClientFactory;

impl VaultClientFactory for HttpClientFactory {
    fn build(
        &self,
        endpoint: &str,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Arc<dyn VaultApi>, VaultError> {
        let client = client::VaultHttpClient::new(endpoint, token.map(str::to_string), timeout)?;
        Ok(Arc::new(client))
    }
}

/// Normalize a mount path to the key Vault uses in its mount tables (`path/`).
#[must_use]
pub fn mount_key(path: &str) -> String {
    format!("{}/", path.trim_matches('/'))
}
