// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers and Vault client resolution.
//!
//! All controllers receive an `Arc<Context>` that contains:
//! - Kubernetes client
//! - Factory building Vault clients for a resolved server
//! - Store for the Kubernetes Secrets the operator reads and writes
//! - Runtime configuration
//!
//! A resource never caches its Vault client. Every reconciliation resolves its
//! [`ServerReference`] again through [`resolve_operator_client`], since the root
//! token stored next to the server may rotate.

use crate::config::OperatorConfig;
use crate::constants::{FIELD_MANAGER, ROOT_TOKEN_KEY, SERVER_CREDENTIAL_SUFFIX};
use crate::crd::{ServerReference, VaultServer};
use crate::errors::ClientResolutionError;
use crate::vault::{VaultApi, VaultClientFactory};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Shared context passed to all controllers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Builds Vault clients for resolved endpoints
    pub vault_factory: Arc<dyn VaultClientFactory>,

    /// Reads credential secrets and writes managed ones
    pub secrets: Arc<dyn SecretStore>,

    pub config: OperatorConfig,
}

/// Access to Kubernetes `Secret` objects.
///
/// Writes are create-or-replace: the secret is applied server-side with the
/// operator's field manager.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a secret, `None` when it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error>;

    /// Create or replace a secret. Name and namespace are taken from its metadata.
    async fn apply(&self, secret: &Secret) -> Result<()>;
}

/// [`SecretStore`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await
    }

    async fn apply(&self, secret: &Secret) -> Result<()> {
        let name = secret
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| anyhow!("secret has no name"))?;
        let namespace = secret
            .metadata
            .namespace
            .as_deref()
            .ok_or_else(|| anyhow!("secret {name} has no namespace"))?;

        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.patch(
            name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(secret),
        )
        .await?;

        debug!(secret = %name, namespace = %namespace, "Applied secret");
        Ok(())
    }
}

/// Vault client resolved for one reconciliation.
pub struct OperatorClient {
    pub vault: Arc<dyn VaultApi>,
    pub token: String,
    pub endpoint: String,
}

impl fmt::Debug for OperatorClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorClient")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Name of the secret holding a server's root token and unseal keys.
#[must_use]
pub fn credential_secret_name(server_name: &str) -> String {
    format!("{server_name}{SERVER_CREDENTIAL_SUFFIX}")
}

/// Extract the root token from a server credential secret.
///
/// # Errors
///
/// Returns [`ClientResolutionError::MissingRootToken`] when the key is absent,
/// empty or not valid UTF-8.
pub fn root_token_from_secret(
    secret: &Secret,
    namespace: &str,
    name: &str,
) -> Result<String, ClientResolutionError> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(ROOT_TOKEN_KEY))
        .and_then(|bytes| String::from_utf8(bytes.0.clone()).ok())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ClientResolutionError::MissingRootToken {
            namespace: namespace.to_string(),
            name: name.to_string(),
            key: ROOT_TOKEN_KEY.to_string(),
        })
}

/// Build the authenticated client for `endpoint` from the server's credential secret.
///
/// # Errors
///
/// Returns an error if the secret carries no root token or the client cannot be built.
pub fn build_operator_client(
    factory: &dyn VaultClientFactory,
    endpoint: &str,
    credentials: &Secret,
    namespace: &str,
    secret_name: &str,
    timeout: Duration,
) -> Result<OperatorClient, ClientResolutionError> {
    let token = root_token_from_secret(credentials, namespace, secret_name)?;
    let vault = factory
        .build(endpoint, Some(&token), timeout)
        .map_err(|source| ClientResolutionError::Client {
            endpoint: endpoint.to_string(),
            source,
        })?;

    Ok(OperatorClient {
        vault,
        token,
        endpoint: endpoint.to_string(),
    })
}

/// Resolve the Vault client for a resource referencing `server_ref`.
///
/// The reference namespace defaults to `default_namespace` (the referencing
/// resource's own namespace).
///
/// # Errors
///
/// Returns an error if the `VaultServer`, its credential secret or the root
/// token is missing, or a lookup fails.
pub async fn resolve_operator_client(
    ctx: &Context,
    server_ref: &ServerReference,
    default_namespace: &str,
) -> Result<OperatorClient, ClientResolutionError> {
    let namespace = server_ref.namespace_or(default_namespace);
    let servers: Api<VaultServer> = Api::namespaced(ctx.client.clone(), namespace);

    let server = servers
        .get_opt(&server_ref.name)
        .await
        .map_err(|source| ClientResolutionError::Lookup {
            what: format!("VaultServer {namespace}/{}", server_ref.name),
            source,
        })?
        .ok_or_else(|| ClientResolutionError::ServerNotFound {
            namespace: namespace.to_string(),
            name: server_ref.name.clone(),
        })?;

    let secret_name = credential_secret_name(&server_ref.name);
    let credentials = ctx
        .secrets
        .get(namespace, &secret_name)
        .await
        .map_err(|source| ClientResolutionError::Lookup {
            what: format!("secret {namespace}/{secret_name}"),
            source,
        })?
        .ok_or_else(|| ClientResolutionError::CredentialsNotFound {
            namespace: namespace.to_string(),
            name: secret_name.clone(),
        })?;

    let endpoint = server.spec.server.endpoint();
    debug!(
        server = %server_ref.name,
        namespace = %namespace,
        endpoint = %endpoint,
        "Resolved Vault server"
    );

    build_operator_client(
        ctx.vault_factory.as_ref(),
        &endpoint,
        &credentials,
        namespace,
        &secret_name,
        ctx.config.vault_request_timeout,
    )
}

/// In-memory [`SecretStore`] for unit tests.
#[cfg(test)]
#[derive(Default, Clone)]
pub(crate) struct MemorySecretStore {
    pub secrets: Arc<std::sync::Mutex<std::collections::BTreeMap<(String, String), Secret>>>,
    pub fail_apply: bool,
}

#[cfg(test)]
impl MemorySecretStore {
    pub fn insert(&self, secret: Secret) {
        let key = (
            secret.metadata.namespace.clone().unwrap_or_default(),
            secret.metadata.name.clone().unwrap_or_default(),
        );
        self.secrets.lock().unwrap().insert(key, secret);
    }

    pub fn find(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }
}

#[cfg(test)]
#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error> {
        Ok(self.find(namespace, name))
    }

    async fn apply(&self, secret: &Secret) -> Result<()> {
        if self.fail_apply {
            return Err(anyhow!("apply rejected"));
        }
        self.insert(secret.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
