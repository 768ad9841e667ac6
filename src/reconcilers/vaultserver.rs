// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `VaultServer` reconciler: the bootstrap state machine.
//!
//! One pass walks the server through these steps and stops at the first
//! failure, reporting the phase it failed in:
//!
//! | Step | Failure phase |
//! |------|---------------|
//! | validate spec | `DataNotValidated` |
//! | health probe | `NotReachable` |
//! | read init status (`init: true`) | `InitializationUnknown` |
//! | initialize | `NotInitialized` |
//! | persist root token and keys | `SaveSecretFailed` |
//! | read seal status (`autoUnseal: true`) | `SealStatusUnknown` |
//! | read unseal keys | `ReadSecretFailed` |
//! | submit unseal keys | `UnsealError` |
//!
//! A pass that completes every requested step ends in `Unsealed`.
//!
//! The root token and unseal keys live in the `<server>-secret` Secret next to
//! the server, owned by it so Kubernetes garbage-collects it with the server.

use super::cluster::{ClusterOps, KubeCluster};
use super::finalizers::{finalizer_action, handle_deletion, FinalizerAction, FinalizerCleanup};
use super::status::next_server_status;
use crate::config::OperatorConfig;
use crate::constants::{
    API_GROUP_VERSION, FINALIZER_VAULT_SERVER, KIND_VAULT_SERVER, ROOT_TOKEN_KEY,
};
use crate::context::{credential_secret_name, Context, SecretStore};
use crate::crd::{Phase, VaultServer, VaultServerSpec};
use crate::errors::BootstrapError;
use crate::metrics;
use crate::vault::system::SystemOperator;
use crate::vault::{InitResponse, VaultApi, VaultClientFactory};
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::ByteString;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Status message of a server that completed its bootstrap.
pub const OPERATIONAL_MESSAGE: &str = "Vault is operational";

/// Check that the server can be addressed.
///
/// # Errors
///
/// Returns a `DataNotValidated` error for an empty service name or a port
/// outside `1..=65535`.
pub fn validate_spec(spec: &VaultServerSpec) -> Result<(), BootstrapError> {
    if spec.server.service_name.trim().is_empty() {
        return Err(BootstrapError::new(
            Phase::DataNotValidated,
            "server.serviceName cannot be empty",
        ));
    }
    if !(1..=65535).contains(&spec.server.port) {
        return Err(BootstrapError::new(
            Phase::DataNotValidated,
            format!("server.port {} is not in 1..65535", spec.server.port),
        ));
    }
    Ok(())
}

/// Build the credential secret holding the root token and the unseal keys.
///
/// Keys are `root_token` and `"1".."N"` in share order.
#[must_use]
pub fn build_credential_secret(server: &VaultServer, init: &InitResponse) -> Secret {
    let name = server.name_any();

    let mut data = BTreeMap::new();
    data.insert(
        ROOT_TOKEN_KEY.to_string(),
        ByteString(init.root_token.as_bytes().to_vec()),
    );
    for (index, key) in init.keys.iter().enumerate() {
        data.insert((index + 1).to_string(), ByteString(key.as_bytes().to_vec()));
    }

    let owner_ref = OwnerReference {
        api_version: API_GROUP_VERSION.to_string(),
        kind: KIND_VAULT_SERVER.to_string(),
        name: name.clone(),
        uid: server.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    };

    Secret {
        metadata: ObjectMeta {
            name: Some(credential_secret_name(&name)),
            namespace: server.namespace(),
            owner_references: Some(vec![owner_ref]),
            ..Default::default()
        },
        data: Some(data),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

/// Unseal keys of a credential secret, ordered by their numeric key.
///
/// Entries whose key is not a number (such as `root_token`) are ignored.
///
/// # Errors
///
/// Returns an error if no numeric key is present or a key share is not UTF-8.
pub fn unseal_keys_from_data(data: &BTreeMap<String, ByteString>) -> Result<Vec<String>, String> {
    let mut shares: Vec<(u32, &ByteString)> = data
        .iter()
        .filter(|(key, _)| key.as_str() != ROOT_TOKEN_KEY)
        .filter_map(|(key, value)| key.parse::<u32>().ok().map(|index| (index, value)))
        .collect();

    if shares.is_empty() {
        return Err("no unseal keys found in secret".to_string());
    }
    shares.sort_by_key(|(index, _)| *index);

    shares
        .into_iter()
        .map(|(index, value)| {
            String::from_utf8(value.0.clone())
                .map_err(|_| format!("unseal key {index} is not valid UTF-8"))
        })
        .collect()
}

async fn initialize_if_needed(
    server: &VaultServer,
    system: &SystemOperator<'_>,
    secrets: &dyn SecretStore,
) -> Result<(), BootstrapError> {
    let initialized = system.is_initialized().await.map_err(|e| {
        BootstrapError::new(
            Phase::InitializationUnknown,
            format!("failed to read initialization status: {e}"),
        )
    })?;
    if initialized {
        debug!(server = %server.name_any(), "Vault already initialized");
        return Ok(());
    }

    let init = system.initialize().await.map_err(|e| {
        BootstrapError::new(Phase::NotInitialized, format!("failed to initialize Vault: {e}"))
    })?;

    secrets
        .apply(&build_credential_secret(server, &init))
        .await
        .map_err(|e| {
            BootstrapError::new(
                Phase::SaveSecretFailed,
                format!("failed to save root token and unseal keys: {e}"),
            )
        })?;

    info!(server = %server.name_any(), "Vault initialized and credentials saved");
    Ok(())
}

async fn unseal_if_needed(
    server: &VaultServer,
    system: &SystemOperator<'_>,
    secrets: &dyn SecretStore,
) -> Result<(), BootstrapError> {
    let sealed = system.is_sealed().await.map_err(|e| {
        BootstrapError::new(Phase::SealStatusUnknown, format!("failed to read seal status: {e}"))
    })?;
    if !sealed {
        debug!(server = %server.name_any(), "Vault already unsealed");
        return Ok(());
    }

    let namespace = server.namespace().unwrap_or_default();
    let secret_name = credential_secret_name(&server.name_any());
    let read_failed = |message: String| {
        BootstrapError::new(
            Phase::ReadSecretFailed,
            format!("failed to read unseal keys from {namespace}/{secret_name}: {message}"),
        )
    };

    let secret = secrets
        .get(&namespace, &secret_name)
        .await
        .map_err(|e| read_failed(e.to_string()))?
        .ok_or_else(|| read_failed("secret not found".to_string()))?;
    let keys = unseal_keys_from_data(&secret.data.unwrap_or_default()).map_err(read_failed)?;

    let still_sealed = system.unseal(&keys).await.map_err(|e| {
        BootstrapError::new(Phase::UnsealError, format!("failed to unseal Vault: {e}"))
    })?;
    if still_sealed {
        return Err(BootstrapError::new(
            Phase::UnsealError,
            format!("Vault is still sealed after submitting {} keys", keys.len()),
        ));
    }
    Ok(())
}

/// Run one pass of the bootstrap state machine.
///
/// # Errors
///
/// Returns the phase and cause of the first failed step.
pub async fn bootstrap(
    server: &VaultServer,
    vault: &dyn VaultApi,
    secrets: &dyn SecretStore,
) -> Result<Phase, BootstrapError> {
    validate_spec(&server.spec)?;

    let system = SystemOperator::new(vault);
    system
        .ping()
        .await
        .map_err(|e| BootstrapError::new(Phase::NotReachable, format!("Vault is not reachable: {e}")))?;
    metrics::record_bootstrap_phase(Phase::Reachable.as_str());

    if server.spec.init {
        initialize_if_needed(server, &system, secrets).await?;
    }
    if server.spec.auto_unseal {
        unseal_if_needed(server, &system, secrets).await?;
    }

    Ok(Phase::Unsealed)
}

/// The server owns nothing in Vault; its credential secret goes away through
/// the owner reference.
#[async_trait]
impl FinalizerCleanup for VaultServer {
    async fn cleanup(&self, _vault: &dyn VaultApi) -> Result<()> {
        Ok(())
    }
}

async fn write_server_status(
    cluster: &dyn ClusterOps<VaultServer>,
    server: &VaultServer,
    phase: Phase,
    message: &str,
) -> Result<(), kube::Error> {
    let build = |latest: &VaultServer| {
        serde_json::to_value(next_server_status(latest.status.as_ref(), phase, message))
            .unwrap_or_default()
    };
    cluster.write_status(server, &build).await
}

/// Reconcile a `VaultServer`.
///
/// # Errors
///
/// Returns an error when a finalizer patch or the status write fails.
pub async fn reconcile_vault_server(server: Arc<VaultServer>, ctx: Arc<Context>) -> Result<Action> {
    reconcile_server_pass(
        server.as_ref(),
        &KubeCluster::new(&ctx),
        ctx.vault_factory.as_ref(),
        ctx.secrets.as_ref(),
        &ctx.config,
    )
    .await
}

/// One bootstrap pass over `server`, with its cluster side effects going
/// through `cluster`.
///
/// # Errors
///
/// Returns an error when a finalizer patch or the status write fails.
pub async fn reconcile_server_pass(
    server: &VaultServer,
    cluster: &dyn ClusterOps<VaultServer>,
    factory: &dyn VaultClientFactory,
    secrets: &dyn SecretStore,
    config: &OperatorConfig,
) -> Result<Action> {
    let namespace = server.namespace().unwrap_or_default();
    let name = server.name_any();
    let endpoint = server.spec.server.endpoint();

    match finalizer_action(server, FINALIZER_VAULT_SERVER) {
        FinalizerAction::Release => return Ok(Action::await_change()),
        FinalizerAction::Cleanup => {
            let vault = factory.build(&endpoint, None, config.vault_request_timeout)?;
            handle_deletion(cluster, server, vault.as_ref(), FINALIZER_VAULT_SERVER)
                .await
                .with_context(|| format!("failed to release VaultServer {namespace}/{name}"))?;
            metrics::record_resource_deleted(KIND_VAULT_SERVER);
            return Ok(Action::await_change());
        }
        FinalizerAction::Add => {
            cluster.add_finalizer(server, FINALIZER_VAULT_SERVER).await?;
            return Ok(Action::await_change());
        }
        FinalizerAction::Proceed => {}
    }

    let result = match factory.build(&endpoint, None, config.vault_request_timeout) {
        Ok(vault) => bootstrap(server, vault.as_ref(), secrets).await,
        Err(e) => Err(BootstrapError::new(
            Phase::NotReachable,
            format!("failed to build Vault client for {endpoint}: {e}"),
        )),
    };

    let (phase, message) = match &result {
        Ok(phase) => {
            info!(server = %name, namespace = %namespace, phase = %phase, "{OPERATIONAL_MESSAGE}");
            (*phase, OPERATIONAL_MESSAGE.to_string())
        }
        Err(e) => {
            warn!(server = %name, namespace = %namespace, phase = %e.phase, error = %e.message, "Vault bootstrap step failed");
            metrics::record_error(KIND_VAULT_SERVER, e.phase.as_str());
            (e.phase, e.message.clone())
        }
    };
    metrics::record_bootstrap_phase(phase.as_str());

    write_server_status(cluster, server, phase, &message)
        .await
        .with_context(|| format!("failed to update status of VaultServer {namespace}/{name}"))?;

    Ok(if result.is_ok() {
        Action::requeue(config.success_requeue)
    } else {
        Action::requeue(config.error_requeue)
    })
}

#[cfg(test)]
#[path = "vaultserver_tests.rs"]
mod vaultserver_tests;
