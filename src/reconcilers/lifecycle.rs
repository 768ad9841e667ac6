// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation skeleton shared by the five kinds synchronized into Vault.
//!
//! One pass over a resource:
//!
//! 1. Resolve the `VaultServer` reference into an authenticated client.
//! 2. Branch on deletion and finalizer presence (see [`super::finalizers`]).
//! 3. Run the kind's synchronization body.
//! 4. Write `synchronized`, message and the `Ready` condition to the status.
//!
//! Successful passes requeue after the long interval, failed ones after the
//! short interval. A status write that still conflicts after its retries fails
//! the pass so the controller's error policy requeues it.

use super::cluster::{ClusterOps, KubeCluster};
use super::finalizers::{finalizer_action, handle_deletion, FinalizerAction, FinalizerCleanup};
use super::status::{next_sync_status, SyncOutcome};
use crate::config::OperatorConfig;
use crate::context::{Context, SecretStore};
use crate::crd::{ServerReference, SyncStatus};
use crate::metrics;
use crate::vault::VaultApi;
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use kube::core::NamespaceResourceScope;
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A custom resource whose desired state is applied to a Vault server.
#[async_trait]
pub trait VaultResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + ResourceExt
    + FinalizerCleanup
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Kind name used in logs and metrics
    const KIND: &'static str;

    /// Finalizer guarding the Vault-side state
    const FINALIZER: &'static str;

    fn server_ref(&self) -> &ServerReference;

    fn sync_status(&self) -> Option<&SyncStatus>;

    /// Apply the desired state to Vault and describe the result.
    async fn synchronize(&self, vault: &dyn VaultApi, secrets: &dyn SecretStore) -> SyncOutcome;
}

/// Write the outcome of a pass to the resource's status.
///
/// # Errors
///
/// Returns an error if the status cannot be written.
pub async fn write_sync_status<T: VaultResource>(
    cluster: &dyn ClusterOps<T>,
    resource: &T,
    outcome: &SyncOutcome,
) -> Result<(), kube::Error> {
    let build = |latest: &T| {
        serde_json::to_value(next_sync_status(latest.sync_status(), outcome)).unwrap_or_default()
    };
    cluster.write_status(resource, &build).await
}

/// Reconcile one resource of a Vault-synchronized kind.
///
/// # Errors
///
/// Returns an error when a finalizer patch, the Vault cleanup of a deleted
/// resource, or the status write fails.
pub async fn reconcile_vault_resource<T: VaultResource>(
    resource: Arc<T>,
    ctx: Arc<Context>,
) -> Result<Action> {
    reconcile_pass(
        resource.as_ref(),
        &KubeCluster::new(&ctx),
        ctx.secrets.as_ref(),
        &ctx.config,
    )
    .await
}

/// One reconcile pass over `resource`, with its cluster side effects going
/// through `cluster`.
///
/// # Errors
///
/// Returns an error when a finalizer patch, the Vault cleanup of a deleted
/// resource, or the status write fails.
pub async fn reconcile_pass<T: VaultResource>(
    resource: &T,
    cluster: &dyn ClusterOps<T>,
    secrets: &dyn SecretStore,
    config: &OperatorConfig,
) -> Result<Action> {
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    let action = finalizer_action(resource, T::FINALIZER);
    if action == FinalizerAction::Release {
        debug!(kind = T::KIND, resource = %name, namespace = %namespace, "Deleted without finalizer, nothing to clean up");
        return Ok(Action::await_change());
    }

    let client = match cluster.resolve_client(resource.server_ref(), &namespace).await {
        Ok(client) => client,
        Err(e) => {
            warn!(
                kind = T::KIND,
                resource = %name,
                namespace = %namespace,
                error = %e,
                "Failed to resolve Vault server"
            );
            metrics::record_error(T::KIND, "client_resolution");
            let outcome = SyncOutcome::failed(format!("Failed to get vault operator client: {e}"));
            write_sync_status(cluster, resource, &outcome)
                .await
                .with_context(|| format!("failed to update status of {} {namespace}/{name}", T::KIND))?;
            return Ok(Action::requeue(config.error_requeue));
        }
    };

    match action {
        FinalizerAction::Cleanup => {
            handle_deletion(cluster, resource, client.vault.as_ref(), T::FINALIZER)
                .await
                .with_context(|| format!("failed to clean up {} {namespace}/{name}", T::KIND))?;
            metrics::record_resource_deleted(T::KIND);
            return Ok(Action::await_change());
        }
        FinalizerAction::Add => {
            cluster.add_finalizer(resource, T::FINALIZER).await?;
            return Ok(Action::await_change());
        }
        FinalizerAction::Release | FinalizerAction::Proceed => {}
    }

    let outcome = resource.synchronize(client.vault.as_ref(), secrets).await;

    if outcome.synchronized {
        info!(kind = T::KIND, resource = %name, namespace = %namespace, "{}", outcome.message);
    } else {
        warn!(kind = T::KIND, resource = %name, namespace = %namespace, "{}", outcome.message);
    }

    write_sync_status(cluster, resource, &outcome)
        .await
        .with_context(|| format!("failed to update status of {} {namespace}/{name}", T::KIND))?;

    Ok(requeue_for(config, &outcome))
}

/// Requeue interval for a finished pass.
#[must_use]
pub fn requeue_for(config: &OperatorConfig, outcome: &SyncOutcome) -> Action {
    if outcome.synchronized {
        Action::requeue(config.success_requeue)
    } else {
        Action::requeue(config.error_requeue)
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod lifecycle_tests;
