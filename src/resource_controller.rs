// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Controller wiring for the operator's custom resources.
//!
//! One generic controller serves the five kinds synchronized into Vault
//! ([`run_resource_controller`]); the `VaultServer` controller additionally
//! watches the credential secrets it owns ([`run_vault_server_controller`]).
//!
//! Every invocation runs under the configured reconcile deadline. When the
//! deadline expires the in-flight Vault and Kubernetes calls are dropped and
//! the invocation fails, so the error policy requeues it.

use crate::context::Context;
use crate::crd::VaultServer;
use crate::metrics;
use crate::reconcilers::lifecycle::{reconcile_vault_resource, VaultResource};
use crate::reconcilers::vaultserver::reconcile_vault_server;
use anyhow::{anyhow, Result};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::runtime::controller::Action;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Resource, ResourceExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Error type of a controller invocation
pub const ERROR_TYPE_RECONCILE: &str = "reconcile_error";

/// Error type of an invocation that exceeded its deadline
pub const ERROR_TYPE_TIMEOUT: &str = "timeout";

/// Reconciliation error wrapper
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ReconcileError(#[from] anyhow::Error);

/// Error policy shared by all controllers.
///
/// Returns an action to requeue the resource after the error interval.
#[allow(clippy::needless_pass_by_value)] // Signature required by kube::runtime::Controller
fn error_policy<T>(resource: Arc<T>, err: &ReconcileError, ctx: Arc<Context>) -> Action
where
    T: Resource<DynamicType = ()>,
{
    metrics::record_reconciliation_requeue(&T::kind(&()), ERROR_TYPE_RECONCILE);
    error!(
        error = %err,
        resource = %resource.name_any(),
        namespace = %resource.namespace().unwrap_or_default(),
        "Reconciliation error - will retry in {}s",
        ctx.config.error_requeue.as_secs()
    );
    Action::requeue(ctx.config.error_requeue)
}

/// Run `reconcile` under the reconcile deadline and record its metrics.
async fn instrumented<F>(kind: &str, ctx: &Context, reconcile: F) -> Result<Action, ReconcileError>
where
    F: Future<Output = Result<Action>>,
{
    let start = Instant::now();
    let result = match tokio::time::timeout(ctx.config.reconcile_timeout, reconcile).await {
        Ok(result) => result,
        Err(_) => {
            metrics::record_error(kind, ERROR_TYPE_TIMEOUT);
            Err(anyhow!(
                "{kind} reconciliation exceeded {}s deadline",
                ctx.config.reconcile_timeout.as_secs()
            ))
        }
    };

    let duration = start.elapsed();
    match &result {
        Ok(_) => metrics::record_reconciliation_success(kind, duration),
        Err(_) => {
            metrics::record_reconciliation_error(kind, duration);
            metrics::record_error(kind, ERROR_TYPE_RECONCILE);
        }
    }

    result.map_err(ReconcileError::from)
}

async fn reconcile_wrapper<T: VaultResource>(
    resource: Arc<T>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    instrumented(T::KIND, &ctx, reconcile_vault_resource(resource, ctx.clone())).await
}

async fn reconcile_server_wrapper(
    server: Arc<VaultServer>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    instrumented(
        crate::constants::KIND_VAULT_SERVER,
        &ctx,
        reconcile_vault_server(server, ctx.clone()),
    )
    .await
}

/// Run the controller for one Vault-synchronized kind across all namespaces.
///
/// # Errors
///
/// Returns an error if the controller fails to start.
pub async fn run_resource_controller<T: VaultResource>(context: Arc<Context>) -> Result<()> {
    info!("Starting {} controller", T::KIND);

    let api = Api::<T>::all(context.client.clone());

    Controller::new(api, WatcherConfig::default())
        .run(reconcile_wrapper::<T>, error_policy, context)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `VaultServer` controller, also reacting to changes of owned credential secrets.
///
/// # Errors
///
/// Returns an error if the controller fails to start.
pub async fn run_vault_server_controller(context: Arc<Context>) -> Result<()> {
    info!("Starting VaultServer controller");

    let client = context.client.clone();
    let api = Api::<VaultServer>::all(client.clone());
    let secrets = Api::<Secret>::all(client);

    Controller::new(api, WatcherConfig::default())
        .owns(secrets, WatcherConfig::default())
        .run(reconcile_server_wrapper, error_policy, context)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}
