// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic finalizer management for the operator's custom resources.
//!
//! Every kind follows the same deletion lifecycle:
//!
//! 1. Deleted and finalizer present: run the kind's Vault cleanup, then remove
//!    the finalizer. A failed cleanup keeps the finalizer.
//! 2. Deleted and finalizer absent: nothing is owed.
//! 3. Not deleted and finalizer absent: add the finalizer and stop this pass.
//! 4. Otherwise: synchronize.
//!
//! [`finalizer_action`] decides which branch applies; [`ensure_finalizer`] and
//! [`remove_finalizer`] patch the object. Patches carry the object's
//! `resourceVersion`, so a concurrent change to the finalizer list is rejected
//! with a conflict instead of being overwritten.
//!
//! # Example
//!
//! ```rust,ignore
//! use vault_operator::reconcilers::finalizers::{finalizer_action, FinalizerAction};
//!
//! match finalizer_action(&policy, FINALIZER_POLICY) {
//!     FinalizerAction::Cleanup => handle_deletion(&cluster, &policy, vault, FINALIZER_POLICY).await?,
//!     FinalizerAction::Add => cluster.add_finalizer(&policy, FINALIZER_POLICY).await?,
//!     FinalizerAction::Release => {}
//!     FinalizerAction::Proceed => { /* synchronize */ }
//! }
//! ```

use super::cluster::ClusterOps;
use crate::vault::VaultApi;
use anyhow::Result;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::{json, Value};
use tracing::info;

/// Resources whose Vault-side state must be removed before they disappear.
#[async_trait::async_trait]
pub trait FinalizerCleanup {
    /// Remove the external resource this object manages.
    ///
    /// Removing something that is already gone must succeed. If this returns
    /// an error the finalizer is kept and deletion stays blocked until a later
    /// pass succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if Vault rejects the cleanup.
    async fn cleanup(&self, vault: &dyn VaultApi) -> Result<()>;
}

/// What the lifecycle requires for an object in its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizerAction {
    /// Deleted with our finalizer: clean up Vault, then release the object.
    Cleanup,
    /// Deleted without our finalizer: no cleanup is owed.
    Release,
    /// Live without our finalizer: add it before touching Vault.
    Add,
    /// Live with our finalizer: synchronize.
    Proceed,
}

/// Whether `resource` carries `finalizer`.
pub fn has_finalizer<T: ResourceExt>(resource: &T, finalizer: &str) -> bool {
    resource.finalizers().iter().any(|f| f == finalizer)
}

/// Decide the lifecycle branch for `resource`.
pub fn finalizer_action<T: ResourceExt>(resource: &T, finalizer: &str) -> FinalizerAction {
    let deleting = resource.meta().deletion_timestamp.is_some();
    match (deleting, has_finalizer(resource, finalizer)) {
        (true, true) => FinalizerAction::Cleanup,
        (true, false) => FinalizerAction::Release,
        (false, false) => FinalizerAction::Add,
        (false, true) => FinalizerAction::Proceed,
    }
}

/// Build the merge patch replacing the finalizer list of the copy at `resource_version`.
#[must_use]
pub fn finalizer_patch(resource_version: Option<String>, finalizers: &[String]) -> Value {
    json!({
        "metadata": {
            "resourceVersion": resource_version,
            "finalizers": finalizers,
        }
    })
}

/// Add a finalizer to a resource if not already present.
///
/// # Errors
///
/// Returns an error if the API patch operation fails, including a conflict when
/// the object changed since it was read.
pub async fn ensure_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    if has_finalizer(resource, finalizer) {
        return Ok(());
    }

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    let mut finalizers = resource.finalizers().to_vec();
    finalizers.push(finalizer.to_string());

    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = finalizer_patch(resource.resource_version(), &finalizers);
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    info!(
        kind = %T::kind(&()),
        resource = %name,
        namespace = %namespace,
        finalizer = %finalizer,
        "Added finalizer"
    );
    Ok(())
}

/// Remove a finalizer from a resource.
///
/// # Errors
///
/// Returns an error if the API patch operation fails, including a conflict when
/// the object changed since it was read.
pub async fn remove_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    if !has_finalizer(resource, finalizer) {
        return Ok(());
    }

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    let mut finalizers = resource.finalizers().to_vec();
    finalizers.retain(|f| f != finalizer);

    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = finalizer_patch(resource.resource_version(), &finalizers);
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    info!(
        kind = %T::kind(&()),
        resource = %name,
        namespace = %namespace,
        finalizer = %finalizer,
        "Removed finalizer"
    );
    Ok(())
}

/// Run the resource's Vault cleanup, then remove its finalizer.
///
/// # Errors
///
/// Returns an error if the cleanup or the finalizer removal fails. The
/// finalizer stays in place in both cases.
pub async fn handle_deletion<T>(
    cluster: &dyn ClusterOps<T>,
    resource: &T,
    vault: &dyn VaultApi,
    finalizer: &str,
) -> Result<()>
where
    T: Resource<DynamicType = ()> + FinalizerCleanup + Send + Sync,
{
    info!(
        kind = %T::kind(&()),
        resource = %resource.name_any(),
        namespace = %resource.namespace().unwrap_or_default(),
        "Resource is being deleted, running cleanup"
    );

    resource.cleanup(vault).await?;
    cluster.remove_finalizer(resource, finalizer).await
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
