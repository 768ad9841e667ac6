// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes side effects of a reconcile pass.
//!
//! A pass touches the cluster in four ways: it resolves the referenced
//! `VaultServer`, adds or removes its finalizer, and writes its status. The
//! reconcilers go through [`ClusterOps`] for all four, so the ordering of a
//! pass does not depend on a live API server. [`KubeCluster`] is the
//! implementation used by the controllers.

use super::finalizers::{ensure_finalizer, remove_finalizer};
use super::status::update_status_with_retry;
use crate::context::{resolve_operator_client, Context, OperatorClient};
use crate::crd::ServerReference;
use crate::errors::ClientResolutionError;
use anyhow::Result;
use async_trait::async_trait;
use kube::core::NamespaceResourceScope;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;

/// Builds the status JSON from the latest copy of an object.
pub type StatusBuilder<'a, T> = &'a (dyn Fn(&T) -> Value + Send + Sync);

/// Cluster writes and lookups performed while reconciling objects of type `T`.
#[async_trait]
pub trait ClusterOps<T: Send + Sync>: Send + Sync {
    /// Resolve `server_ref` into an authenticated Vault client.
    ///
    /// # Errors
    ///
    /// Returns an error if the server, its credential secret or the root token
    /// cannot be found.
    async fn resolve_client(
        &self,
        server_ref: &ServerReference,
        namespace: &str,
    ) -> Result<OperatorClient, ClientResolutionError>;

    /// Add `finalizer` to `resource`.
    ///
    /// # Errors
    ///
    /// Returns an error if the patch is rejected.
    async fn add_finalizer(&self, resource: &T, finalizer: &str) -> Result<()>;

    /// Remove `finalizer` from `resource`.
    ///
    /// # Errors
    ///
    /// Returns an error if the patch is rejected.
    async fn remove_finalizer(&self, resource: &T, finalizer: &str) -> Result<()>;

    /// Write the status `build_status` computes from the latest copy of `resource`.
    ///
    /// # Errors
    ///
    /// Returns the fetch or patch error, or the conflict once retries are spent.
    async fn write_status(
        &self,
        resource: &T,
        build_status: StatusBuilder<'_, T>,
    ) -> Result<(), kube::Error>;
}

/// [`ClusterOps`] backed by the Kubernetes API.
pub struct KubeCluster<'a> {
    ctx: &'a Context,
}

impl<'a> KubeCluster<'a> {
    #[must_use]
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl<T> ClusterOps<T> for KubeCluster<'_>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync,
{
    async fn resolve_client(
        &self,
        server_ref: &ServerReference,
        namespace: &str,
    ) -> Result<OperatorClient, ClientResolutionError> {
        resolve_operator_client(self.ctx, server_ref, namespace).await
    }

    async fn add_finalizer(&self, resource: &T, finalizer: &str) -> Result<()> {
        ensure_finalizer(&self.ctx.client, resource, finalizer).await
    }

    async fn remove_finalizer(&self, resource: &T, finalizer: &str) -> Result<()> {
        remove_finalizer(&self.ctx.client, resource, finalizer).await
    }

    async fn write_status(
        &self,
        resource: &T,
        build_status: StatusBuilder<'_, T>,
    ) -> Result<(), kube::Error> {
        let namespace = resource.namespace().unwrap_or_default();
        let name = resource.name_any();
        update_status_with_retry::<T, _>(&self.ctx.client, &namespace, &name, build_status).await
    }
}

/// Recording [`ClusterOps`] for unit tests.
///
/// Resolution hands out the configured [`FakeVault`](crate::vault::testing::FakeVault),
/// or fails with "server not found" when none is set. Status writes build the
/// status from the object passed in.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingCluster {
    pub vault: Option<crate::vault::testing::FakeVault>,
    pub calls: std::sync::Mutex<Vec<String>>,
    pub statuses: std::sync::Mutex<Vec<Value>>,
    pub failing: std::sync::Mutex<std::collections::BTreeSet<&'static str>>,
    /// Vault calls already made when the finalizer was removed
    pub vault_calls_at_removal: std::sync::Mutex<Option<Vec<String>>>,
}

#[cfg(test)]
impl RecordingCluster {
    pub fn resolving_to(vault: crate::vault::testing::FakeVault) -> Self {
        Self {
            vault: Some(vault),
            ..Default::default()
        }
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_status(&self) -> Option<Value> {
        self.statuses.lock().unwrap().last().cloned()
    }

    /// Record the call; `true` when it is configured to fail.
    fn enter(&self, op: &'static str) -> bool {
        self.calls.lock().unwrap().push(op.to_string());
        self.failing.lock().unwrap().contains(op)
    }
}

#[cfg(test)]
#[async_trait]
impl<T: Send + Sync> ClusterOps<T> for RecordingCluster {
    async fn resolve_client(
        &self,
        server_ref: &ServerReference,
        namespace: &str,
    ) -> Result<OperatorClient, ClientResolutionError> {
        self.enter("resolve_client");
        match &self.vault {
            Some(vault) => Ok(OperatorClient {
                vault: std::sync::Arc::new(vault.clone()),
                token: "s.root".to_string(),
                endpoint: "http://vault.vault-system.svc.cluster.local:8200".to_string(),
            }),
            None => Err(ClientResolutionError::ServerNotFound {
                namespace: server_ref.namespace_or(namespace).to_string(),
                name: server_ref.name.clone(),
            }),
        }
    }

    async fn add_finalizer(&self, _resource: &T, _finalizer: &str) -> Result<()> {
        if self.enter("add_finalizer") {
            anyhow::bail!("add_finalizer rejected");
        }
        Ok(())
    }

    async fn remove_finalizer(&self, _resource: &T, _finalizer: &str) -> Result<()> {
        let snapshot = self.vault.as_ref().map(crate::vault::testing::FakeVault::calls);
        *self.vault_calls_at_removal.lock().unwrap() = snapshot;
        if self.enter("remove_finalizer") {
            anyhow::bail!("remove_finalizer rejected");
        }
        Ok(())
    }

    async fn write_status(
        &self,
        resource: &T,
        build_status: StatusBuilder<'_, T>,
    ) -> Result<(), kube::Error> {
        if self.enter("write_status") {
            return Err(kube::Error::Api(Box::new(kube::core::Status {
                status: None,
                code: 409,
                message: "the object has been modified".to_string(),
                reason: "Conflict".to_string(),
                metadata: None,
                details: None,
            })));
        }
        self.statuses.lock().unwrap().push(build_status(resource));
        Ok(())
    }
}
