// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `AuthMethod` reconciler.

use super::finalizers::FinalizerCleanup;
use super::lifecycle::VaultResource;
use super::status::SyncOutcome;
use crate::constants::{FINALIZER_AUTH_METHOD, KIND_AUTH_METHOD};
use crate::context::SecretStore;
use crate::crd::{AuthMethod, AuthMethodSpec, ServerReference, SyncStatus};
use crate::metrics;
use crate::vault::auth::AuthMethodOperator;
use crate::vault::VaultApi;
use anyhow::Result;
use async_trait::async_trait;

/// Enable the auth method unless one is already mounted at the path.
pub async fn sync_auth_method(spec: &AuthMethodSpec, vault: &dyn VaultApi) -> SyncOutcome {
    match AuthMethodOperator::new(vault)
        .enable(&spec.path, &spec.method_type, spec.description.as_deref())
        .await
    {
        Ok(enabled) => {
            if enabled {
                metrics::record_resource_created(KIND_AUTH_METHOD);
            }
            SyncOutcome::synced("Auth method synchronized successfully")
        }
        Err(e) => SyncOutcome::failed(format!("Failed to enable auth method: {e}")),
    }
}

#[async_trait]
impl FinalizerCleanup for AuthMethod {
    async fn cleanup(&self, vault: &dyn VaultApi) -> Result<()> {
        AuthMethodOperator::new(vault).disable(&self.spec.path).await?;
        Ok(())
    }
}

#[async_trait]
impl VaultResource for AuthMethod {
    const KIND: &'static str = KIND_AUTH_METHOD;
    const FINALIZER: &'static str = FINALIZER_AUTH_METHOD;

    fn server_ref(&self) -> &ServerReference {
        &self.spec.server_ref
    }

    fn sync_status(&self) -> Option<&SyncStatus> {
        self.status.as_ref()
    }

    async fn synchronize(&self, vault: &dyn VaultApi, _secrets: &dyn SecretStore) -> SyncOutcome {
        sync_auth_method(&self.spec, vault).await
    }
}

#[cfg(test)]
#[path = "authmethod_tests.rs"]
mod authmethod_tests;
