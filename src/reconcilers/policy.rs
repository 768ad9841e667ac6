// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `Policy` reconciler.

use super::finalizers::FinalizerCleanup;
use super::lifecycle::VaultResource;
use super::status::SyncOutcome;
use crate::constants::{FINALIZER_POLICY, KIND_POLICY};
use crate::context::SecretStore;
use crate::crd::{Policy, PolicySpec, ServerReference, SyncStatus};
use crate::vault::policy::PolicyOperator;
use crate::vault::VaultApi;
use anyhow::Result;
use async_trait::async_trait;

/// Validate and write the ACL policy. Writes always overwrite.
pub async fn sync_policy(spec: &PolicySpec, vault: &dyn VaultApi) -> SyncOutcome {
    match PolicyOperator::new(vault)
        .create_or_update(&spec.name, &spec.rules)
        .await
    {
        Ok(()) => SyncOutcome::synced("Policy synchronized"),
        Err(e) => SyncOutcome::failed(format!("Failed to sync policy {}: {e}", spec.name)),
    }
}

#[async_trait]
impl FinalizerCleanup for Policy {
    async fn cleanup(&self, vault: &dyn VaultApi) -> Result<()> {
        PolicyOperator::new(vault).delete(&self.spec.name).await?;
        Ok(())
    }
}

#[async_trait]
impl VaultResource for Policy {
    const KIND: &'static str = KIND_POLICY;
    const FINALIZER: &'static str = FINALIZER_POLICY;

    fn server_ref(&self) -> &ServerReference {
        &self.spec.server_ref
    }

    fn sync_status(&self) -> Option<&SyncStatus> {
        self.status.as_ref()
    }

    async fn synchronize(&self, vault: &dyn VaultApi, _secrets: &dyn SecretStore) -> SyncOutcome {
        sync_policy(&self.spec, vault).await
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod policy_tests;
