// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `Secret` reconciler: create-once KV-v2 secrets.

use super::finalizers::FinalizerCleanup;
use super::lifecycle::VaultResource;
use super::status::SyncOutcome;
use crate::constants::{FINALIZER_SECRET, KIND_SECRET, KV_V2_ENGINE_TYPE};
use crate::context::SecretStore;
use crate::crd::{ServerReference, SyncStatus, VaultSecret, VaultSecretSpec};
use crate::errors::VaultError;
use crate::metrics;
use crate::vault::kv::{join_secret_path, KvSecretOperator, KvWriteOutcome};
use crate::vault::secret_engine::SecretEngineOperator;
use crate::vault::VaultApi;
use anyhow::Result;
use async_trait::async_trait;

/// Full location of the secret, `<mount>/<path>/<name>`.
#[must_use]
pub fn secret_location(spec: &VaultSecretSpec) -> String {
    format!(
        "{}/{}",
        spec.mount_path.trim_matches('/'),
        join_secret_path(&spec.path, &spec.name)
    )
}

async fn write_secret(spec: &VaultSecretSpec, vault: &dyn VaultApi) -> Result<KvWriteOutcome, VaultError> {
    SecretEngineOperator::new(vault)
        .enable(&spec.mount_path, KV_V2_ENGINE_TYPE)
        .await?;
    KvSecretOperator::new(vault)
        .create_or_update(&spec.mount_path, &spec.path, &spec.name, &spec.data)
        .await
}

/// Ensure the KV-v2 mount exists and write the secret unless it already does.
pub async fn sync_secret(spec: &VaultSecretSpec, vault: &dyn VaultApi) -> SyncOutcome {
    match write_secret(spec, vault).await {
        Ok(outcome) => {
            if outcome == KvWriteOutcome::Created {
                metrics::record_resource_created(KIND_SECRET);
            }
            SyncOutcome::synced("Secret synchronized")
        }
        Err(e) => SyncOutcome::failed(format!(
            "Not possible to create/update secret at path: {}: {e}",
            secret_location(spec)
        )),
    }
}

#[async_trait]
impl FinalizerCleanup for VaultSecret {
    async fn cleanup(&self, vault: &dyn VaultApi) -> Result<()> {
        KvSecretOperator::new(vault)
            .delete(&self.spec.mount_path, &self.spec.path, &self.spec.name)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VaultResource for VaultSecret {
    const KIND: &'static str = KIND_SECRET;
    const FINALIZER: &'static str = FINALIZER_SECRET;

    fn server_ref(&self) -> &ServerReference {
        &self.spec.server_ref
    }

    fn sync_status(&self) -> Option<&SyncStatus> {
        self.status.as_ref()
    }

    async fn synchronize(&self, vault: &dyn VaultApi, _secrets: &dyn SecretStore) -> SyncOutcome {
        sync_secret(&self.spec, vault).await
    }
}

#[cfg(test)]
#[path = "secret_tests.rs"]
mod secret_tests;
