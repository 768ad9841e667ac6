// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `UserPass` reconciler.
//!
//! Accounts are created once; later spec changes to the password or policies
//! are not pushed to Vault.

use super::finalizers::FinalizerCleanup;
use super::lifecycle::VaultResource;
use super::status::SyncOutcome;
use crate::constants::{FINALIZER_USER_PASS, KIND_USER_PASS};
use crate::context::SecretStore;
use crate::crd::{ServerReference, SyncStatus, UserPass, UserPassSpec};
use crate::metrics;
use crate::vault::userpass::UserPassOperator;
use crate::vault::VaultApi;
use anyhow::Result;
use async_trait::async_trait;

pub async fn sync_userpass(spec: &UserPassSpec, vault: &dyn VaultApi) -> SyncOutcome {
    match UserPassOperator::new(vault)
        .create_if_absent(&spec.mount_path, &spec.username, &spec.password, &spec.policies)
        .await
    {
        Ok(created) => {
            if created {
                metrics::record_resource_created(KIND_USER_PASS);
            }
            SyncOutcome::synced("User synchronized successfully")
        }
        Err(e) => SyncOutcome::failed(format!("Failed to create/update user: {e}")),
    }
}

#[async_trait]
impl FinalizerCleanup for UserPass {
    async fn cleanup(&self, vault: &dyn VaultApi) -> Result<()> {
        UserPassOperator::new(vault)
            .delete(&self.spec.mount_path, &self.spec.username)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VaultResource for UserPass {
    const KIND: &'static str = KIND_USER_PASS;
    const FINALIZER: &'static str = FINALIZER_USER_PASS;

    fn server_ref(&self) -> &ServerReference {
        &self.spec.server_ref
    }

    fn sync_status(&self) -> Option<&SyncStatus> {
        self.status.as_ref()
    }

    async fn synchronize(&self, vault: &dyn VaultApi, _secrets: &dyn SecretStore) -> SyncOutcome {
        sync_userpass(&self.spec, vault).await
    }
}

#[cfg(test)]
#[path = "userpass_tests.rs"]
mod userpass_tests;
