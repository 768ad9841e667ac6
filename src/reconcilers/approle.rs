// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `AppRole` reconciler.
//!
//! The role configuration is written on every pass. When `spec.export` names a
//! namespace, the role id and a freshly minted secret id are written to a
//! Kubernetes `Secret` named `approle-<resource name>-secret` there, replacing
//! any previous copy.

use super::finalizers::FinalizerCleanup;
use super::lifecycle::VaultResource;
use super::status::SyncOutcome;
use crate::constants::{
    APPROLE_ROLE_ID_KEY, APPROLE_SECRET_ID_KEY, FINALIZER_APP_ROLE, KIND_APP_ROLE,
};
use crate::context::SecretStore;
use crate::crd::{AppRole, AppRoleSpec, ServerReference, SyncStatus};
use crate::vault::approle::AppRoleOperator;
use crate::vault::VaultApi;
use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::debug;

/// Name of the exported credential secret for the `AppRole` resource `resource_name`.
#[must_use]
pub fn export_secret_name(resource_name: &str) -> String {
    format!("approle-{resource_name}-secret")
}

/// Build the exported credential secret.
#[must_use]
pub fn build_approle_export_secret(
    resource_name: &str,
    namespace: &str,
    role_id: &str,
    secret_id: &str,
) -> Secret {
    let data = BTreeMap::from([
        (
            APPROLE_ROLE_ID_KEY.to_string(),
            ByteString(role_id.as_bytes().to_vec()),
        ),
        (
            APPROLE_SECRET_ID_KEY.to_string(),
            ByteString(secret_id.as_bytes().to_vec()),
        ),
    ]);

    Secret {
        metadata: ObjectMeta {
            name: Some(export_secret_name(resource_name)),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(data),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

/// Write the role and export its credentials when requested.
pub async fn sync_approle(
    resource_name: &str,
    spec: &AppRoleSpec,
    vault: &dyn VaultApi,
    secrets: &dyn SecretStore,
) -> SyncOutcome {
    let operator = AppRoleOperator::new(vault);

    if let Err(e) = operator
        .create_or_update(&spec.mount_path, &spec.name, &spec.policies, spec.secret_id_ttl)
        .await
    {
        return SyncOutcome::failed(format!("Failed to create or update AppRole in Vault: {e}"));
    }

    // An export without a target namespace is treated as no export.
    let Some(export) = spec.export.as_ref().filter(|e| !e.namespace.is_empty()) else {
        return SyncOutcome::synced("AppRole successfully synchronized");
    };

    let role_id = match operator.role_id(&spec.mount_path, &spec.name).await {
        Ok(role_id) => role_id,
        Err(e) => return SyncOutcome::failed(format!("Failed to get AppRole RoleId: {e}")),
    };
    let secret_id = match operator
        .generate_secret_id(&spec.mount_path, &spec.name)
        .await
    {
        Ok(secret_id) => secret_id,
        Err(e) => return SyncOutcome::failed(format!("Failed to generate AppRole SecretId: {e}")),
    };

    let secret =
        build_approle_export_secret(resource_name, &export.namespace, &role_id, &secret_id);
    if let Err(e) = secrets.apply(&secret).await {
        return SyncOutcome::failed(format!("Failed to export AppRole secret: {e}"));
    }
    debug!(
        role = %spec.name,
        namespace = %export.namespace,
        secret = %export_secret_name(resource_name),
        "Exported AppRole credentials"
    );

    SyncOutcome::synced("AppRole successfully synchronized")
}

#[async_trait]
impl FinalizerCleanup for AppRole {
    async fn cleanup(&self, vault: &dyn VaultApi) -> Result<()> {
        AppRoleOperator::new(vault)
            .delete(&self.spec.mount_path, &self.spec.name)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VaultResource for AppRole {
    const KIND: &'static str = KIND_APP_ROLE;
    const FINALIZER: &'static str = FINALIZER_APP_ROLE;

    fn server_ref(&self) -> &ServerReference {
        &self.spec.server_ref
    }

    fn sync_status(&self) -> Option<&SyncStatus> {
        self.status.as_ref()
    }

    async fn synchronize(&self, vault: &dyn VaultApi, secrets: &dyn SecretStore) -> SyncOutcome {
        sync_approle(&self.name_any(), &self.spec, vault, secrets).await
    }
}

#[cfg(test)]
#[path = "approle_tests.rs"]
mod approle_tests;
