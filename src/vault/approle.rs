// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `AppRole` roles and their credentials.

use super::{AppRoleConfig, VaultApi};
use crate::errors::VaultError;
use tracing::{debug, info};

pub struct AppRoleOperator<'a> {
    vault: &'a dyn VaultApi,
}

impl<'a> AppRoleOperator<'a> {
    #[must_use]
    pub fn new(vault: &'a dyn VaultApi) -> Self {
        Self { vault }
    }

    /// Write the role configuration. The write is unconditional so policy and
    /// TTL changes always converge.
    ///
    /// # Errors
    ///
    /// Returns an error if Vault rejects the write.
    pub async fn create_or_update(
        &self,
        mount: &str,
        role: &str,
        policies: &[String],
        secret_id_ttl: i64,
    ) -> Result<(), VaultError> {
        let config = AppRoleConfig {
            token_policies: policies.to_vec(),
            secret_id_ttl: secret_id_ttl.to_string(),
        };
        self.vault.write_approle(mount, role, &config).await?;
        info!(mount = %mount, role = %role, "Wrote AppRole role");
        Ok(())
    }

    /// Whether the role exists. A missing role id means the role does not.
    ///
    /// # Errors
    ///
    /// Returns any error other than not-found.
    pub async fn is_created(&self, mount: &str, role: &str) -> Result<bool, VaultError> {
        match self.vault.read_role_id(mount, role).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the role id cannot be read.
    pub async fn role_id(&self, mount: &str, role: &str) -> Result<String, VaultError> {
        self.vault.read_role_id(mount, role).await
    }

    /// Mint a fresh secret id. Every call yields a new credential.
    ///
    /// # Errors
    ///
    /// Returns an error if Vault refuses to generate one.
    pub async fn generate_secret_id(&self, mount: &str, role: &str) -> Result<String, VaultError> {
        let secret_id = self.vault.generate_secret_id(mount, role).await?;
        debug!(mount = %mount, role = %role, "Generated AppRole secret id");
        Ok(secret_id)
    }

    /// # Errors
    ///
    /// Returns an error if Vault rejects the delete.
    pub async fn delete(&self, mount: &str, role: &str) -> Result<(), VaultError> {
        match self.vault.delete_approle(mount, role).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
#[path = "approle_tests.rs"]
mod approle_tests;
