// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Secret-engine mounts.

use super::{mount_key, VaultApi};
use crate::errors::VaultError;
use tracing::{debug, info};

/// Enables and disables secret engines, checking the mount table first.
pub struct SecretEngineOperator<'a> {
    vault: &'a dyn VaultApi,
}

impl<'a> SecretEngineOperator<'a> {
    #[must_use]
    pub fn new(vault: &'a dyn VaultApi) -> Self {
        Self { vault }
    }

    /// Whether a secret engine is mounted at `path` (trailing slash insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the mount table cannot be listed.
    pub async fn is_mounted(&self, path: &str) -> Result<bool, VaultError> {
        let mounts = self.vault.list_mounts().await?;
        Ok(mounts.contains_key(&mount_key(path)))
    }

    /// Mount `engine_type` at `path` unless something is already mounted there.
    ///
    /// Returns `true` when a new mount was created.
    ///
    /// # Errors
    ///
    /// Returns an error if listing or enabling the mount fails.
    pub async fn enable(&self, path: &str, engine_type: &str) -> Result<bool, VaultError> {
        if self.is_mounted(path).await? {
            debug!(path = %path, "Secret engine already mounted");
            return Ok(false);
        }

        self.vault.enable_mount(path, engine_type).await?;
        info!(path = %path, engine_type = %engine_type, "Enabled secret engine");
        Ok(true)
    }

    /// Unmount the secret engine at `path`. Absent mounts are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if Vault rejects the unmount.
    pub async fn disable(&self, path: &str) -> Result<(), VaultError> {
        match self.vault.disable_mount(path).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
#[path = "secret_engine_tests.rs"]
mod secret_engine_tests;
