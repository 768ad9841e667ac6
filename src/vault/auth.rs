// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Auth method mounts.

use super::{mount_key, VaultApi};
use crate::errors::VaultError;
use tracing::{debug, info};

pub struct AuthMethodOperator<'a> {
    vault: &'a dyn VaultApi,
}

impl<'a> AuthMethodOperator<'a> {
    #[must_use]
    pub fn new(vault: &'a dyn VaultApi) -> Self {
        Self { vault }
    }

    /// Whether an auth method is mounted at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the auth table cannot be listed.
    pub async fn is_enabled(&self, path: &str) -> Result<bool, VaultError> {
        let methods = self.vault.list_auth_methods().await?;
        Ok(methods.contains_key(&mount_key(path)))
    }

    /// Enable `method_type` at `path` unless an auth method is already mounted there.
    ///
    /// Returns `true` when the method was enabled by this call.
    ///
    /// # Errors
    ///
    /// Returns an error if listing or enabling fails.
    pub async fn enable(
        &self,
        path: &str,
        method_type: &str,
        description: Option<&str>,
    ) -> Result<bool, VaultError> {
        if self.is_enabled(path).await? {
            debug!(path = %path, "Auth method already enabled");
            return Ok(false);
        }

        self.vault
            .enable_auth_method(path, method_type, description)
            .await?;
        info!(path = %path, method_type = %method_type, "Enabled auth method");
        Ok(true)
    }

    /// Disable the auth method at `path` without checking whether it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if Vault rejects the request.
    pub async fn disable(&self, path: &str) -> Result<(), VaultError> {
        match self.vault.disable_auth_method(path).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod auth_tests;
