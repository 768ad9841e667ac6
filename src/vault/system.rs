// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Server-level operations: reachability, initialization and seal state.

use super::{InitRequest, InitResponse, VaultApi};
use crate::constants::{VAULT_INIT_SECRET_SHARES, VAULT_INIT_SECRET_THRESHOLD};
use crate::errors::VaultError;
use tracing::{debug, info};

pub struct SystemOperator<'a> {
    vault: &'a dyn VaultApi,
}

impl<'a> SystemOperator<'a> {
    #[must_use]
    pub fn new(vault: &'a dyn VaultApi) -> Self {
        Self { vault }
    }

    /// Probe the health endpoint. Any answer counts as reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be contacted.
    pub async fn ping(&self) -> Result<(), VaultError> {
        let health = self.vault.health().await?;
        debug!(
            initialized = health.initialized,
            sealed = health.sealed,
            version = health.version.as_deref().unwrap_or("unknown"),
            "Vault answered health probe"
        );
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the init status cannot be read.
    pub async fn is_initialized(&self) -> Result<bool, VaultError> {
        self.vault.init_status().await
    }

    /// Initialize with the fixed share/threshold configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if Vault rejects the request.
    pub async fn initialize(&self) -> Result<InitResponse, VaultError> {
        let request = InitRequest {
            secret_shares: VAULT_INIT_SECRET_SHARES,
            secret_threshold: VAULT_INIT_SECRET_THRESHOLD,
        };
        let response = self.vault.initialize(&request).await?;
        info!(
            shares = request.secret_shares,
            threshold = request.secret_threshold,
            "Initialized Vault"
        );
        Ok(response)
    }

    /// # Errors
    ///
    /// Returns an error if the seal status cannot be read.
    pub async fn is_sealed(&self) -> Result<bool, VaultError> {
        Ok(self.vault.seal_status().await?.sealed)
    }

    /// Submit `keys` in order, stopping as soon as Vault reports unsealed.
    ///
    /// Returns whether the server is still sealed afterwards.
    ///
    /// # Errors
    ///
    /// Returns the first submission error.
    pub async fn unseal(&self, keys: &[String]) -> Result<bool, VaultError> {
        let mut sealed = true;
        for key in keys {
            let status = self.vault.unseal(key).await?;
            sealed = status.sealed;
            debug!(progress = status.progress, threshold = status.threshold, "Submitted unseal key");
            if !sealed {
                break;
            }
        }
        if !sealed {
            info!("Vault unsealed");
        }
        Ok(sealed)
    }
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod system_tests;
