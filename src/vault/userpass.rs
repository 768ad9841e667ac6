// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Username/password accounts.
//!
//! Accounts are created once. An existing account keeps its password and
//! policies even if the desired state changes.

use super::VaultApi;
use crate::errors::VaultError;
use tracing::{debug, info};

pub struct UserPassOperator<'a> {
    vault: &'a dyn VaultApi,
}

impl<'a> UserPassOperator<'a> {
    #[must_use]
    pub fn new(vault: &'a dyn VaultApi) -> Self {
        Self { vault }
    }

    /// Whether `username` exists under `mount`.
    ///
    /// A 404 without any error entries is how Vault answers a listing of a
    /// mount with no accounts (or no mount yet); it means "not created". Any
    /// other 404 is reported as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the account listing fails.
    pub async fn is_created(&self, mount: &str, username: &str) -> Result<bool, VaultError> {
        match self.vault.list_users(mount).await {
            Ok(users) => Ok(users.iter().any(|u| u == username)),
            Err(VaultError::NotFound { errors, .. }) if errors.is_empty() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create the account if it does not exist. Returns `true` when created.
    ///
    /// # Errors
    ///
    /// Returns an error if the existence check or the write fails.
    pub async fn create_if_absent(
        &self,
        mount: &str,
        username: &str,
        password: &str,
        policies: &[String],
    ) -> Result<bool, VaultError> {
        if self.is_created(mount, username).await? {
            debug!(mount = %mount, username = %username, "User already exists");
            return Ok(false);
        }

        self.vault
            .write_user(mount, username, password, policies)
            .await?;
        info!(mount = %mount, username = %username, "Created userpass account");
        Ok(true)
    }

    /// Delete the account. An absent account is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if Vault rejects the delete.
    pub async fn delete(&self, mount: &str, username: &str) -> Result<(), VaultError> {
        match self.vault.delete_user(mount, username).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
#[path = "userpass_tests.rs"]
mod userpass_tests;
