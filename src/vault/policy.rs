// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! ACL policies.

use super::VaultApi;
use crate::errors::VaultError;
use tracing::info;

/// Separator placed between policy rules in the assembled document.
pub const RULE_SEPARATOR: &str = "\r\n";

/// Writes and deletes ACL policies. Writes always overwrite.
pub struct PolicyOperator<'a> {
    vault: &'a dyn VaultApi,
}

impl<'a> PolicyOperator<'a> {
    #[must_use]
    pub fn new(vault: &'a dyn VaultApi) -> Self {
        Self { vault }
    }

    /// Validate and write the policy `name` built from `rules`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Validation`] for an empty name or rule list, or the
    /// Vault error if the write fails.
    pub async fn create_or_update(&self, name: &str, rules: &[String]) -> Result<(), VaultError> {
        validate_policy(name, rules)?;

        let document = policy_document(rules);
        self.vault.write_policy(name, &document).await?;

        info!(policy = %name, rules = rules.len(), "Wrote ACL policy");
        Ok(())
    }

    /// Delete the policy. An absent policy is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if Vault rejects the delete.
    pub async fn delete(&self, name: &str) -> Result<(), VaultError> {
        match self.vault.delete_policy(name).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}

/// Check that a policy has a name and at least one rule.
///
/// # Errors
///
/// Returns [`VaultError::Validation`] describing the first problem found.
pub fn validate_policy(name: &str, rules: &[String]) -> Result<(), VaultError> {
    if name.trim().is_empty() {
        return Err(VaultError::Validation("Policy.name cannot be empty".into()));
    }
    if rules.is_empty() {
        return Err(VaultError::Validation(
            "policy.rules needs to contain at least 1 rule".into(),
        ));
    }
    Ok(())
}

/// Join rules with CRLF into a single policy document.
#[must_use]
pub fn policy_document(rules: &[String]) -> String {
    rules.join(RULE_SEPARATOR)
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod policy_tests;
