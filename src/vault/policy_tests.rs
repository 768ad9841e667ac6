// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `policy.rs`

#[cfg(test)]
mod tests {
    use super::super::{policy_document, validate_policy, PolicyOperator};
    use crate::errors::VaultError;
    use crate::vault::testing::FakeVault;

    fn rules() -> Vec<String> {
        vec![
            r#"path "secret/data/app/*" { capabilities = ["read"] }"#.to_string(),
            r#"path "sys/health" { capabilities = ["read"] }"#.to_string(),
        ]
    }

    #[test]
    fn test_policy_document_uses_crlf() {
        assert_eq!(
            policy_document(&rules()),
            "path \"secret/data/app/*\" { capabilities = [\"read\"] }\r\npath \"sys/health\" { capabilities = [\"read\"] }"
        );
        assert_eq!(policy_document(&rules()[..1]), rules()[0]);
    }

    #[test]
    fn test_validation() {
        assert!(validate_policy("dev", &rules()).is_ok());

        let err = validate_policy("  ", &rules()).unwrap_err();
        assert!(matches!(err, VaultError::Validation(ref m) if m == "Policy.name cannot be empty"));

        let err = validate_policy("dev", &[]).unwrap_err();
        assert!(matches!(err, VaultError::Validation(ref m) if m.contains("at least 1 rule")));
    }

    #[tokio::test]
    async fn test_create_or_update_is_idempotent() {
        let vault = FakeVault::ready();
        let operator = PolicyOperator::new(&vault);

        operator.create_or_update("dev", &rules()).await.unwrap();
        operator.create_or_update("dev", &rules()).await.unwrap();

        let policies = vault.with_state(|s| s.policies.clone());
        assert_eq!(policies.len(), 1);
        assert_eq!(
            policies["dev"].matches("\r\n").count(),
            1,
            "Rewriting must not duplicate rule lines"
        );
    }

    #[tokio::test]
    async fn test_invalid_policy_never_reaches_vault() {
        let vault = FakeVault::ready();
        let operator = PolicyOperator::new(&vault);

        assert!(operator.create_or_update("dev", &[]).await.is_err());
        assert_eq!(vault.call_count("write_policy"), 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let vault = FakeVault::ready();
        let operator = PolicyOperator::new(&vault);

        operator.create_or_update("dev", &rules()).await.unwrap();
        operator.delete("dev").await.unwrap();
        operator.delete("dev").await.unwrap();

        assert!(vault.with_state(|s| s.policies.is_empty()));
    }
}
