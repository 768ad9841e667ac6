// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `approle.rs`

#[cfg(test)]
mod tests {
    use super::super::AppRoleOperator;
    use crate::vault::testing::FakeVault;

    #[tokio::test]
    async fn test_create_or_update_always_writes() {
        let vault = FakeVault::ready();
        let operator = AppRoleOperator::new(&vault);

        operator
            .create_or_update("approle", "ci", &["dev".to_string()], 600)
            .await
            .unwrap();
        operator
            .create_or_update("approle", "ci", &["dev".to_string(), "ops".to_string()], 0)
            .await
            .unwrap();

        assert_eq!(vault.call_count("write_approle"), 2);
        let config = vault.with_state(|s| s.approles[&("approle".to_string(), "ci".to_string())].clone());
        assert_eq!(config.token_policies, vec!["dev", "ops"]);
        assert_eq!(config.secret_id_ttl, "0");
    }

    #[tokio::test]
    async fn test_is_created_maps_not_found_to_false() {
        let vault = FakeVault::ready();
        let operator = AppRoleOperator::new(&vault);

        assert!(!operator.is_created("approle", "ci").await.unwrap());
        operator
            .create_or_update("approle", "ci", &[], 60)
            .await
            .unwrap();
        assert!(operator.is_created("approle", "ci").await.unwrap());
    }

    #[tokio::test]
    async fn test_is_created_surfaces_other_errors() {
        let vault = FakeVault::ready();
        vault.fail("read_role_id");
        let operator = AppRoleOperator::new(&vault);

        assert!(operator.is_created("approle", "ci").await.is_err());
    }

    #[tokio::test]
    async fn test_each_secret_id_is_fresh() {
        let vault = FakeVault::ready();
        let operator = AppRoleOperator::new(&vault);
        operator
            .create_or_update("approle", "ci", &[], 60)
            .await
            .unwrap();

        let first = operator.generate_secret_id("approle", "ci").await.unwrap();
        let second = operator.generate_secret_id("approle", "ci").await.unwrap();
        assert_ne!(first, second);
        assert_eq!(operator.role_id("approle", "ci").await.unwrap(), "role-id-ci");
    }

    #[tokio::test]
    async fn test_delete() {
        let vault = FakeVault::ready();
        let operator = AppRoleOperator::new(&vault);
        operator
            .create_or_update("approle", "ci", &[], 60)
            .await
            .unwrap();

        operator.delete("approle", "ci").await.unwrap();
        assert!(!operator.is_created("approle", "ci").await.unwrap());
    }
}
