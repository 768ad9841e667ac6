// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `userpass.rs`

#[cfg(test)]
mod tests {
    use super::super::UserPassOperator;
    use crate::errors::VaultError;
    use crate::vault::testing::FakeVault;

    #[tokio::test]
    async fn test_empty_mount_counts_as_not_created() {
        let vault = FakeVault::ready();
        let operator = UserPassOperator::new(&vault);

        assert!(!operator.is_created("userpass", "alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_other_404_is_surfaced() {
        let vault = FakeVault::ready();
        vault.with_state(|s| {
            s.list_users_not_found_errors = Some(vec!["no handler for route".into()]);
        });
        let operator = UserPassOperator::new(&vault);

        let err = operator.is_created("userpass", "alice").await.unwrap_err();
        assert!(matches!(err, VaultError::NotFound { ref errors, .. } if errors.len() == 1));
    }

    #[tokio::test]
    async fn test_create_once_never_resyncs_password() {
        let vault = FakeVault::ready();
        let operator = UserPassOperator::new(&vault);
        let policies = vec!["dev".to_string()];

        assert!(operator
            .create_if_absent("userpass", "alice", "first", &policies)
            .await
            .unwrap());
        assert!(!operator
            .create_if_absent("userpass", "alice", "second", &[])
            .await
            .unwrap());

        assert_eq!(vault.call_count("write_user"), 1);
        let (password, stored_policies) = vault.with_state(|s| {
            s.users[&("userpass".to_string(), "alice".to_string())].clone()
        });
        assert_eq!(password, "first");
        assert_eq!(stored_policies, policies);
    }

    #[tokio::test]
    async fn test_exact_username_match() {
        let vault = FakeVault::ready();
        let operator = UserPassOperator::new(&vault);

        operator
            .create_if_absent("userpass", "alice-admin", "pw", &[])
            .await
            .unwrap();
        assert!(!operator.is_created("userpass", "alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_listing_failure_blocks_write() {
        let vault = FakeVault::ready();
        vault.fail("list_users");
        let operator = UserPassOperator::new(&vault);

        assert!(operator
            .create_if_absent("userpass", "alice", "pw", &[])
            .await
            .is_err());
        assert_eq!(vault.call_count("write_user"), 0);
    }
}
