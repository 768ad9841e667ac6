// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `approle.rs`

#[cfg(test)]
mod tests {
    use super::super::{build_approle_export_secret, export_secret_name, sync_approle};
    use crate::context::MemorySecretStore;
    use crate::crd::{AppRole, AppRoleExport, AppRoleSpec, ServerReference};
    use crate::reconcilers::finalizers::FinalizerCleanup;
    use crate::vault::testing::FakeVault;

    fn spec(export: Option<&str>) -> AppRoleSpec {
        AppRoleSpec {
            server_ref: ServerReference {
                name: "vault".to_string(),
                namespace: Some("vault-system".to_string()),
            },
            mount_path: "approle".to_string(),
            name: "my-role".to_string(),
            policies: vec!["dev".to_string()],
            secret_id_ttl: 3600,
            export: export.map(|ns| AppRoleExport {
                namespace: ns.to_string(),
            }),
        }
    }

    #[test]
    fn test_export_secret_shape() {
        let secret = build_approle_export_secret("billing", "ns-b", "rid", "sid");

        assert_eq!(secret.metadata.name.as_deref(), Some("approle-billing-secret"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("ns-b"));
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));
        let data = secret.data.unwrap();
        assert_eq!(data["role_id"].0, b"rid");
        assert_eq!(data["secret_id"].0, b"sid");
    }

    #[tokio::test]
    async fn test_sync_without_export_only_writes_role() {
        let vault = FakeVault::ready();
        let secrets = MemorySecretStore::default();

        let outcome = sync_approle("billing", &spec(None), &vault, &secrets).await;

        assert!(outcome.synchronized);
        assert_eq!(outcome.message, "AppRole successfully synchronized");
        assert_eq!(vault.calls(), vec!["write_approle"]);
        assert!(secrets.secrets.lock().unwrap().is_empty());
        let config = vault.with_state(|s| {
            s.approles[&("approle".to_string(), "my-role".to_string())].clone()
        });
        assert_eq!(config.token_policies, vec!["dev"]);
        assert_eq!(config.secret_id_ttl, "3600");
    }

    #[tokio::test]
    async fn test_export_with_empty_namespace_is_skipped() {
        let vault = FakeVault::ready();
        let secrets = MemorySecretStore::default();

        let outcome = sync_approle("billing", &spec(Some("")), &vault, &secrets).await;

        assert!(outcome.synchronized);
        assert_eq!(outcome.message, "AppRole successfully synchronized");
        assert_eq!(vault.calls(), vec!["write_approle"]);
        assert!(secrets.secrets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_export_to_other_namespace() {
        let vault = FakeVault::ready();
        let secrets = MemorySecretStore::default();

        let outcome = sync_approle("billing", &spec(Some("ns-b")), &vault, &secrets).await;

        assert!(outcome.synchronized);
        let exported = secrets
            .find("ns-b", &export_secret_name("billing"))
            .expect("exported secret");
        let data = exported.data.unwrap();
        assert!(!data["role_id"].0.is_empty());
        assert!(!data["secret_id"].0.is_empty());
    }

    #[tokio::test]
    async fn test_each_pass_mints_a_new_secret_id() {
        let vault = FakeVault::ready();
        let secrets = MemorySecretStore::default();

        sync_approle("billing", &spec(Some("ns-b")), &vault, &secrets).await;
        let first = secrets.find("ns-b", "approle-billing-secret").unwrap();
        sync_approle("billing", &spec(Some("ns-b")), &vault, &secrets).await;
        let second = secrets.find("ns-b", "approle-billing-secret").unwrap();

        assert_ne!(
            first.data.unwrap()["secret_id"],
            second.data.unwrap()["secret_id"]
        );
        assert_eq!(vault.call_count("write_approle"), 2);
    }

    #[tokio::test]
    async fn test_role_write_failure() {
        let vault = FakeVault::ready();
        vault.fail("write_approle");
        let secrets = MemorySecretStore::default();

        let outcome = sync_approle("billing", &spec(Some("ns-b")), &vault, &secrets).await;

        assert!(!outcome.synchronized);
        assert!(outcome
            .message
            .starts_with("Failed to create or update AppRole in Vault: "));
        assert_eq!(vault.call_count("read_role_id"), 0);
    }

    #[tokio::test]
    async fn test_secret_id_failure() {
        let vault = FakeVault::ready();
        vault.fail("generate_secret_id");
        let secrets = MemorySecretStore::default();

        let outcome = sync_approle("billing", &spec(Some("ns-b")), &vault, &secrets).await;

        assert!(outcome
            .message
            .starts_with("Failed to generate AppRole SecretId: "));
        assert!(secrets.find("ns-b", "approle-billing-secret").is_none());
    }

    #[tokio::test]
    async fn test_export_failure() {
        let vault = FakeVault::ready();
        let secrets = MemorySecretStore {
            fail_apply: true,
            ..Default::default()
        };

        let outcome = sync_approle("billing", &spec(Some("ns-b")), &vault, &secrets).await;

        assert!(!outcome.synchronized);
        assert_eq!(
            outcome.message,
            "Failed to export AppRole secret: apply rejected"
        );
    }

    #[tokio::test]
    async fn test_cleanup_deletes_role() {
        let vault = FakeVault::ready();
        let secrets = MemorySecretStore::default();
        sync_approle("billing", &spec(None), &vault, &secrets).await;

        AppRole::new("billing", spec(None)).cleanup(&vault).await.unwrap();

        assert!(vault.with_state(|s| s.approles.is_empty()));
    }
}
