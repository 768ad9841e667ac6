// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        finalizer_action, finalizer_patch, handle_deletion, has_finalizer, FinalizerAction,
    };
    use crate::constants::FINALIZER_POLICY;
    use crate::crd::Policy;
    use crate::reconcilers::cluster::RecordingCluster;
    use crate::vault::testing::FakeVault;
    use serde_json::json;

    fn policy(finalizers: &[&str], deleting: bool) -> Policy {
        let mut metadata = json!({
            "name": "read-only",
            "namespace": "apps",
            "finalizers": finalizers,
        });
        if deleting {
            metadata["deletionTimestamp"] = json!("2025-01-01T00:00:00Z");
        }
        serde_json::from_value(json!({
            "apiVersion": "vault.ops.community.dev/v1alpha1",
            "kind": "Policy",
            "metadata": metadata,
            "spec": {
                "serverRef": { "name": "vault" },
                "name": "read-only",
                "rules": ["path \"secret/*\" { capabilities = [\"read\"] }"]
            }
        }))
        .expect("valid Policy")
    }

    #[test]
    fn test_live_without_finalizer_adds_it() {
        assert_eq!(
            finalizer_action(&policy(&[], false), FINALIZER_POLICY),
            FinalizerAction::Add
        );
    }

    #[test]
    fn test_live_with_finalizer_proceeds() {
        assert_eq!(
            finalizer_action(&policy(&[FINALIZER_POLICY], false), FINALIZER_POLICY),
            FinalizerAction::Proceed
        );
    }

    #[test]
    fn test_deleted_with_finalizer_cleans_up() {
        assert_eq!(
            finalizer_action(&policy(&["other/finalizer", FINALIZER_POLICY], true), FINALIZER_POLICY),
            FinalizerAction::Cleanup
        );
    }

    #[test]
    fn test_deleted_without_finalizer_is_released() {
        assert_eq!(
            finalizer_action(&policy(&["other/finalizer"], true), FINALIZER_POLICY),
            FinalizerAction::Release
        );
    }

    #[test]
    fn test_foreign_finalizers_do_not_count() {
        let resource = policy(&["other/finalizer"], false);
        assert!(!has_finalizer(&resource, FINALIZER_POLICY));
        assert!(has_finalizer(&resource, "other/finalizer"));
    }

    #[test]
    fn test_finalizer_patch_pins_resource_version() {
        let patch = finalizer_patch(
            Some("17".to_string()),
            &["other/finalizer".to_string(), FINALIZER_POLICY.to_string()],
        );

        assert_eq!(patch["metadata"]["resourceVersion"], json!("17"));
        assert_eq!(
            patch["metadata"]["finalizers"],
            json!(["other/finalizer", FINALIZER_POLICY])
        );
    }

    #[tokio::test]
    async fn test_handle_deletion_removes_finalizer_after_cleanup() {
        let vault = FakeVault::ready();
        let cluster = RecordingCluster::default();

        let resource = policy(&[FINALIZER_POLICY], true);
        handle_deletion::<Policy>(&cluster, &resource, &vault, FINALIZER_POLICY)
            .await
            .unwrap();

        assert_eq!(cluster.calls(), vec!["remove_finalizer"]);
        assert_eq!(vault.calls(), vec!["delete_policy"]);
    }

    #[tokio::test]
    async fn test_handle_deletion_keeps_finalizer_when_cleanup_fails() {
        let vault = FakeVault::ready();
        vault.fail("delete_policy");
        let cluster = RecordingCluster::default();

        let resource = policy(&[FINALIZER_POLICY], true);
        let result =
            handle_deletion::<Policy>(&cluster, &resource, &vault, FINALIZER_POLICY).await;

        assert!(result.is_err());
        assert!(cluster.calls().is_empty());
    }
}
