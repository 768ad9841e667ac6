// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        create_condition, find_condition, next_server_status, next_sync_status, status_patch,
        update_condition_in_memory, SyncOutcome,
    };
    use crate::crd::{Phase, SyncStatus};
    use serde_json::json;

    #[test]
    fn test_create_condition() {
        let condition = create_condition("Ready", "True", "Synchronized", "Policy synchronized");
        assert_eq!(condition.r#type, "Ready");
        assert_eq!(condition.status, "True");
        assert_eq!(condition.reason.as_deref(), Some("Synchronized"));
        assert!(condition.last_transition_time.is_some());
    }

    #[test]
    fn test_transition_time_preserved_while_status_unchanged() {
        let mut conditions = vec![create_condition("Ready", "True", "Synchronized", "first")];
        conditions[0].last_transition_time = Some("2025-01-01T00:00:00+00:00".to_string());

        update_condition_in_memory(&mut conditions, "Ready", "True", "Synchronized", "second");
        assert_eq!(conditions.len(), 1);
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
        assert_eq!(conditions[0].message.as_deref(), Some("second"));

        update_condition_in_memory(&mut conditions, "Ready", "False", "SyncFailed", "broken");
        assert_ne!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_next_sync_status_success() {
        let status = next_sync_status(None, &SyncOutcome::synced("Policy synchronized"));

        assert_eq!(status.synchronized, Some(true));
        assert_eq!(status.message.as_deref(), Some("Policy synchronized"));
        assert!(status.last_update_time.is_some());
        let ready = find_condition(&status.conditions, "Ready").unwrap();
        assert_eq!(ready.status, "True");
        assert_eq!(ready.reason.as_deref(), Some("Synchronized"));
    }

    #[test]
    fn test_next_sync_status_failure_replaces_previous() {
        let previous = next_sync_status(None, &SyncOutcome::synced("ok"));
        let status = next_sync_status(
            Some(&previous),
            &SyncOutcome::failed("Failed to sync policy dev: boom"),
        );

        assert_eq!(status.synchronized, Some(false));
        assert_eq!(status.conditions.len(), 1);
        assert_eq!(status.conditions[0].status, "False");
        assert_eq!(status.conditions[0].reason.as_deref(), Some("SyncFailed"));
    }

    #[test]
    fn test_next_server_status_ready_only_when_unsealed() {
        let status = next_server_status(None, Phase::NotReachable, "connection refused");
        assert_eq!(status.phase, Some(Phase::NotReachable));
        assert_eq!(status.conditions[0].status, "False");
        assert_eq!(status.conditions[0].reason.as_deref(), Some("NotReachable"));

        let status = next_server_status(Some(&status), Phase::Unsealed, "Vault is operational");
        assert_eq!(status.phase, Some(Phase::Unsealed));
        assert_eq!(status.conditions[0].status, "True");
    }

    #[test]
    fn test_status_patch_carries_resource_version() {
        let status = SyncStatus {
            synchronized: Some(true),
            ..Default::default()
        };
        let patch = status_patch(
            Some("42".to_string()),
            &serde_json::to_value(&status).unwrap(),
        );

        assert_eq!(patch["metadata"]["resourceVersion"], json!("42"));
        assert_eq!(patch["status"]["synchronized"], json!(true));
    }
}
