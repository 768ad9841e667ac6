// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `errors.rs`

#[cfg(test)]
mod tests {
    use super::super::{BootstrapError, ClientResolutionError, VaultError};
    use crate::crd::Phase;

    #[test]
    fn test_not_found_classification() {
        let err = VaultError::NotFound {
            path: "/v1/secret/data/app".into(),
            errors: vec![],
        };
        assert!(err.is_not_found());
        assert_eq!(err.kind_label(), "not_found");

        let err = VaultError::OperationFailed {
            status: 403,
            path: "/v1/sys/mounts".into(),
            errors: vec!["permission denied".into()],
        };
        assert!(!err.is_not_found());
        assert_eq!(err.kind_label(), "operation_failed");
    }

    #[test]
    fn test_operation_failed_message_keeps_vault_errors() {
        let err = VaultError::OperationFailed {
            status: 400,
            path: "/v1/sys/policies/acl/dev".into(),
            errors: vec!["bad policy".into(), "line 3".into()],
        };
        assert_eq!(
            err.to_string(),
            "/v1/sys/policies/acl/dev returned HTTP 400: bad policy; line 3"
        );
    }

    #[test]
    fn test_bootstrap_error_display_includes_phase() {
        let err = BootstrapError::new(Phase::UnsealError, "unseal: connection reset");
        assert_eq!(err.phase, Phase::UnsealError);
        assert_eq!(err.to_string(), "UnsealError: unseal: connection reset");
    }

    #[test]
    fn test_client_resolution_messages() {
        let err = ClientResolutionError::MissingRootToken {
            namespace: "vault".into(),
            name: "dev-secret".into(),
            key: "root_token".into(),
        };
        assert_eq!(
            err.to_string(),
            "credential secret vault/dev-secret has no root_token entry"
        );
    }
}
