// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use super::super::OperatorConfig;
    use std::collections::HashMap;
    use std::time::Duration;

    fn config_from(pairs: &[(&str, &str)]) -> OperatorConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        OperatorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = config_from(&[]);
        assert_eq!(config, OperatorConfig::default());
        assert_eq!(config.vault_request_timeout, Duration::from_secs(5));
        assert_eq!(config.success_requeue, Duration::from_secs(300));
        assert_eq!(config.error_requeue, Duration::from_secs(60));
        assert_eq!(config.metrics_bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = config_from(&[
            ("VAULT_REQUEST_TIMEOUT_SECS", "10"),
            ("ERROR_REQUEUE_SECS", "15"),
            ("METRICS_BIND_ADDRESS", "127.0.0.1:9090"),
        ]);

        assert_eq!(config.vault_request_timeout, Duration::from_secs(10));
        assert_eq!(config.error_requeue, Duration::from_secs(15));
        assert_eq!(config.metrics_bind_address, "127.0.0.1:9090");
        assert_eq!(
            config.success_requeue,
            Duration::from_secs(300),
            "Unset values should keep their defaults"
        );
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("VAULT_REQUEST_TIMEOUT_SECS", "five"),
            ("METRICS_BIND_ADDRESS", "   "),
        ]);

        assert_eq!(config.vault_request_timeout, Duration::from_secs(5));
        assert_eq!(config.metrics_bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_zero_durations_are_clamped() {
        let config = config_from(&[("RECONCILE_TIMEOUT_SECS", "0")]);
        assert_eq!(
            config.reconcile_timeout,
            Duration::from_secs(1),
            "A zero deadline would cancel every reconciliation"
        );
    }
}
