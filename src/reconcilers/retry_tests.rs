// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        is_conflict, retry_on_conflict, retry_on_conflict_with, status_backoff,
        ExponentialBackoff,
    };
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(Box::new(kube::core::Status {
            status: None,
            code,
            message: format!("{reason} error"),
            reason: reason.to_string(),
            metadata: None,
            details: None,
        }))
    }

    fn no_jitter() -> ExponentialBackoff {
        ExponentialBackoff::new(Duration::from_millis(1), Duration::from_millis(4), 5, 2.0, 0.0)
    }

    #[test]
    fn test_status_backoff_configuration() {
        let backoff = status_backoff();
        assert_eq!(backoff.initial_interval, Duration::from_millis(10));
        assert_eq!(backoff.max_interval, Duration::from_secs(1));
        assert_eq!(backoff.max_attempts, 5);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = no_jitter();
        assert_eq!(backoff.next_backoff(), Duration::from_millis(1));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(2));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(4));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(4));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let mut backoff = status_backoff();
        for _ in 0..20 {
            let delay = backoff.next_backoff();
            assert!(delay <= Duration::from_millis(1100), "delay {delay:?} exceeds cap + 10%");
        }
    }

    #[test]
    fn test_is_conflict() {
        assert!(is_conflict(&api_error(409, "Conflict")));
        assert!(!is_conflict(&api_error(404, "NotFound")));
        assert!(!is_conflict(&api_error(500, "InternalError")));
    }

    #[tokio::test]
    async fn test_single_conflict_then_success() {
        let counter = AtomicU32::new(0);
        let attempts = &counter;

        let result = retry_on_conflict(
            move || async move {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(api_error(409, "Conflict"))
                } else {
                    Ok("written")
                }
            },
            "update status",
        )
        .await;

        assert_eq!(result.unwrap(), "written");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_surfaces_conflict() {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let mut hooks = 0;

        let result: Result<(), kube::Error> = retry_on_conflict_with(
            no_jitter(),
            move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(api_error(409, "Conflict"))
            },
            "update status",
            |_| hooks += 1,
        )
        .await;

        assert!(is_conflict(&result.unwrap_err()));
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert_eq!(hooks, 4);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let attempts = &counter;

        let result: Result<(), kube::Error> = retry_on_conflict(
            move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(api_error(403, "Forbidden"))
            },
            "update status",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
