// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status reporting for the operator's custom resources.
//!
//! Every status write re-reads the object, computes the new status from that
//! latest copy and patches it with the copy's `resourceVersion`. A write from a
//! stale copy is rejected with 409 Conflict and retried from the re-read (see
//! [`super::retry::retry_on_conflict`]). The outcome of the business logic is
//! decided before the status write and never changes because of it.
//!
//! Conditions follow the standard format:
//! - `type`: always `Ready` here
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the status last flipped

use super::retry::{retry_on_conflict_with, status_backoff};
use crate::constants::{CONDITION_TYPE_READY, REASON_SYNCHRONIZED, REASON_SYNC_FAILED};
use crate::crd::{Condition, Phase, SyncStatus, VaultServerStatus};
use crate::metrics;
use chrono::Utc;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

/// Result of one synchronization pass, as reported on the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub synchronized: bool,
    pub message: String,
}

impl SyncOutcome {
    pub fn synced(message: impl Into<String>) -> Self {
        Self {
            synchronized: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            synchronized: false,
            message: message.into(),
        }
    }
}

/// Create a new condition with the current timestamp.
///
/// # Example
///
/// ```rust,no_run
/// # use vault_operator::reconcilers::status::create_condition;
/// let condition = create_condition("Ready", "True", "Synchronized", "Policy synchronized");
/// assert_eq!(condition.r#type, "Ready");
/// ```
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in a mutable conditions list (in-memory, no API call).
///
/// The `lastTransitionTime` is preserved when the status has not changed.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Status to write for a synchronized kind, given its latest status and this pass's outcome.
#[must_use]
pub fn next_sync_status(previous: Option<&SyncStatus>, outcome: &SyncOutcome) -> SyncStatus {
    let mut conditions = previous.map(|s| s.conditions.clone()).unwrap_or_default();
    let (status, reason) = if outcome.synchronized {
        ("True", REASON_SYNCHRONIZED)
    } else {
        ("False", REASON_SYNC_FAILED)
    };
    update_condition_in_memory(
        &mut conditions,
        CONDITION_TYPE_READY,
        status,
        reason,
        &outcome.message,
    );

    SyncStatus {
        synchronized: Some(outcome.synchronized),
        message: Some(outcome.message.clone()),
        last_update_time: Some(Utc::now().to_rfc3339()),
        conditions,
    }
}

/// Status to write for a `VaultServer` that ended its pass in `phase`.
#[must_use]
pub fn next_server_status(
    previous: Option<&VaultServerStatus>,
    phase: Phase,
    message: &str,
) -> VaultServerStatus {
    let mut conditions = previous.map(|s| s.conditions.clone()).unwrap_or_default();
    let status = if phase == Phase::Unsealed { "True" } else { "False" };
    update_condition_in_memory(
        &mut conditions,
        CONDITION_TYPE_READY,
        status,
        phase.as_str(),
        message,
    );

    VaultServerStatus {
        phase: Some(phase),
        message: Some(message.to_string()),
        last_update_time: Some(Utc::now().to_rfc3339()),
        conditions,
    }
}

/// Build the merge patch writing `status` against the copy at `resource_version`.
#[must_use]
pub fn status_patch(resource_version: Option<String>, status: &Value) -> Value {
    json!({
        "metadata": { "resourceVersion": resource_version },
        "status": status,
    })
}

/// Write a status computed from the latest copy of `namespace/name`.
///
/// `build_status` receives the freshly fetched object and returns the status
/// JSON. Conflicts are retried with the status backoff.
///
/// # Errors
///
/// Returns the fetch or patch error, or the conflict once the retry budget is spent.
pub async fn update_status_with_retry<T, F>(
    client: &Client,
    namespace: &str,
    name: &str,
    build_status: F,
) -> Result<(), kube::Error>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + DeserializeOwned,
    F: Fn(&T) -> Value,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let kind = T::kind(&()).to_string();
    let api = &api;
    let build_status = &build_status;

    retry_on_conflict_with(
        status_backoff(),
        move || async move {
            let latest = api.get(name).await?;
            let patch = status_patch(latest.resource_version(), &build_status(&latest));
            api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
                .await?;
            Ok(())
        },
        &format!("update {kind} status {namespace}/{name}"),
        |_| metrics::record_status_conflict(&kind),
    )
    .await?;

    debug!(kind = %kind, resource = %name, namespace = %namespace, "Updated status");
    Ok(())
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
