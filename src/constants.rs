// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Vault operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all operator CRDs
pub const API_GROUP: &str = "vault.ops.community.dev";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "vault.ops.community.dev/v1alpha1";

/// Kind name for `VaultServer` resource
pub const KIND_VAULT_SERVER: &str = "VaultServer";

/// Kind name for the Vault KV `Secret` resource
pub const KIND_SECRET: &str = "Secret";

/// Kind name for `Policy` resource
pub const KIND_POLICY: &str = "Policy";

/// Kind name for `AuthMethod` resource
pub const KIND_AUTH_METHOD: &str = "AuthMethod";

/// Kind name for `UserPass` resource
pub const KIND_USER_PASS: &str = "UserPass";

/// Kind name for `AppRole` resource
pub const KIND_APP_ROLE: &str = "AppRole";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer guarding `VaultServer` deletion
pub const FINALIZER_VAULT_SERVER: &str = "vault.finalizers.ops.community.dev";

/// Finalizer guarding KV secret deletion
pub const FINALIZER_SECRET: &str = "secret.finalizers.ops.community.dev";

/// Finalizer guarding ACL policy deletion
pub const FINALIZER_POLICY: &str = "policy.finalizers.ops.community.dev";

/// Finalizer guarding auth method deletion
pub const FINALIZER_AUTH_METHOD: &str = "authmethod.finalizers.ops.community.dev";

/// Finalizer guarding userpass account deletion
pub const FINALIZER_USER_PASS: &str = "userpass.finalizers.ops.community.dev";

/// Finalizer guarding `AppRole` deletion
pub const FINALIZER_APP_ROLE: &str = "approle.finalizers.ops.community.dev";

// ============================================================================
// Controller Timing Constants
// ============================================================================

/// Requeue interval after a successful reconciliation (5 minutes)
pub const SUCCESS_REQUEUE_DURATION_SECS: u64 = 300;

/// Requeue interval after a failed reconciliation (1 minute)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 60;

/// Deadline for a single reconciliation invocation
pub const RECONCILE_TIMEOUT_SECS: u64 = 60;

/// Tokio worker threads for the controller runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Vault Client Constants
// ============================================================================

/// Per-request timeout for calls to the Vault HTTP API
pub const VAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Number of unseal key shares requested when initializing Vault
pub const VAULT_INIT_SECRET_SHARES: u32 = 3;

/// Number of key shares required to unseal Vault
pub const VAULT_INIT_SECRET_THRESHOLD: u32 = 3;

/// Cluster-local DNS suffix appended to namespaced service names
pub const CLUSTER_DNS_SUFFIX: &str = "svc.cluster.local";

/// Secret-engine type mounted for KV secrets
pub const KV_V2_ENGINE_TYPE: &str = "kv-v2";

/// Default userpass auth mount
pub const DEFAULT_USERPASS_MOUNT: &str = "userpass";

/// Default approle auth mount
pub const DEFAULT_APPROLE_MOUNT: &str = "approle";

// ============================================================================
// Secret Materialization Constants
// ============================================================================

/// Value placeholder replaced with a random string when a KV secret is first written
pub const RANDOM_SENTINEL: &str = "{{random}}";

/// Length of generated random secret values
pub const RANDOM_SECRET_LENGTH: usize = 32;

/// Key holding the root token in the server credential secret
pub const ROOT_TOKEN_KEY: &str = "root_token";

/// Suffix of the credential secret created for every `VaultServer`
pub const SERVER_CREDENTIAL_SUFFIX: &str = "-secret";

/// Key holding the exported `AppRole` role id
pub const APPROLE_ROLE_ID_KEY: &str = "role_id";

/// Key holding the exported `AppRole` secret id
pub const APPROLE_SECRET_ID_KEY: &str = "secret_id";

/// Field manager used for server-side apply of managed secrets
pub const FIELD_MANAGER: &str = "vault-operator";

// ============================================================================
// Status Update Retry Constants
// ============================================================================

/// Maximum number of attempts for an optimistic-concurrency status write
pub const STATUS_UPDATE_MAX_ATTEMPTS: u32 = 5;

/// Initial delay between conflicting status writes
pub const STATUS_RETRY_INITIAL_MILLIS: u64 = 10;

/// Maximum delay between conflicting status writes
pub const STATUS_RETRY_MAX_MILLIS: u64 = 1000;

// ============================================================================
// Condition Constants
// ============================================================================

/// Condition type reported on every managed resource
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Reason used when Vault accepted the desired state
pub const REASON_SYNCHRONIZED: &str = "Synchronized";

/// Reason used when the desired state could not be applied
pub const REASON_SYNC_FAILED: &str = "SyncFailed";

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default bind address for the metrics and health HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness probe
pub const HEALTH_PATH: &str = "/healthz";

/// Path for the readiness probe
pub const READY_PATH: &str = "/readyz";
