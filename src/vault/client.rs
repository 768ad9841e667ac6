// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP implementation of [`VaultApi`] on top of `reqwest`.
//!
//! Every request is authenticated with `Authorization: Bearer <token>` when a
//! token is configured and bounded by the per-client timeout. Responses are
//! classified into [`VaultError`] variants:
//!
//! | Response | Result |
//! |----------|--------|
//! | 2xx | body decoded (empty body allowed) |
//! | 404 | [`VaultError::NotFound`] with the body's `errors` array |
//! | other | [`VaultError::OperationFailed`] |
//! | no response | [`VaultError::Transport`] |

use super::{
    AppRoleConfig, HealthStatus, InitRequest, InitResponse, MountInfo, SealStatus, VaultApi,
};
use crate::errors::VaultError;
use crate::metrics;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Vault HTTP API client bound to one server endpoint and token.
#[derive(Clone, Debug)]
pub struct VaultHttpClient {
    http: HttpClient,
    endpoint: String,
    token: Option<String>,
}

impl VaultHttpClient {
    /// Create a client for `endpoint` (e.g. `http://vault.vault-system.svc.cluster.local:8200`).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        endpoint: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, VaultError> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| VaultError::Transport {
                path: endpoint.to_string(),
                source,
            })?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Base endpoint of the server this client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn api_path(path: &str) -> String {
        format!("/v1/{}", path.trim_start_matches('/'))
    }

    /// Send a request and return the decoded JSON body, `None` for empty bodies.
    ///
    /// `operation` names the [`VaultApi`] call in request metrics.
    async fn request(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>, VaultError> {
        let api_path = Self::api_path(path);
        let url = format!("{}{api_path}", self.endpoint);

        debug!(operation, method = %method, path = %api_path, "Vault API request");

        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(source) => {
                metrics::record_vault_request(operation, "transport_error");
                return Err(VaultError::Transport {
                    path: api_path,
                    source,
                });
            }
        };

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| VaultError::Transport {
                path: api_path.clone(),
                source,
            })?;

        if status == StatusCode::NOT_FOUND {
            metrics::record_vault_request(operation, "not_found");
            return Err(VaultError::NotFound {
                path: api_path,
                errors: parse_errors(&text),
            });
        }

        if !status.is_success() {
            metrics::record_vault_request(operation, "error");
            warn!(
                operation,
                method = %method,
                path = %api_path,
                status = %status,
                "Vault API request failed"
            );
            return Err(VaultError::OperationFailed {
                status: status.as_u16(),
                path: api_path,
                errors: parse_errors(&text),
            });
        }

        metrics::record_vault_request(operation, "success");

        if text.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| VaultError::InvalidResponse {
                path: api_path,
                message: format!("invalid JSON body: {e}"),
            })
    }

    /// Send a request whose response body must decode into `T`.
    async fn request_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, VaultError> {
        let value = self
            .request(operation, method, path, body)
            .await?
            .ok_or_else(|| VaultError::InvalidResponse {
                path: Self::api_path(path),
                message: "empty response body".to_string(),
            })?;

        serde_json::from_value(value).map_err(|e| VaultError::InvalidResponse {
            path: Self::api_path(path),
            message: e.to_string(),
        })
    }

    /// Read `data.<field>` from a response as a string.
    async fn read_data_field(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        field: &str,
    ) -> Result<String, VaultError> {
        let value = self
            .request(operation, method, path, None)
            .await?
            .unwrap_or(Value::Null);
        value
            .pointer(&format!("/data/{field}"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| VaultError::InvalidResponse {
                path: Self::api_path(path),
                message: format!("missing data.{field}"),
            })
    }

    async fn mount_table(
        &self,
        operation: &'static str,
        path: &str,
    ) -> Result<BTreeMap<String, MountInfo>, VaultError> {
        let value = self
            .request(operation, Method::GET, path, None)
            .await?
            .unwrap_or(Value::Null);
        Ok(parse_mount_table(&value))
    }
}

/// Extract the `errors` array of a Vault error body. Non-JSON bodies yield no entries.
fn parse_errors(body: &str) -> Vec<String> {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("errors").cloned())
        .and_then(|errors| serde_json::from_value(errors).ok())
        .unwrap_or_default()
}

/// Parse a mount table (`sys/mounts`, `sys/auth`).
///
/// Newer Vault versions wrap the table in `data`; older ones return it at the
/// top level next to request metadata, so entries that do not look like a
/// mount are skipped.
fn parse_mount_table(value: &Value) -> BTreeMap<String, MountInfo> {
    let table = value.get("data").filter(|d| d.is_object()).unwrap_or(value);

    table
        .as_object()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(key, entry)| {
                    serde_json::from_value::<MountInfo>(entry.clone())
                        .ok()
                        .map(|info| (key.clone(), info))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn trim(segment: &str) -> &str {
    segment.trim_matches('/')
}

#[async_trait]
impl VaultApi for VaultHttpClient {
    async fn health(&self) -> Result<HealthStatus, VaultError> {
        self.request_json(
            "health",
            Method::GET,
            "sys/health?standbyok=true&sealedcode=200&uninitcode=200",
            None,
        )
        .await
    }

    async fn init_status(&self) -> Result<bool, VaultError> {
        let value: Value = self
            .request_json("init_status", Method::GET, "sys/init", None)
            .await?;
        value
            .get("initialized")
            .and_then(Value::as_bool)
            .ok_or_else(|| VaultError::InvalidResponse {
                path: Self::api_path("sys/init"),
                message: "missing initialized flag".to_string(),
            })
    }

    async fn initialize(&self, request: &InitRequest) -> Result<InitResponse, VaultError> {
        let body = json!(request);
        self.request_json("initialize", Method::PUT, "sys/init", Some(&body))
            .await
    }

    async fn seal_status(&self) -> Result<SealStatus, VaultError> {
        self.request_json("seal_status", Method::GET, "sys/seal-status", None)
            .await
    }

    async fn unseal(&self, key: &str) -> Result<SealStatus, VaultError> {
        let body = json!({ "key": key });
        self.request_json("unseal", Method::PUT, "sys/unseal", Some(&body))
            .await
    }

    async fn list_mounts(&self) -> Result<BTreeMap<String, MountInfo>, VaultError> {
        self.mount_table("list_mounts", "sys/mounts").await
    }

    async fn enable_mount(&self, path: &str, engine_type: &str) -> Result<(), VaultError> {
        let body = json!({ "type": engine_type });
        self.request(
            "enable_mount",
            Method::POST,
            &format!("sys/mounts/{}", trim(path)),
            Some(&body),
        )
        .await
        .map(|_| ())
    }

    async fn disable_mount(&self, path: &str) -> Result<(), VaultError> {
        self.request(
            "disable_mount",
            Method::DELETE,
            &format!("sys/mounts/{}", trim(path)),
            None,
        )
        .await
        .map(|_| ())
    }

    async fn kv2_read(
        &self,
        mount: &str,
        path: &str,
    ) -> Result<BTreeMap<String, Value>, VaultError> {
        let api_path = format!("{}/data/{}", trim(mount), trim(path));
        let value = self
            .request("kv2_read", Method::GET, &api_path, None)
            .await?
            .unwrap_or(Value::Null);

        Ok(value
            .pointer("/data/data")
            .and_then(Value::as_object)
            .map(|data| data.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn kv2_write(
        &self,
        mount: &str,
        path: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<(), VaultError> {
        let body = json!({ "data": data });
        self.request(
            "kv2_write",
            Method::POST,
            &format!("{}/data/{}", trim(mount), trim(path)),
            Some(&body),
        )
        .await
        .map(|_| ())
    }

    async fn kv2_delete(&self, mount: &str, path: &str) -> Result<(), VaultError> {
        self.request(
            "kv2_delete",
            Method::DELETE,
            &format!("{}/data/{}", trim(mount), trim(path)),
            None,
        )
        .await
        .map(|_| ())
    }

    async fn write_policy(&self, name: &str, document: &str) -> Result<(), VaultError> {
        let body = json!({ "policy": document });
        self.request(
            "write_policy",
            Method::PUT,
            &format!("sys/policies/acl/{name}"),
            Some(&body),
        )
        .await
        .map(|_| ())
    }

    async fn delete_policy(&self, name: &str) -> Result<(), VaultError> {
        self.request(
            "delete_policy",
            Method::DELETE,
            &format!("sys/policies/acl/{name}"),
            None,
        )
        .await
        .map(|_| ())
    }

    async fn list_auth_methods(&self) -> Result<BTreeMap<String, MountInfo>, VaultError> {
        self.mount_table("list_auth_methods", "sys/auth").await
    }

    async fn enable_auth_method(
        &self,
        path: &str,
        method_type: &str,
        description: Option<&str>,
    ) -> Result<(), VaultError> {
        let mut body = json!({ "type": method_type });
        if let Some(description) = description {
            body["description"] = json!(description);
        }
        self.request(
            "enable_auth_method",
            Method::POST,
            &format!("sys/auth/{}", trim(path)),
            Some(&body),
        )
        .await
        .map(|_| ())
    }

    async fn disable_auth_method(&self, path: &str) -> Result<(), VaultError> {
        self.request(
            "disable_auth_method",
            Method::DELETE,
            &format!("sys/auth/{}", trim(path)),
            None,
        )
        .await
        .map(|_| ())
    }

    async fn list_users(&self, mount: &str) -> Result<Vec<String>, VaultError> {
        let path = format!("auth/{}/users?list=true", trim(mount));
        let value = self
            .request("list_users", Method::GET, &path, None)
            .await?
            .unwrap_or(Value::Null);

        Ok(value
            .pointer("/data/keys")
            .cloned()
            .and_then(|keys| serde_json::from_value(keys).ok())
            .unwrap_or_default())
    }

    async fn write_user(
        &self,
        mount: &str,
        username: &str,
        password: &str,
        policies: &[String],
    ) -> Result<(), VaultError> {
        let body = json!({
            "password": password,
            "token_policies": policies,
        });
        self.request(
            "write_user",
            Method::POST,
            &format!("auth/{}/users/{username}", trim(mount)),
            Some(&body),
        )
        .await
        .map(|_| ())
    }

    async fn delete_user(&self, mount: &str, username: &str) -> Result<(), VaultError> {
        self.request(
            "delete_user",
            Method::DELETE,
            &format!("auth/{}/users/{username}", trim(mount)),
            None,
        )
        .await
        .map(|_| ())
    }

    async fn write_approle(
        &self,
        mount: &str,
        role: &str,
        config: &AppRoleConfig,
    ) -> Result<(), VaultError> {
        let body = json!(config);
        self.request(
            "write_approle",
            Method::POST,
            &format!("auth/{}/role/{role}", trim(mount)),
            Some(&body),
        )
        .await
        .map(|_| ())
    }

    async fn read_role_id(&self, mount: &str, role: &str) -> Result<String, VaultError> {
        self.read_data_field(
            "read_role_id",
            Method::GET,
            &format!("auth/{}/role/{role}/role-id", trim(mount)),
            "role_id",
        )
        .await
    }

    async fn generate_secret_id(&self, mount: &str, role: &str) -> Result<String, VaultError> {
        self.read_data_field(
            "generate_secret_id",
            Method::POST,
            &format!("auth/{}/role/{role}/secret-id", trim(mount)),
            "secret_id",
        )
        .await
    }

    async fn delete_approle(&self, mount: &str, role: &str) -> Result<(), VaultError> {
        self.request(
            "delete_approle",
            Method::DELETE,
            &format!("auth/{}/role/{role}", trim(mount)),
            None,
        )
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
