// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory Vault used by unit tests.
//!
//! `FakeVault` keeps just enough state to observe idempotence (mount tables,
//! KV data, policies, users, roles) and records every call in order.

use super::{
    mount_key, AppRoleConfig, HealthStatus, InitRequest, InitResponse, MountInfo, SealStatus,
    VaultApi, VaultClientFactory,
};
use crate::errors::VaultError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct FakeState {
    pub initialized: bool,
    pub sealed: bool,
    pub mounts: BTreeMap<String, MountInfo>,
    pub auth_methods: BTreeMap<String, MountInfo>,
    pub kv: BTreeMap<(String, String), BTreeMap<String, String>>,
    pub policies: BTreeMap<String, String>,
    pub users: BTreeMap<(String, String), (String, Vec<String>)>,
    pub approles: BTreeMap<(String, String), AppRoleConfig>,
    pub unseal_keys: Vec<String>,
    pub init_requests: Vec<InitRequest>,
    pub calls: Vec<String>,
    /// Operations (by method name) that fail with HTTP 500
    pub failing: BTreeSet<&'static str>,
    /// Error returned by `list_users` instead of the user list
    pub list_users_not_found_errors: Option<Vec<String>>,
    pub secret_id_counter: u32,
}

#[derive(Debug, Default, Clone)]
pub struct FakeVault {
    pub state: Arc<Mutex<FakeState>>,
}

fn operation_failed(op: &str) -> VaultError {
    VaultError::OperationFailed {
        status: 500,
        path: op.to_string(),
        errors: vec![format!("{op} failed")],
    }
}

fn not_found(path: String) -> VaultError {
    VaultError::NotFound {
        path,
        errors: vec![],
    }
}

impl FakeVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialized and unsealed server.
    pub fn ready() -> Self {
        let vault = Self::new();
        vault.with_state(|s| s.initialized = true);
        vault
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn fail(&self, op: &'static str) {
        self.with_state(|s| {
            s.failing.insert(op);
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.with_state(|s| s.calls.clone())
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == op).count()
    }

    /// Record the call and fail it if configured to.
    fn enter(&self, op: &'static str) -> Result<(), VaultError> {
        self.with_state(|s| {
            s.calls.push(op.to_string());
            if s.failing.contains(op) {
                Err(operation_failed(op))
            } else {
                Ok(())
            }
        })
    }
}

#[async_trait]
impl VaultApi for FakeVault {
    async fn health(&self) -> Result<HealthStatus, VaultError> {
        self.enter("health")?;
        Ok(self.with_state(|s| HealthStatus {
            initialized: s.initialized,
            sealed: s.sealed,
            standby: false,
            version: Some("1.15.0".into()),
        }))
    }

    async fn init_status(&self) -> Result<bool, VaultError> {
        self.enter("init_status")?;
        Ok(self.with_state(|s| s.initialized))
    }

    async fn initialize(&self, request: &InitRequest) -> Result<InitResponse, VaultError> {
        self.enter("initialize")?;
        Ok(self.with_state(|s| {
            s.initialized = true;
            s.sealed = true;
            s.init_requests.push(request.clone());
            InitResponse {
                keys: (1..=request.secret_shares).map(|i| format!("key-{i}")).collect(),
                keys_base64: vec![],
                root_token: "s.generated-root".into(),
            }
        }))
    }

    async fn seal_status(&self) -> Result<SealStatus, VaultError> {
        self.enter("seal_status")?;
        Ok(self.with_state(|s| SealStatus {
            sealed: s.sealed,
            threshold: 3,
            shares: 3,
            progress: 0,
        }))
    }

    async fn unseal(&self, key: &str) -> Result<SealStatus, VaultError> {
        self.enter("unseal")?;
        Ok(self.with_state(|s| {
            s.unseal_keys.push(key.to_string());
            if s.unseal_keys.len() >= 3 {
                s.sealed = false;
            }
            SealStatus {
                sealed: s.sealed,
                threshold: 3,
                shares: 3,
                progress: u32::try_from(s.unseal_keys.len()).unwrap_or(u32::MAX),
            }
        }))
    }

    async fn list_mounts(&self) -> Result<BTreeMap<String, MountInfo>, VaultError> {
        self.enter("list_mounts")?;
        Ok(self.with_state(|s| s.mounts.clone()))
    }

    async fn enable_mount(&self, path: &str, engine_type: &str) -> Result<(), VaultError> {
        self.enter("enable_mount")?;
        self.with_state(|s| {
            let key = mount_key(path);
            if s.mounts.contains_key(&key) {
                return Err(VaultError::OperationFailed {
                    status: 400,
                    path: format!("/v1/sys/mounts/{path}"),
                    errors: vec![format!("path is already in use at {key}")],
                });
            }
            s.mounts.insert(
                key,
                MountInfo {
                    mount_type: engine_type.to_string(),
                    description: None,
                },
            );
            Ok(())
        })
    }

    async fn disable_mount(&self, path: &str) -> Result<(), VaultError> {
        self.enter("disable_mount")?;
        self.with_state(|s| s.mounts.remove(&mount_key(path)));
        Ok(())
    }

    async fn kv2_read(&self, mount: &str, path: &str) -> Result<BTreeMap<String, Value>, VaultError> {
        self.enter("kv2_read")?;
        self.with_state(|s| {
            s.kv.get(&(mount.to_string(), path.to_string()))
                .map(|data| {
                    data.iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect()
                })
                .ok_or_else(|| not_found(format!("/v1/{mount}/data/{path}")))
        })
    }

    async fn kv2_write(
        &self,
        mount: &str,
        path: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<(), VaultError> {
        self.enter("kv2_write")?;
        self.with_state(|s| {
            s.kv.insert((mount.to_string(), path.to_string()), data.clone());
        });
        Ok(())
    }

    async fn kv2_delete(&self, mount: &str, path: &str) -> Result<(), VaultError> {
        self.enter("kv2_delete")?;
        self.with_state(|s| s.kv.remove(&(mount.to_string(), path.to_string())))
            .map(|_| ())
            .ok_or_else(|| not_found(format!("/v1/{mount}/data/{path}")))
    }

    async fn write_policy(&self, name: &str, document: &str) -> Result<(), VaultError> {
        self.enter("write_policy")?;
        self.with_state(|s| s.policies.insert(name.to_string(), document.to_string()));
        Ok(())
    }

    async fn delete_policy(&self, name: &str) -> Result<(), VaultError> {
        self.enter("delete_policy")?;
        self.with_state(|s| s.policies.remove(name));
        Ok(())
    }

    async fn list_auth_methods(&self) -> Result<BTreeMap<String, MountInfo>, VaultError> {
        self.enter("list_auth_methods")?;
        Ok(self.with_state(|s| s.auth_methods.clone()))
    }

    async fn enable_auth_method(
        &self,
        path: &str,
        method_type: &str,
        description: Option<&str>,
    ) -> Result<(), VaultError> {
        self.enter("enable_auth_method")?;
        self.with_state(|s| {
            s.auth_methods.insert(
                mount_key(path),
                MountInfo {
                    mount_type: method_type.to_string(),
                    description: description.map(str::to_string),
                },
            );
        });
        Ok(())
    }

    async fn disable_auth_method(&self, path: &str) -> Result<(), VaultError> {
        self.enter("disable_auth_method")?;
        self.with_state(|s| s.auth_methods.remove(&mount_key(path)));
        Ok(())
    }

    async fn list_users(&self, mount: &str) -> Result<Vec<String>, VaultError> {
        self.enter("list_users")?;
        self.with_state(|s| {
            if let Some(errors) = s.list_users_not_found_errors.clone() {
                return Err(VaultError::NotFound {
                    path: format!("/v1/auth/{mount}/users"),
                    errors,
                });
            }
            let users: Vec<String> = s
                .users
                .keys()
                .filter(|(m, _)| m == mount)
                .map(|(_, u)| u.clone())
                .collect();
            if users.is_empty() {
                // Vault answers an empty LIST with a bare 404
                Err(not_found(format!("/v1/auth/{mount}/users")))
            } else {
                Ok(users)
            }
        })
    }

    async fn write_user(
        &self,
        mount: &str,
        username: &str,
        password: &str,
        policies: &[String],
    ) -> Result<(), VaultError> {
        self.enter("write_user")?;
        self.with_state(|s| {
            s.users.insert(
                (mount.to_string(), username.to_string()),
                (password.to_string(), policies.to_vec()),
            );
        });
        Ok(())
    }

    async fn delete_user(&self, mount: &str, username: &str) -> Result<(), VaultError> {
        self.enter("delete_user")?;
        self.with_state(|s| s.users.remove(&(mount.to_string(), username.to_string())));
        Ok(())
    }

    async fn write_approle(
        &self,
        mount: &str,
        role: &str,
        config: &AppRoleConfig,
    ) -> Result<(), VaultError> {
        self.enter("write_approle")?;
        self.with_state(|s| {
            s.approles
                .insert((mount.to_string(), role.to_string()), config.clone());
        });
        Ok(())
    }

    async fn read_role_id(&self, mount: &str, role: &str) -> Result<String, VaultError> {
        self.enter("read_role_id")?;
        self.with_state(|s| {
            if s.approles.contains_key(&(mount.to_string(), role.to_string())) {
                Ok(format!("role-id-{role}"))
            } else {
                Err(not_found(format!("/v1/auth/{mount}/role/{role}/role-id")))
            }
        })
    }

    async fn generate_secret_id(&self, mount: &str, role: &str) -> Result<String, VaultError> {
        self.enter("generate_secret_id")?;
        self.with_state(|s| {
            if s.approles.contains_key(&(mount.to_string(), role.to_string())) {
                s.secret_id_counter += 1;
                Ok(format!("secret-id-{}", s.secret_id_counter))
            } else {
                Err(not_found(format!("/v1/auth/{mount}/role/{role}/secret-id")))
            }
        })
    }

    async fn delete_approle(&self, mount: &str, role: &str) -> Result<(), VaultError> {
        self.enter("delete_approle")?;
        self.with_state(|s| s.approles.remove(&(mount.to_string(), role.to_string())));
        Ok(())
    }
}

/// Factory handing out one shared [`FakeVault`] and remembering what it was asked for.
#[derive(Debug, Default, Clone)]
pub struct FakeVaultFactory {
    pub vault: FakeVault,
    pub requests: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl VaultClientFactory for FakeVaultFactory {
    fn build(
        &self,
        endpoint: &str,
        token: Option<&str>,
        _timeout: Duration,
    ) -> Result<Arc<dyn VaultApi>, VaultError> {
        self.requests
            .lock()
            .unwrap()
            .push((endpoint.to_string(), token.map(str::to_string)));
        Ok(Arc::new(self.vault.clone()))
    }
}
