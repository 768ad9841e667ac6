// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! KV-v2 secrets with create-once semantics.
//!
//! A secret that already exists is never overwritten. When it is absent, every
//! value equal to [`RANDOM_SENTINEL`] is replaced by a freshly generated
//! alphanumeric string before the first write.

use super::VaultApi;
use crate::constants::{RANDOM_SECRET_LENGTH, RANDOM_SENTINEL};
use crate::errors::VaultError;
use rand::distr::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, TryRngCore};
use std::collections::BTreeMap;
use tracing::{info, warn};

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Largest multiple of the charset length that fits in a byte; bytes above it are rejected.
#[allow(clippy::cast_possible_truncation)]
const REJECTION_BOUND: u8 = (256 - 256 % CHARSET.len()) as u8;

/// Result of [`KvSecretOperator::create_or_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvWriteOutcome {
    /// The secret was absent and has been written.
    Created,
    /// The secret already existed and was left untouched.
    AlreadyExists,
}

/// Create-once KV-v2 secret operations.
pub struct KvSecretOperator<'a> {
    vault: &'a dyn VaultApi,
}

impl<'a> KvSecretOperator<'a> {
    #[must_use]
    pub fn new(vault: &'a dyn VaultApi) -> Self {
        Self { vault }
    }

    /// Write the secret at `<path>/<name>` unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the existence check fails for any reason other than
    /// not-found, or if the write fails.
    pub async fn create_or_update(
        &self,
        mount: &str,
        path: &str,
        name: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<KvWriteOutcome, VaultError> {
        let secret_path = join_secret_path(path, name);

        match self.vault.kv2_read(mount, &secret_path).await {
            Ok(_) => {
                info!(mount = %mount, path = %secret_path, "Secret already exists, leaving it untouched");
                return Ok(KvWriteOutcome::AlreadyExists);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                return Err(VaultError::ExistenceCheck {
                    path: format!("secret {mount}/{secret_path}"),
                    source: Box::new(e),
                })
            }
        }

        let materialized = materialize(data);
        self.vault.kv2_write(mount, &secret_path, &materialized).await?;

        info!(mount = %mount, path = %secret_path, keys = materialized.len(), "Created secret");
        Ok(KvWriteOutcome::Created)
    }

    /// Delete the secret at `<path>/<name>`. An absent secret is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if Vault rejects the delete.
    pub async fn delete(&self, mount: &str, path: &str, name: &str) -> Result<(), VaultError> {
        let secret_path = join_secret_path(path, name);
        match self.vault.kv2_delete(mount, &secret_path).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}

/// Join the secret path and name with exactly one `/`.
#[must_use]
pub fn join_secret_path(path: &str, name: &str) -> String {
    [path, name]
        .iter()
        .map(|segment| segment.trim_matches('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Replace every sentinel value with a generated random string.
#[must_use]
pub fn materialize(data: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    data.iter()
        .map(|(key, value)| {
            let value = if value == RANDOM_SENTINEL {
                generate_random_string(RANDOM_SECRET_LENGTH)
            } else {
                value.clone()
            };
            (key.clone(), value)
        })
        .collect()
}

/// Generate an alphanumeric string from the operating system RNG.
#[must_use]
pub fn generate_random_string(length: usize) -> String {
    generate_random_string_with(length, |buf| OsRng.try_fill_bytes(buf).map_err(|e| e.to_string()))
}

/// Generate an alphanumeric string using `fill` as the entropy source.
///
/// Bytes are mapped onto the charset with rejection sampling so every
/// character is equally likely. If `fill` fails, the thread-local RNG is used
/// instead, still sampling uniformly over the same alphabet.
pub(crate) fn generate_random_string_with<F>(length: usize, mut fill: F) -> String
where
    F: FnMut(&mut [u8]) -> Result<(), String>,
{
    let mut result = String::with_capacity(length);
    let mut buf = vec![0u8; length.max(1)];

    while result.len() < length {
        if let Err(e) = fill(&mut buf) {
            warn!(error = %e, "Secure random source failed, falling back to thread RNG");
            return rand::rng()
                .sample_iter(Alphanumeric)
                .take(length)
                .map(char::from)
                .collect();
        }

        for &byte in &buf {
            if result.len() == length {
                break;
            }
            if byte < REJECTION_BOUND {
                result.push(char::from(CHARSET[usize::from(byte) % CHARSET.len()]));
            }
        }
    }

    result
}

#[cfg(test)]
#[path = "kv_tests.rs"]
mod kv_tests;
