//! The secure store contract and its JSON-framing adapter over raw backends

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::backends::CredentialBackend;
use crate::codec::{decode, encode};

/// Key/value access to the platform secret manager
///
/// Every implementation reports failures through its return value instead of
/// an error: callers treat a missing secret manager like an empty one.
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Short backend name for logging
    fn backend_name(&self) -> &'static str;

    /// Store `value` under `service`/`key`, replacing any previous value
    ///
    /// # Returns
    /// `true` if the backend accepted the value
    async fn save(&self, service: &str, key: &str, value: &Value) -> bool;

    /// Read the value stored under `service`/`key`
    async fn retrieve(&self, service: &str, key: &str) -> Option<Value>;

    /// Remove the value stored under `service`/`key`
    ///
    /// # Returns
    /// `true` if a value existed and was removed
    async fn delete(&self, service: &str, key: &str) -> bool;

    /// Read every value stored for `service`
    ///
    /// Backends that cannot enumerate entries look up each of `known_keys`,
    /// so the result is best-effort.
    async fn get_all(&self, service: &str, known_keys: &[String]) -> BTreeMap<String, Value>;
}

/// [`SecureStore`] over a raw string backend, adding JSON framing and logging
pub struct BackedStore<B> {
    backend: B,
}

impl<B: CredentialBackend> BackedStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<B: CredentialBackend> SecureStore for BackedStore<B> {
    fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    async fn save(&self, service: &str, key: &str, value: &Value) -> bool {
        let raw = match encode(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(service, key, "Cannot encode secret: {}", e);
                return false;
            }
        };

        match self.backend.set(service, key, &raw).await {
            Ok(()) => {
                tracing::debug!(backend = self.backend.name(), service, key, "Secret saved");
                true
            }
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), service, key, "Failed to save secret: {}", e);
                false
            }
        }
    }

    async fn retrieve(&self, service: &str, key: &str) -> Option<Value> {
        let raw = match self.backend.get(service, key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), service, key, "Failed to read secret: {}", e);
                return None;
            }
        };

        match decode(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(service, key, "Ignoring unreadable secret: {}", e);
                None
            }
        }
    }

    async fn delete(&self, service: &str, key: &str) -> bool {
        match self.backend.remove(service, key).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), service, key, "Failed to delete secret: {}", e);
                false
            }
        }
    }

    async fn get_all(&self, service: &str, known_keys: &[String]) -> BTreeMap<String, Value> {
        let mut accounts: Vec<String> = match self.backend.accounts(service).await {
            Ok(Some(listed)) => listed,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), service, "Cannot enumerate secrets: {}", e);
                Vec::new()
            }
        };
        for key in known_keys {
            if !accounts.contains(key) {
                accounts.push(key.clone());
            }
        }

        let mut values = BTreeMap::new();
        for account in accounts {
            match self.backend.get(service, &account).await {
                Ok(Some(raw)) => match decode(&raw) {
                    Ok(value) => {
                        values.insert(account, value);
                    }
                    Err(e) => {
                        tracing::warn!(service, key = %account, "Skipping unreadable secret: {}", e);
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(service, key = %account, "Skipping secret: {}", e);
                }
            }
        }
        values
    }
}
