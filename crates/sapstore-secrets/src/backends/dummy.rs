//! No-op backend used when secure storage is disabled or unavailable

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::store::SecureStore;

/// Secure store that keeps nothing
///
/// Writes and deletes report success so callers never fail because no secret
/// manager exists; reads always come back empty.
#[derive(Debug, Default)]
pub struct DummyStore {
    _private: (),
}

impl DummyStore {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

#[async_trait]
impl SecureStore for DummyStore {
    fn backend_name(&self) -> &'static str {
        "dummy"
    }

    async fn save(&self, service: &str, key: &str, _value: &Value) -> bool {
        tracing::debug!(service, key, "Secure storage disabled, secret not saved");
        true
    }

    async fn retrieve(&self, service: &str, key: &str) -> Option<Value> {
        tracing::debug!(service, key, "Secure storage disabled, nothing to retrieve");
        None
    }

    async fn delete(&self, service: &str, key: &str) -> bool {
        tracing::debug!(service, key, "Secure storage disabled, nothing to delete");
        true
    }

    async fn get_all(&self, service: &str, _known_keys: &[String]) -> BTreeMap<String, Value> {
        tracing::debug!(service, "Secure storage disabled, no secrets listed");
        BTreeMap::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_dummy_accepts_and_forgets() {
        let store = DummyStore::new();
        assert!(store.save("svc", "k", &json!({ "password": "p" })).await);
        assert_eq!(store.retrieve("svc", "k").await, None);
        assert!(store.delete("svc", "k").await);
        assert!(store.get_all("svc", &["k".to_string()]).await.is_empty());
    }
}
