//! Sensitive half of the store: one secret per entity, addressed by
//! `<service prefix>/<collection>` and the entity id

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use sapstore_secrets::SecureStore;
use serde_json::Value;

use super::{entity_collection_name, DataAccess, ReadOptions, Record};
use crate::classify::EntitySchema;
use crate::error::{StoreError, StoreResult};

/// Accessor over the process' secure store
#[derive(Clone)]
pub struct SecureAccess {
    store: Arc<dyn SecureStore>,
    service_prefix: String,
}

impl std::fmt::Debug for SecureAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureAccess")
            .field("backend", &self.store.backend_name())
            .field("service_prefix", &self.service_prefix)
            .finish()
    }
}

impl SecureAccess {
    pub fn new(store: Arc<dyn SecureStore>, service_prefix: impl Into<String>) -> Self {
        Self {
            store,
            service_prefix: service_prefix.into(),
        }
    }

    /// Qualified service name for an entity type, `None` for a blank name
    pub fn service_name(&self, schema: &EntitySchema) -> Option<String> {
        entity_collection_name(schema.name).map(|name| format!("{}/{}", self.service_prefix, name))
    }

    /// Read every secret of the entity type, looking up `known_ids` for
    /// backends that cannot enumerate
    pub async fn read_known(&self, schema: &EntitySchema, known_ids: &[String]) -> BTreeMap<String, Record> {
        let Some(service) = self.service_name(schema) else {
            return BTreeMap::new();
        };

        self.store
            .get_all(&service, known_ids)
            .await
            .into_iter()
            .filter_map(|(id, value)| as_record(&service, &id, value).map(|record| (id, record)))
            .collect()
    }
}

fn as_record(service: &str, id: &str, value: Value) -> Option<Record> {
    match value {
        Value::Object(record) => Some(record),
        _ => {
            tracing::warn!(service, id, "Ignoring secret that is not an object");
            None
        }
    }
}

#[async_trait]
impl DataAccess for SecureAccess {
    async fn read(&self, schema: &EntitySchema, id: &str, _options: ReadOptions) -> StoreResult<Option<Record>> {
        let Some(service) = self.service_name(schema) else {
            return Ok(None);
        };
        Ok(self
            .store
            .retrieve(&service, id)
            .await
            .and_then(|value| as_record(&service, id, value)))
    }

    async fn read_all(&self, schema: &EntitySchema, _options: ReadOptions) -> StoreResult<BTreeMap<String, Record>> {
        Ok(self.read_known(schema, &[]).await)
    }

    async fn write(&self, schema: &EntitySchema, id: &str, record: &Record) -> StoreResult<Record> {
        let Some(service) = self.service_name(schema) else {
            return Ok(Record::new());
        };

        if self
            .store
            .save(&service, id, &Value::Object(record.clone()))
            .await
        {
            Ok(record.clone())
        } else {
            Err(StoreError::SecretRejected {
                service,
                key: id.to_string(),
            })
        }
    }

    async fn delete(&self, schema: &EntitySchema, id: &str) -> StoreResult<bool> {
        let Some(service) = self.service_name(schema) else {
            return Ok(false);
        };
        Ok(self.store.delete(&service, id).await)
    }

    async fn delete_sensitive(&self, schema: &EntitySchema, id: &str) -> StoreResult<bool> {
        self.delete(schema, id).await
    }
}
