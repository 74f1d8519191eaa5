//! The composed store: plaintext fields on disk, sensitive fields in the
//! secret manager, merged on read
//!
//! Writes are best-effort per half. Both halves are always attempted; a half
//! that succeeded stays written even when the other one fails, and the
//! failure is reported through [`StoreError::PartialWrite`] so the caller can
//! retry.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use super::{DataAccess, FilesystemStore, ReadOptions, Record, SecureAccess};
use crate::classify::EntitySchema;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct HybridStore {
    filesystem: FilesystemStore,
    secure: SecureAccess,
}

impl HybridStore {
    pub fn new(filesystem: FilesystemStore, secure: SecureAccess) -> Self {
        Self { filesystem, secure }
    }

    pub fn filesystem(&self) -> &FilesystemStore {
        &self.filesystem
    }

    pub fn secure(&self) -> &SecureAccess {
        &self.secure
    }
}

/// Split a record into its plaintext and sensitive halves
///
/// Untagged fields and null values are dropped. A field tagged both ways goes
/// to the sensitive half only.
pub(crate) fn partition(schema: &EntitySchema, record: &Record) -> (Record, Record) {
    for field in schema.conflicts() {
        tracing::warn!(
            entity = schema.name,
            field,
            "Field is tagged both serializable and sensitive, storing it as sensitive only"
        );
    }

    let pick = |fields: &[&str], skip_sensitive: bool| -> Record {
        fields
            .iter()
            .filter(|field| !(skip_sensitive && schema.is_sensitive(field)))
            .filter_map(|field| match record.get(*field) {
                None | Some(Value::Null) => None,
                Some(value) => Some((field.to_string(), value.clone())),
            })
            .collect()
    };

    (pick(schema.serializable(), true), pick(schema.sensitive(), false))
}

/// Shallow merge, sensitive fields winning
fn merge(plain: Option<Record>, secret: Option<Record>) -> Option<Record> {
    match (plain, secret) {
        (None, None) => None,
        (plain, secret) => {
            let mut merged = plain.unwrap_or_default();
            merged.extend(secret.unwrap_or_default());
            Some(merged)
        }
    }
}

#[async_trait]
impl DataAccess for HybridStore {
    async fn read(&self, schema: &EntitySchema, id: &str, options: ReadOptions) -> StoreResult<Option<Record>> {
        let (plain, secret) = if options.include_sensitive_data {
            tokio::join!(
                self.filesystem.read(schema, id, options),
                self.secure.read(schema, id, options)
            )
        } else {
            (self.filesystem.read(schema, id, options).await, Ok(None))
        };

        Ok(merge(plain?, secret?))
    }

    async fn read_all(&self, schema: &EntitySchema, options: ReadOptions) -> StoreResult<BTreeMap<String, Record>> {
        let mut records = self.filesystem.read_all(schema, options).await?;
        if !options.include_sensitive_data {
            return Ok(records);
        }

        // Plaintext ids double as the lookup list for backends that cannot enumerate
        let known: Vec<String> = records.keys().cloned().collect();
        for (id, secret) in self.secure.read_known(schema, &known).await {
            records.entry(id).or_default().extend(secret);
        }
        Ok(records)
    }

    async fn write(&self, schema: &EntitySchema, id: &str, record: &Record) -> StoreResult<Record> {
        let (plain, secret) = partition(schema, record);

        let plain_half = async {
            if plain.is_empty() {
                Ok(())
            } else {
                self.filesystem.write(schema, id, &plain).await.map(|_| ())
            }
        };
        let secret_half = async {
            if secret.is_empty() {
                Ok(())
            } else {
                self.secure.write(schema, id, &secret).await.map(|_| ())
            }
        };
        let (plain_result, secret_result) = tokio::join!(plain_half, secret_half);

        let failures: Vec<String> = [
            plain_result.as_ref().err().map(|e| format!("plaintext: {}", e)),
            secret_result.as_ref().err().map(|e| format!("secure storage: {}", e)),
        ]
        .into_iter()
        .flatten()
        .collect();

        if !failures.is_empty() {
            tracing::warn!(entity = schema.name, id, "Write only partially persisted");
            return Err(StoreError::PartialWrite {
                entity: schema.name.to_string(),
                id: id.to_string(),
                reason: failures.join("; "),
                plaintext_saved: plain_result.is_ok(),
                secret_saved: secret_result.is_ok(),
            });
        }

        tracing::debug!(
            entity = schema.name,
            id,
            plaintext_fields = plain.len(),
            sensitive_fields = secret.len(),
            "Record written"
        );
        Ok(merge(Some(plain), Some(secret)).unwrap_or_default())
    }

    async fn delete(&self, schema: &EntitySchema, id: &str) -> StoreResult<bool> {
        let (plain, secret) = tokio::join!(
            self.filesystem.delete(schema, id),
            self.secure.delete(schema, id)
        );
        let secret = secret?;

        match plain {
            Ok(plain) => Ok(plain || secret),
            Err(e) => {
                if secret {
                    tracing::warn!(entity = schema.name, id, "Secret removed but plaintext delete failed");
                }
                Err(e)
            }
        }
    }

    async fn delete_sensitive(&self, schema: &EntitySchema, id: &str) -> StoreResult<bool> {
        if schema.sensitive().is_empty() {
            return Ok(false);
        }
        self.secure.delete(schema, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEMA: EntitySchema = EntitySchema {
        name: "system",
        serializable: &["name", "url", "token"],
        sensitive: &["password", "token"],
    };

    fn record(value: Value) -> Record {
        match value {
            Value::Object(record) => record,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_partition_routes_by_tag() {
        let input = record(json!({
            "name": "sys1",
            "url": "http://a",
            "password": "p1",
            "scratch": "never stored",
        }));
        let (plain, secret) = partition(&SCHEMA, &input);

        assert_eq!(plain, record(json!({ "name": "sys1", "url": "http://a" })));
        assert_eq!(secret, record(json!({ "password": "p1" })));
    }

    #[test]
    fn test_partition_dual_tagged_field_is_sensitive() {
        let input = record(json!({ "name": "sys1", "token": "t" }));
        let (plain, secret) = partition(&SCHEMA, &input);

        assert!(!plain.contains_key("token"));
        assert_eq!(secret["token"], "t");
    }

    #[test]
    fn test_partition_drops_nulls() {
        let input = record(json!({ "name": "sys1", "password": null }));
        let (_, secret) = partition(&SCHEMA, &input);
        assert!(secret.is_empty());
    }

    #[test]
    fn test_merge_prefers_secret_half() {
        let merged = merge(
            Some(record(json!({ "name": "plain", "password": "old" }))),
            Some(record(json!({ "password": "new" }))),
        )
        .unwrap();
        assert_eq!(merged, record(json!({ "name": "plain", "password": "new" })));

        assert!(merge(None, None).is_none());
        assert_eq!(
            merge(None, Some(record(json!({ "password": "p" })))).unwrap()["password"],
            "p"
        );
    }
}
