//! Storage accessors
//!
//! Every accessor implements [`DataAccess`]. The hybrid store is the one used
//! by the services; the filesystem and secure accessors are its two halves.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::classify::EntitySchema;
use crate::error::StoreResult;

mod filesystem;
mod hybrid;
mod secure;

pub use filesystem::FilesystemStore;
pub(crate) use filesystem::{acquire_lock, replace_file, sibling};
pub use hybrid::HybridStore;
pub use secure::SecureAccess;

/// One entity as a JSON object
pub type Record = Map<String, Value>;

/// Options for the read operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Consult the secret manager as well as the plaintext files
    pub include_sensitive_data: bool,
}

impl ReadOptions {
    pub fn full() -> Self {
        Self {
            include_sensitive_data: true,
        }
    }

    pub fn plaintext() -> Self {
        Self {
            include_sensitive_data: false,
        }
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::full()
    }
}

/// Keyed CRUD over the records of one entity type
#[async_trait]
pub trait DataAccess: Send + Sync {
    /// Read the record stored under `id`
    async fn read(
        &self,
        schema: &EntitySchema,
        id: &str,
        options: ReadOptions,
    ) -> StoreResult<Option<Record>>;

    /// Read every record of the entity type, keyed by id
    async fn read_all(
        &self,
        schema: &EntitySchema,
        options: ReadOptions,
    ) -> StoreResult<BTreeMap<String, Record>>;

    /// Read every record of the entity type, without ids
    async fn get_all(&self, schema: &EntitySchema, options: ReadOptions) -> StoreResult<Vec<Record>> {
        Ok(self.read_all(schema, options).await?.into_values().collect())
    }

    /// Store `record` under `id`, replacing any previous record
    ///
    /// # Returns
    /// The fields that were persisted
    async fn write(&self, schema: &EntitySchema, id: &str, record: &Record) -> StoreResult<Record>;

    /// Remove the record stored under `id`
    ///
    /// Fails if any part of the record could not be removed, even when
    /// another part was.
    ///
    /// # Returns
    /// `true` if something was removed
    async fn delete(&self, schema: &EntitySchema, id: &str) -> StoreResult<bool>;

    /// Remove only the sensitive fields stored under `id`
    ///
    /// Accessors without a secret half have nothing to remove.
    async fn delete_sensitive(&self, _schema: &EntitySchema, _id: &str) -> StoreResult<bool> {
        Ok(false)
    }
}

/// Normalized, pluralized entity name used for file and service names
///
/// `None` for a blank name.
pub fn entity_collection_name(entity_name: &str) -> Option<String> {
    let name = entity_name.trim().to_lowercase();
    if name.is_empty() {
        None
    } else {
        Some(pluralize(&name))
    }
}

fn pluralize(word: &str) -> String {
    if word.ends_with("ss")
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{}es", word);
    }
    if word.ends_with('s') {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{}ies", stem);
        }
    }
    format!("{}s", word)
}
