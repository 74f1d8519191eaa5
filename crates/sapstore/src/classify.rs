//! Per-type field classification
//!
//! Each entity type declares, once, which of its JSON fields may be written in
//! plaintext and which belong in the secret manager. Fields in neither list are
//! never persisted by the generic store.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::access::Record;
use crate::error::{StoreError, StoreResult};

/// Static storage metadata for one entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    /// Entity type name, normalized into the file and service names
    pub name: &'static str,
    /// Fields persisted in plaintext, in declaration order
    pub serializable: &'static [&'static str],
    /// Fields persisted only in the secret manager
    pub sensitive: &'static [&'static str],
}

impl EntitySchema {
    pub fn serializable(&self) -> &'static [&'static str] {
        self.serializable
    }

    pub fn sensitive(&self) -> &'static [&'static str] {
        self.sensitive
    }

    pub fn is_sensitive(&self, field: &str) -> bool {
        self.sensitive.contains(&field)
    }

    /// Fields tagged both serializable and sensitive
    pub fn conflicts(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.serializable
            .iter()
            .copied()
            .filter(|field| self.sensitive.contains(field))
    }
}

/// A record type stored through the generic store
pub trait Entity: Serialize + DeserializeOwned {
    const SCHEMA: EntitySchema;

    fn to_record(&self) -> StoreResult<Record> {
        match serde_json::to_value(self) {
            Ok(Value::Object(record)) => Ok(record),
            Ok(_) => Err(StoreError::invalid(format!(
                "{} does not serialize to an object",
                Self::SCHEMA.name
            ))),
            Err(e) => Err(StoreError::invalid(e.to_string())),
        }
    }

    fn from_record(record: Record) -> StoreResult<Self> {
        serde_json::from_value(Value::Object(record))
            .map_err(|e| StoreError::invalid(format!("{}: {}", Self::SCHEMA.name, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUAL: EntitySchema = EntitySchema {
        name: "dual",
        serializable: &["name", "token", "url"],
        sensitive: &["token", "password"],
    };

    #[test]
    fn test_conflicts_lists_dual_tagged_fields() {
        assert_eq!(DUAL.conflicts().collect::<Vec<_>>(), vec!["token"]);
    }

    #[test]
    fn test_lists_keep_declaration_order() {
        assert_eq!(DUAL.serializable(), &["name", "token", "url"]);
        assert!(DUAL.is_sensitive("password"));
        assert!(!DUAL.is_sensitive("name"));
    }
}
