//! Backend system data provider: key derivation, metadata stamping and the
//! lazy migration on listing

use std::sync::Arc;

use serde_json::Value;

use crate::access::{DataAccess, ReadOptions, Record};
use crate::classify::Entity;
use crate::entities::{BackendSystem, BackendSystemKey, SystemType};
use crate::error::StoreResult;
use crate::migration::{self, MigrationOutcome, MigrationSentinel};

const HAS_SENSITIVE_DATA: &str = "hasSensitiveData";

/// Options for listing backend systems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetAllOptions {
    pub include_sensitive_data: bool,
    /// Only return systems of this type
    pub system_type: Option<SystemType>,
}

impl Default for GetAllOptions {
    fn default() -> Self {
        Self {
            include_sensitive_data: true,
            system_type: None,
        }
    }
}

fn declares_no_secrets(record: &Record) -> bool {
    record.get(HAS_SENSITIVE_DATA) == Some(&Value::Bool(false))
}

/// Drop sensitive fields from a record stamped as holding none
///
/// Secrets left behind by an earlier write under the same key are not part
/// of the current system.
fn without_stale_secrets(mut record: Record) -> Record {
    if declares_no_secrets(&record) {
        for field in BackendSystem::SCHEMA.sensitive() {
            record.remove(*field);
        }
    }
    record
}

#[derive(Clone)]
pub struct SystemDataProvider {
    access: Arc<dyn DataAccess>,
    sentinel: MigrationSentinel,
}

impl SystemDataProvider {
    pub fn new(access: Arc<dyn DataAccess>, sentinel: MigrationSentinel) -> Self {
        Self { access, sentinel }
    }

    /// Read one system
    ///
    /// The secret manager is skipped when the plaintext record says it holds
    /// no credentials.
    pub async fn read(&self, key: &BackendSystemKey, include_sensitive_data: bool) -> StoreResult<Option<BackendSystem>> {
        let schema = BackendSystem::SCHEMA;
        let id = key.id();

        let plain = self.access.read(&schema, &id, ReadOptions::plaintext()).await?;
        let record = match plain {
            Some(plain) if !include_sensitive_data || declares_no_secrets(&plain) => Some(plain),
            _ if include_sensitive_data => self.access.read(&schema, &id, ReadOptions::full()).await?,
            _ => None,
        };

        record.map(BackendSystem::from_record).transpose()
    }

    /// Write a system under its derived key, stamping `hasSensitiveData`
    pub async fn write(&self, system: &BackendSystem) -> StoreResult<BackendSystem> {
        let mut system = system.clone();
        system.has_sensitive_data = Some(system.has_sensitive_content());

        let id = system.key().id();
        self.access
            .write(&BackendSystem::SCHEMA, &id, &system.to_record()?)
            .await?;

        // Credentials of a system previously saved under this key
        if system.has_sensitive_data == Some(false) {
            match self.access.delete_sensitive(&BackendSystem::SCHEMA, &id).await {
                Ok(true) => tracing::debug!(id = %id, "Stale credentials removed"),
                Ok(false) => {}
                Err(e) => tracing::warn!(id = %id, "Failed to remove stale credentials: {}", e),
            }
        }

        tracing::debug!(id = %id, "Backend system written");
        Ok(system)
    }

    pub async fn delete(&self, key: &BackendSystemKey) -> StoreResult<bool> {
        self.access.delete(&BackendSystem::SCHEMA, &key.id()).await
    }

    /// Set the stored `hasSensitiveData` flag without rewriting credentials
    pub async fn update_metadata(&self, key: &BackendSystemKey, has_sensitive_data: bool) -> StoreResult<()> {
        migration::update_system_metadata(self.access.as_ref(), &key.id(), has_sensitive_data).await
    }

    /// List systems, migrating stale records first
    pub async fn get_all(&self, options: GetAllOptions) -> StoreResult<Vec<BackendSystem>> {
        let schema = BackendSystem::SCHEMA;
        let read_options = ReadOptions {
            include_sensitive_data: options.include_sensitive_data,
        };

        let records = match migration::migrate_backend_systems(self.access.as_ref(), &self.sentinel).await {
            MigrationOutcome::UpToDate(scan) if options.include_sensitive_data => scan,
            _ => self.access.read_all(&schema, read_options).await?,
        };

        let systems = records
            .into_iter()
            .map(|(id, record)| (id, without_stale_secrets(record)))
            .filter_map(|(id, record)| match BackendSystem::from_record(record) {
                Ok(system) => Some(system),
                Err(e) => {
                    tracing::warn!(id = %id, "Skipping unreadable backend system: {}", e);
                    None
                }
            })
            .filter(|system| match options.system_type {
                Some(wanted) => system.system_type == Some(wanted),
                None => true,
            })
            .collect();

        Ok(systems)
    }
}
