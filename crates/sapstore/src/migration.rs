//! Self-healing migration of stored backend systems
//!
//! Older clients stored systems under keys that were not normalized and
//! without the `hasSensitiveData` flag. The first full listing rewrites such
//! records in place; a sentinel file then lets later listings skip the scan.
//!
//! Passes are serialized by a lock file next to the sentinel, so a process
//! that waited for another one's pass finds the sentinel and skips its own.
//! An old key is deleted only after the write under the new key returned
//! successfully.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::access::{acquire_lock, replace_file, sibling, DataAccess, ReadOptions, Record};
use crate::classify::Entity;
use crate::entities::BackendSystem;
use crate::error::{StoreError, StoreResult};

/// Sentinel entry written once backend systems are fully migrated
pub const BACKEND_SYSTEM_MIGRATION_V1: &str = "backendSystemMigrationV1";

const SENTINEL_FILE: &str = "migrations.json";
const HAS_SENSITIVE_DATA: &str = "hasSensitiveData";

/// Record of completed migrations: `{ "<name>": "<RFC 3339 timestamp>" }`
///
/// Only used to skip repeat scans; never trusted for a record's correctness.
#[derive(Debug, Clone)]
pub struct MigrationSentinel {
    path: PathBuf,
}

impl MigrationSentinel {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            path: base_dir.join(SENTINEL_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `name` has been recorded. Unreadable sentinels count as not done.
    pub async fn is_done(&self, name: &str) -> bool {
        match self.load().await {
            Ok(entries) => entries.contains_key(name),
            Err(e) => {
                tracing::warn!("Ignoring migration sentinel: {}", e);
                false
            }
        }
    }

    /// Completion time of `name`, if recorded
    pub async fn completed_at(&self, name: &str) -> Option<String> {
        self.load().await.ok()?.remove(name)
    }

    /// Record `name` as completed now
    pub async fn record(&self, name: &str) -> StoreResult<()> {
        // A broken sentinel is replaced rather than blocking the write
        let mut entries = self.load().await.unwrap_or_default();
        entries.insert(name.to_string(), chrono::Utc::now().to_rfc3339());

        let content = serde_json::to_string_pretty(&entries).map_err(|e| StoreError::invalid(e.to_string()))?;
        match replace_file(&self.path, &content).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if let Some(parent) = self.path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| StoreError::io(parent, e))?;
                }
                replace_file(&self.path, &content)
                    .await
                    .map_err(|e| StoreError::io(&self.path, e))
            }
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    /// Wait for the lock that serializes migration passes
    pub(crate) async fn lock(&self) -> StoreResult<File> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        acquire_lock(dir, sibling(&self.path, "lock"))
            .await
            .map_err(|e| StoreError::io(&self.path, e))
    }

    async fn load(&self) -> StoreResult<BTreeMap<String, String>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| StoreError::malformed(&self.path, e.to_string()))
    }
}

/// Result of one migration pass
#[derive(Debug)]
pub enum MigrationOutcome {
    /// The sentinel says the store is migrated; nothing was scanned
    AlreadyDone,
    /// Every record was current; carries the full scan
    UpToDate(BTreeMap<String, Record>),
    /// At least one record was stale
    Migrated { migrated: usize, failed: usize },
    /// The scan itself failed; nothing was changed
    ScanFailed,
}

/// Bring every stored backend system to the current key scheme and metadata
///
/// Never fails: problems are logged and the affected record is left for the
/// next pass.
pub async fn migrate_backend_systems(access: &dyn DataAccess, sentinel: &MigrationSentinel) -> MigrationOutcome {
    if sentinel.is_done(BACKEND_SYSTEM_MIGRATION_V1).await {
        return MigrationOutcome::AlreadyDone;
    }

    let _lock = match sentinel.lock().await {
        Ok(lock) => Some(lock),
        Err(e) => {
            tracing::warn!("Running backend system migration without lock: {}", e);
            None
        }
    };
    // Another pass may have finished while this one waited
    if sentinel.is_done(BACKEND_SYSTEM_MIGRATION_V1).await {
        return MigrationOutcome::AlreadyDone;
    }

    let schema = BackendSystem::SCHEMA;
    let scan = match access.read_all(&schema, ReadOptions::full()).await {
        Ok(scan) => scan,
        Err(e) => {
            tracing::warn!("Backend system migration scan failed: {}", e);
            return MigrationOutcome::ScanFailed;
        }
    };

    let mut migrated = 0;
    let mut failed = 0;

    for (stored_id, record) in &scan {
        let system = match BackendSystem::from_record(record.clone()) {
            Ok(system) => system,
            Err(e) => {
                tracing::warn!(id = %stored_id, "Skipping unreadable backend system: {}", e);
                continue;
            }
        };

        let current_id = system.key().id();
        if current_id.is_empty() {
            tracing::warn!(id = %stored_id, "Backend system has no URL, cannot derive its key");
            continue;
        }

        if &current_id != stored_id {
            match rekey(access, stored_id, &current_id, record).await {
                Ok(()) => {
                    tracing::info!(from = %stored_id, to = %current_id, "Backend system moved to normalized key");
                    migrated += 1;
                }
                Err(e) => {
                    tracing::warn!(id = %stored_id, "Backend system re-key failed, keeping old entry: {}", e);
                    failed += 1;
                }
            }
        } else if system.has_sensitive_data.is_none() {
            match update_system_metadata(access, stored_id, system.has_sensitive_content()).await {
                Ok(()) => migrated += 1,
                Err(e) => {
                    tracing::warn!(id = %stored_id, "Backend system metadata update failed: {}", e);
                    failed += 1;
                }
            }
        }
    }

    if migrated == 0 && failed == 0 {
        return MigrationOutcome::UpToDate(scan);
    }

    if failed == 0 {
        match sentinel.record(BACKEND_SYSTEM_MIGRATION_V1).await {
            Ok(()) => tracing::info!(migrated, "Backend system migration complete"),
            Err(e) => tracing::warn!("Failed to record backend system migration: {}", e),
        }
    } else {
        tracing::warn!(migrated, failed, "Backend system migration incomplete, will retry");
    }

    MigrationOutcome::Migrated { migrated, failed }
}

/// Move a record to `new_id`; the old entry is removed only after the new
/// one is written
async fn rekey(access: &dyn DataAccess, old_id: &str, new_id: &str, record: &Record) -> StoreResult<()> {
    let schema = BackendSystem::SCHEMA;

    let mut record = record.clone();
    if !record.contains_key(HAS_SENSITIVE_DATA) {
        let system = BackendSystem::from_record(record.clone())?;
        record.insert(
            HAS_SENSITIVE_DATA.to_string(),
            Value::Bool(system.has_sensitive_content()),
        );
    }

    access.write(&schema, new_id, &record).await?;
    access.delete(&schema, old_id).await?;
    Ok(())
}

/// Set `hasSensitiveData` on the plaintext half of a stored system
///
/// Only plaintext fields are read and written back, so the secret manager is
/// not touched.
pub(crate) async fn update_system_metadata(
    access: &dyn DataAccess,
    id: &str,
    has_sensitive_data: bool,
) -> StoreResult<()> {
    let schema = BackendSystem::SCHEMA;

    let mut record = access
        .read(&schema, id, ReadOptions::plaintext())
        .await?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
    record.insert(HAS_SENSITIVE_DATA.to_string(), Value::Bool(has_sensitive_data));

    access.write(&schema, id, &record).await?;
    Ok(())
}
