//! Process-wide store state, built once and handed to every service

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sapstore_secrets::{select_secure_store, SecureStore};

use crate::access::{FilesystemStore, HybridStore, SecureAccess};
use crate::config::ResolvedStoreConfig;
use crate::migration::MigrationSentinel;

#[derive(Clone)]
pub struct StoreContext {
    base_dir: PathBuf,
    service_prefix: String,
    secure_store: Arc<dyn SecureStore>,
}

impl std::fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreContext")
            .field("base_dir", &self.base_dir)
            .field("service_prefix", &self.service_prefix)
            .field("secure_store", &self.secure_store.backend_name())
            .finish()
    }
}

impl StoreContext {
    /// Build the context, selecting the secure store backend for this process
    pub fn from_config(config: &ResolvedStoreConfig) -> Self {
        let secure_store = select_secure_store(config.secure_storage);
        tracing::debug!(
            base_dir = %config.base_dir.display(),
            backend = secure_store.backend_name(),
            "Store context ready"
        );
        Self::with_secure_store(config.base_dir.clone(), config.service_prefix.clone(), secure_store)
    }

    /// Build the context around an already chosen secure store
    pub fn with_secure_store(
        base_dir: impl Into<PathBuf>,
        service_prefix: impl Into<String>,
        secure_store: Arc<dyn SecureStore>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            service_prefix: service_prefix.into(),
            secure_store,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn service_prefix(&self) -> &str {
        &self.service_prefix
    }

    pub fn secure_store(&self) -> &Arc<dyn SecureStore> {
        &self.secure_store
    }

    pub fn filesystem(&self) -> FilesystemStore {
        FilesystemStore::new(&self.base_dir)
    }

    pub fn hybrid(&self) -> HybridStore {
        HybridStore::new(
            self.filesystem(),
            SecureAccess::new(self.secure_store.clone(), self.service_prefix.clone()),
        )
    }

    pub fn sentinel(&self) -> MigrationSentinel {
        MigrationSentinel::new(&self.base_dir)
    }
}
