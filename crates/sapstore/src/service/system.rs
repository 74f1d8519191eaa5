use std::sync::Arc;

use notify::RecommendedWatcher;
use serde_json::Value;

use crate::access::{DataAccess, FilesystemStore};
use crate::classify::Entity;
use crate::context::StoreContext;
use crate::entities::{AuthenticationType, BackendSystem, BackendSystemKey, ConnectionType, SystemType};
use crate::error::{StoreError, StoreResult};
use crate::migration::MigrationSentinel;
use crate::provider::{GetAllOptions, SystemDataProvider};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Overwrite a system already stored under the same key
    pub force: bool,
}

/// Fields to change on a stored system; `None` keeps the stored value
///
/// URL and client cannot be patched since they make up the key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemPatch {
    pub name: Option<String>,
    pub user_display_name: Option<String>,
    pub system_type: Option<SystemType>,
    pub authentication_type: Option<AuthenticationType>,
    pub connection_type: Option<ConnectionType>,
    pub service_keys: Option<Value>,
    pub refresh_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SystemPatch {
    fn apply(self, system: &mut BackendSystem) {
        fn set<T>(target: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *target = value;
            }
        }

        if let Some(name) = self.name {
            system.name = name;
        }
        set(&mut system.user_display_name, self.user_display_name);
        set(&mut system.system_type, self.system_type);
        set(&mut system.authentication_type, self.authentication_type);
        set(&mut system.connection_type, self.connection_type);
        set(&mut system.service_keys, self.service_keys);
        set(&mut system.refresh_token, self.refresh_token);
        set(&mut system.username, self.username);
        set(&mut system.password, self.password);
    }
}

/// Saved backend systems
#[derive(Clone)]
pub struct SystemService {
    provider: SystemDataProvider,
    filesystem: FilesystemStore,
}

impl SystemService {
    pub fn new(context: &StoreContext) -> Self {
        Self::with_access(Arc::new(context.hybrid()), context.sentinel(), context.filesystem())
    }

    /// Build the service over a custom accessor
    pub fn with_access(access: Arc<dyn DataAccess>, sentinel: MigrationSentinel, filesystem: FilesystemStore) -> Self {
        Self {
            provider: SystemDataProvider::new(access, sentinel),
            filesystem,
        }
    }

    pub fn provider(&self) -> &SystemDataProvider {
        &self.provider
    }

    /// Read a system including its credentials
    pub async fn read(&self, key: &BackendSystemKey) -> StoreResult<Option<BackendSystem>> {
        self.provider.read(key, true).await
    }

    /// Save a system under its derived key
    ///
    /// Fails with [`StoreError::AlreadyExists`] if the key is taken and
    /// `options.force` is not set.
    pub async fn write(&self, system: &BackendSystem, options: WriteOptions) -> StoreResult<BackendSystem> {
        if system.url.trim().is_empty() {
            return Err(StoreError::invalid("backend system URL must not be empty"));
        }

        let key = system.key();
        if !options.force && self.provider.read(&key, false).await?.is_some() {
            return Err(StoreError::AlreadyExists(key.id()));
        }

        self.provider.write(system).await
    }

    /// Change some fields of a stored system, keeping its key
    pub async fn partial_update(&self, key: &BackendSystemKey, patch: SystemPatch) -> StoreResult<BackendSystem> {
        let mut system = self
            .read(key)
            .await?
            .ok_or_else(|| StoreError::NotFound(key.id()))?;

        patch.apply(&mut system);
        self.provider.write(&system).await
    }

    pub async fn delete(&self, system: &BackendSystem) -> StoreResult<bool> {
        self.delete_by_key(&system.key()).await
    }

    pub async fn delete_by_key(&self, key: &BackendSystemKey) -> StoreResult<bool> {
        let deleted = self.provider.delete(key).await?;
        if deleted {
            tracing::info!(id = %key, "Backend system deleted");
        }
        Ok(deleted)
    }

    /// List saved systems, migrating stale records on the way
    pub async fn get_all(&self, options: GetAllOptions) -> StoreResult<Vec<BackendSystem>> {
        self.provider.get_all(options).await
    }

    /// Watch the systems file for changes made by other processes
    ///
    /// `None` until the first system has been saved.
    pub fn watch<F>(&self, on_change: F) -> StoreResult<Option<RecommendedWatcher>>
    where
        F: FnMut(notify::Event) + Send + 'static,
    {
        self.filesystem.watch(BackendSystem::SCHEMA.name, on_change)
    }
}
