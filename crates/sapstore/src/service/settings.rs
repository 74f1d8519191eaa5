//! Services for single-record settings entities

use std::marker::PhantomData;
use std::sync::Arc;

use crate::access::{DataAccess, ReadOptions};
use crate::entities::{ApiHubSettings, Singleton, TelemetrySetting};
use crate::error::StoreResult;

pub type TelemetrySettingService = SettingsService<TelemetrySetting>;
pub type ApiHubSettingsService = SettingsService<ApiHubSettings>;

/// Read/write/delete of the one record of a settings entity
pub struct SettingsService<E> {
    access: Arc<dyn DataAccess>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for SettingsService<E> {
    fn clone(&self) -> Self {
        Self {
            access: self.access.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Singleton> SettingsService<E> {
    pub fn new(access: Arc<dyn DataAccess>) -> Self {
        Self {
            access,
            _entity: PhantomData,
        }
    }

    pub async fn read(&self) -> StoreResult<Option<E>> {
        self.access
            .read(&E::SCHEMA, E::ID, ReadOptions::full())
            .await?
            .map(E::from_record)
            .transpose()
    }

    pub async fn write(&self, entity: &E) -> StoreResult<()> {
        self.access.write(&E::SCHEMA, E::ID, &entity.to_record()?).await?;
        tracing::debug!(entity = E::SCHEMA.name, "Settings written");
        Ok(())
    }

    pub async fn delete(&self) -> StoreResult<bool> {
        self.access.delete(&E::SCHEMA, E::ID).await
    }
}
