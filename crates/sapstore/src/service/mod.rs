//! Services: the entry points callers use

mod settings;
mod system;

pub use settings::{ApiHubSettingsService, SettingsService, TelemetrySettingService};
pub use system::{SystemPatch, SystemService, WriteOptions};

use std::sync::Arc;

use crate::access::DataAccess;
use crate::context::StoreContext;

/// All services over one store context
#[derive(Debug, Clone)]
pub struct Store {
    context: StoreContext,
}

impl Store {
    pub fn new(context: StoreContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &StoreContext {
        &self.context
    }

    pub fn systems(&self) -> SystemService {
        SystemService::new(&self.context)
    }

    pub fn telemetry(&self) -> TelemetrySettingService {
        SettingsService::new(self.access())
    }

    pub fn api_hub(&self) -> ApiHubSettingsService {
        SettingsService::new(self.access())
    }

    fn access(&self) -> Arc<dyn DataAccess> {
        Arc::new(self.context.hybrid())
    }
}
