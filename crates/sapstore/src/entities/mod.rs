//! Stored entity types

mod api_hub;
mod backend_system;
mod telemetry;

pub use api_hub::ApiHubSettings;
pub use backend_system::{
    AuthenticationType, BackendSystem, BackendSystemKey, ConnectionType, SystemType,
};
pub use telemetry::TelemetrySetting;

use crate::classify::Entity;

/// An entity type with exactly one record, stored under a fixed id
pub trait Singleton: Entity {
    const ID: &'static str;
}
