//! Persistent store for SAP backend system connections
//!
//! Records are split by field classification:
//!
//! - **Plaintext** fields (URL, client, display names, ...) go to one JSON file
//!   per entity type under the base directory, e.g. `~/.sapstore/systems.json`
//! - **Sensitive** fields (passwords, tokens, service keys) go only to the OS
//!   secret manager, via [`sapstore_secrets`]
//!
//! Reads merge both halves. Listing backend systems also migrates records
//! written by older clients to the current key scheme.
//!
//! # Example
//!
//! ```rust,ignore
//! use sapstore::{BackendSystem, Store, StoreConfig, StoreContext, WriteOptions};
//!
//! let config = StoreConfig::load_default().resolve()?;
//! let store = Store::new(StoreContext::from_config(&config));
//!
//! let system = BackendSystem::new("Dev", "https://dev.example.com")
//!     .with_client("100")
//!     .with_credentials("DEVELOPER", "s3cret");
//! store.systems().write(&system, WriteOptions::default()).await?;
//!
//! let systems = store.systems().get_all(Default::default()).await?;
//! ```

pub mod access;
mod classify;
mod config;
mod context;
mod entities;
mod error;
pub mod migration;
mod provider;
mod service;

pub use classify::{Entity, EntitySchema};
pub use config::{ResolvedStoreConfig, StoreConfig};
pub use context::StoreContext;
pub use entities::{
    ApiHubSettings, AuthenticationType, BackendSystem, BackendSystemKey, ConnectionType, Singleton,
    SystemType, TelemetrySetting,
};
pub use error::{StoreError, StoreResult};
pub use provider::{GetAllOptions, SystemDataProvider};
pub use service::{
    ApiHubSettingsService, SettingsService, Store, SystemPatch, SystemService,
    TelemetrySettingService, WriteOptions,
};

// Re-export secure store types needed to build a context
pub use sapstore_secrets::{DummyStore, SecureStorageMode, SecureStore};
