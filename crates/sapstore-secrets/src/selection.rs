//! Secure store selection
//!
//! Selection runs once at startup; the chosen store is then shared through
//! the caller's context.

use std::sync::Arc;

use crate::backends::dummy::DummyStore;
use crate::error::SecretError;
use crate::store::SecureStore;

/// Whether secure storage may be used on this host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureStorageMode {
    /// Use the platform secret manager if one can be loaded
    Enabled,
    /// Explicitly turned off by configuration
    Disabled,
    /// Running inside a managed host without a usable secret manager
    ManagedHost,
}

/// Attempt to load one backend
pub type Loader = fn() -> Result<Arc<dyn SecureStore>, SecretError>;

/// Pick the secure store for this process
///
/// Tries the native keyring binding first, then the platform CLI tool, and
/// falls back to [`DummyStore`] when neither can be loaded.
pub fn select_secure_store(mode: SecureStorageMode) -> Arc<dyn SecureStore> {
    select_from(mode, &default_loaders())
}

/// Pick the first loader that succeeds, or the dummy store
pub fn select_from(mode: SecureStorageMode, loaders: &[Loader]) -> Arc<dyn SecureStore> {
    match mode {
        SecureStorageMode::Disabled => {
            tracing::info!("Secure storage disabled by configuration, secrets will not be persisted");
            return Arc::new(DummyStore::new());
        }
        SecureStorageMode::ManagedHost => {
            tracing::info!("Managed host detected, secrets will not be persisted");
            return Arc::new(DummyStore::new());
        }
        SecureStorageMode::Enabled => {}
    }

    for load in loaders {
        match load() {
            Ok(store) => {
                tracing::debug!(backend = store.backend_name(), "Secure store selected");
                return store;
            }
            Err(e) => {
                tracing::debug!("Secure store backend skipped: {}", e);
            }
        }
    }

    tracing::warn!("No secure storage backend available, secrets will not be persisted");
    Arc::new(DummyStore::new())
}

fn default_loaders() -> Vec<Loader> {
    let mut loaders: Vec<Loader> = Vec::new();

    #[cfg(feature = "keychain")]
    loaders.push(load_keychain);

    #[cfg(feature = "cli")]
    loaders.push(load_cli);

    loaders
}

#[cfg(feature = "keychain")]
fn load_keychain() -> Result<Arc<dyn SecureStore>, SecretError> {
    let backend = crate::backends::keychain::KeyringBackend::connect()?;
    Ok(Arc::new(crate::store::BackedStore::new(backend)))
}

#[cfg(feature = "cli")]
fn load_cli() -> Result<Arc<dyn SecureStore>, SecretError> {
    let backend = crate::backends::cli::CliBackend::detect()?;
    Ok(Arc::new(crate::store::BackedStore::new(backend)))
}
