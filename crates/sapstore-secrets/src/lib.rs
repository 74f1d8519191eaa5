//! Secure storage for sensitive entity fields
//!
//! This crate provides one narrow contract, [`SecureStore`], for keeping JSON
//! values in the platform secret manager, addressed by a service name and an
//! account key:
//!
//! - **OS keyring** (`keychain` feature): macOS Keychain, Windows Credential Manager,
//!   Linux Secret Service, through the native `keyring` bindings
//! - **OS command-line tools** (`cli` feature): `security` on macOS, `secret-tool` on Linux
//! - **Dummy**: a no-op store used when secure storage is disabled or unavailable
//!
//! # Example
//!
//! ```rust,ignore
//! use sapstore_secrets::{select_secure_store, SecureStorageMode};
//!
//! let store = select_secure_store(SecureStorageMode::Enabled);
//! store.save("sapstore/v1/systems", "https://host/100", &serde_json::json!({ "password": "s3cret" })).await;
//! let value = store.retrieve("sapstore/v1/systems", "https://host/100").await;
//! ```
//!
//! # Features
//!
//! - `keychain` (default): native OS keyring support via the `keyring` crate
//! - `cli` (default): shell out to the platform secret manager CLI when the native binding is unusable

mod backends;
mod codec;
mod error;
mod selection;
mod store;

pub use backends::dummy::DummyStore;
pub use backends::CredentialBackend;
pub use codec::{decode, encode};
pub use error::SecretError;
pub use selection::{select_from, select_secure_store, Loader, SecureStorageMode};
pub use store::{BackedStore, SecureStore};

#[cfg(feature = "keychain")]
pub use backends::keychain::KeyringBackend;

#[cfg(feature = "cli")]
pub use backends::cli::{CliBackend, CliTool, CommandSpec};
