//! OS Keychain backend
//!
//! Supports:
//! - macOS Keychain
//! - Windows Credential Manager
//! - Linux Secret Service (via libsecret)
//!
//! The keyring API is synchronous, so every call runs on the blocking pool.

use async_trait::async_trait;

use super::{check_address, CredentialBackend};
use crate::error::SecretError;

const CHECK_SERVICE: &str = "sapstore/availability";
const CHECK_ACCOUNT: &str = "check";

/// Native keyring binding
#[derive(Debug)]
pub struct KeyringBackend {
    _private: (),
}

impl KeyringBackend {
    /// Load the binding, failing if the platform store cannot be reached
    ///
    /// A lookup of an account that was never written must come back with
    /// either a value or `NoEntry`; anything else means the store is unusable.
    pub fn connect() -> Result<Self, SecretError> {
        let entry = entry(CHECK_SERVICE, CHECK_ACCOUNT)?;
        match entry.get_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(Self { _private: () }),
            Err(e) => Err(SecretError::unavailable("keychain", map_error(e).to_string())),
        }
    }
}

fn entry(service: &str, account: &str) -> Result<keyring::Entry, SecretError> {
    keyring::Entry::new(service, account).map_err(map_error)
}

fn map_error(e: keyring::Error) -> SecretError {
    match e {
        keyring::Error::Ambiguous(creds) => SecretError::backend(
            "keychain",
            format!("Ambiguous entry: {} credentials found", creds.len()),
        ),
        keyring::Error::NoStorageAccess(inner) => {
            SecretError::AccessDenied(format!("Cannot access keychain storage: {}", inner))
        }
        _ => SecretError::backend("keychain", e.to_string()),
    }
}

async fn blocking<T, F>(f: F) -> Result<T, SecretError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SecretError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SecretError::backend("keychain", format!("Keychain task failed: {}", e)))?
}

#[async_trait]
impl CredentialBackend for KeyringBackend {
    fn name(&self) -> &'static str {
        "keychain"
    }

    async fn set(&self, service: &str, account: &str, secret: &str) -> Result<(), SecretError> {
        check_address(service, account)?;
        let (service, account, secret) = (service.to_owned(), account.to_owned(), secret.to_owned());
        blocking(move || entry(&service, &account)?.set_password(&secret).map_err(map_error)).await
    }

    async fn get(&self, service: &str, account: &str) -> Result<Option<String>, SecretError> {
        check_address(service, account)?;
        let (service, account) = (service.to_owned(), account.to_owned());
        blocking(move || match entry(&service, &account)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(map_error(e)),
        })
        .await
    }

    async fn remove(&self, service: &str, account: &str) -> Result<bool, SecretError> {
        check_address(service, account)?;
        let (service, account) = (service.to_owned(), account.to_owned());
        blocking(move || match entry(&service, &account)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(map_error(e)),
        })
        .await
    }
}
