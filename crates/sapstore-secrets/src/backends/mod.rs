//! Secret backend implementations

use async_trait::async_trait;

use crate::error::SecretError;

#[cfg(feature = "cli")]
pub mod cli;

pub mod dummy;

#[cfg(feature = "keychain")]
pub mod keychain;

/// Raw string access to one platform secret manager
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    /// Backend name for logging/errors
    fn name(&self) -> &'static str;

    /// Store `secret` for `service`/`account`, replacing any previous value
    async fn set(&self, service: &str, account: &str, secret: &str) -> Result<(), SecretError>;

    /// Read the secret for `service`/`account`, `None` if there is none
    async fn get(&self, service: &str, account: &str) -> Result<Option<String>, SecretError>;

    /// Remove the secret for `service`/`account`, `false` if there was none
    async fn remove(&self, service: &str, account: &str) -> Result<bool, SecretError>;

    /// List the accounts stored for `service`
    ///
    /// `None` means the backend cannot enumerate entries.
    async fn accounts(&self, _service: &str) -> Result<Option<Vec<String>>, SecretError> {
        Ok(None)
    }
}

/// Reject addresses no backend can store
pub(crate) fn check_address(service: &str, account: &str) -> Result<(), SecretError> {
    if service.trim().is_empty() {
        return Err(SecretError::invalid_address(service, account, "empty service"));
    }
    if account.trim().is_empty() {
        return Err(SecretError::invalid_address(service, account, "empty account"));
    }
    Ok(())
}
