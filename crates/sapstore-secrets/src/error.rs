use thiserror::Error;

/// Errors raised by secret manager backends
#[derive(Debug, Error)]
pub enum SecretError {
    /// Service or account identifier rejected before reaching the backend
    #[error("Invalid secret address '{service}/{key}': {reason}")]
    InvalidAddress {
        service: String,
        key: String,
        reason: String,
    },

    /// Backend could not be loaded on this machine
    #[error("Secret backend '{backend}' not available: {reason}")]
    Unavailable { backend: String, reason: String },

    /// Backend feature not compiled in
    #[error("Secret backend '{backend}' not available (feature not enabled)")]
    BackendDisabled { backend: String },

    /// Backend runtime error
    #[error("{backend} error: {message}")]
    BackendError { backend: String, message: String },

    /// Permission/access denied
    #[error("Access denied to secret storage: {0}")]
    AccessDenied(String),

    /// Stored value is not valid JSON
    #[error("Malformed secret value: {0}")]
    Codec(#[from] serde_json::Error),
}

impl SecretError {
    /// Create an invalid address error
    pub fn invalid_address(
        service: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidAddress {
            service: service.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a backend error
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendError {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a backend unavailable error
    pub fn unavailable(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Create a backend disabled error
    pub fn disabled(backend: impl Into<String>) -> Self {
        Self::BackendDisabled {
            backend: backend.into(),
        }
    }
}
