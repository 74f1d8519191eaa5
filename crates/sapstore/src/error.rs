use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the entity store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure other than a missing file
    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Existing store file that does not parse
    #[error("Malformed data in '{path}': {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// Secure store refused a value
    #[error("Secure storage rejected {service}/{key}")]
    SecretRejected { service: String, key: String },

    /// One or both halves of a hybrid write failed
    ///
    /// A half that was saved (or had nothing to save) stays written.
    #[error("Failed to persist {entity}/{id}: {reason}")]
    PartialWrite {
        entity: String,
        id: String,
        reason: String,
        plaintext_saved: bool,
        secret_saved: bool,
    },

    #[error("System already exists: {0}")]
    AlreadyExists(String),

    #[error("System not found: {0}")]
    NotFound(String),

    /// Entity that cannot be stored or decoded
    #[error("Invalid entity: {0}")]
    Invalid(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(reason.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
