//! Store configuration with environment variable priority
//!
//! Configuration is resolved in this order (first found wins):
//! 1. Environment variables (SAPSTORE_*)
//! 2. Config file (`<config dir>/sapstore/config.toml`)
//! 3. Default values

use std::env;
use std::path::{Path, PathBuf};

use sapstore_secrets::SecureStorageMode;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Environment variable prefix
const ENV_PREFIX: &str = "SAPSTORE";

/// Set by SAP Business Application Studio; no OS secret manager is reachable there
const MANAGED_HOST_ENV: &str = "H2O_URL";

const DEFAULT_DIR_NAME: &str = ".sapstore";
const DEFAULT_SERVICE_PREFIX: &str = "sapstore/v1";

/// Store configuration (parsed from TOML, can be overridden by env)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the plaintext entity files (`~` is expanded)
    pub base_dir: Option<String>,

    /// Prefix of the secret manager service names
    pub service_prefix: Option<String>,

    /// Never touch the OS secret manager
    pub disable_secure_store: Option<bool>,
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStoreConfig {
    pub base_dir: PathBuf,
    pub service_prefix: String,
    pub secure_storage: SecureStorageMode,
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl StoreConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sapstore")
            .join("config.toml")
    }

    /// Load configuration from a TOML file (optional)
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", path.display(), e);
                }
            }
        }
        Self::default()
    }

    /// Load configuration from the default location
    pub fn load_default() -> Self {
        Self::load(&Self::default_path())
    }

    /// Resolve configuration from the process environment first, then this config
    pub fn resolve(self) -> StoreResult<ResolvedStoreConfig> {
        self.resolve_with(|name| env::var(name).ok())
    }

    /// Resolve configuration with an explicit environment lookup
    pub fn resolve_with<F>(self, lookup: F) -> StoreResult<ResolvedStoreConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_env = |name: &str| lookup(&format!("{}_{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty());

        // Base directory: ENV > config > ~/.sapstore
        let base_dir = match get_env("HOME").or(self.base_dir) {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir.trim()).into_owned()),
            None => dirs::home_dir()
                .map(|home| home.join(DEFAULT_DIR_NAME))
                .ok_or_else(|| {
                    StoreError::Config(
                        "Cannot determine home directory. Set SAPSTORE_HOME or base_dir in config"
                            .to_string(),
                    )
                })?,
        };

        // Service prefix: ENV > config > default
        let service_prefix = get_env("SERVICE_PREFIX")
            .or(self.service_prefix)
            .map(|p| p.trim().trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVICE_PREFIX.to_string());

        // Secure storage: managed host > ENV > config > enabled
        let disabled = get_env("DISABLE_SECURE_STORE")
            .map(|v| parse_flag(&v))
            .or(self.disable_secure_store)
            .unwrap_or(false);
        let managed_host = lookup(MANAGED_HOST_ENV).is_some_and(|v| !v.trim().is_empty());

        let secure_storage = if managed_host {
            SecureStorageMode::ManagedHost
        } else if disabled {
            SecureStorageMode::Disabled
        } else {
            SecureStorageMode::Enabled
        };

        Ok(ResolvedStoreConfig {
            base_dir,
            service_prefix,
            secure_storage,
        })
    }
}
