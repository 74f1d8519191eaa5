use serde::{Deserialize, Serialize};

use super::Singleton;
use crate::classify::{Entity, EntitySchema};

/// SAP API Business Hub credentials, kept entirely in the secret manager
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHubSettings {
    pub api_key: String,
}

impl ApiHubSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl std::fmt::Debug for ApiHubSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiHubSettings")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Entity for ApiHubSettings {
    const SCHEMA: EntitySchema = EntitySchema {
        name: "apiHub",
        serializable: &[],
        sensitive: &["apiKey"],
    };
}

impl Singleton for ApiHubSettings {
    const ID: &'static str = "apiHub";
}
