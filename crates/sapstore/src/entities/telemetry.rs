use serde::{Deserialize, Serialize};

use super::Singleton;
use crate::classify::{Entity, EntitySchema};

/// Whether the user agreed to usage telemetry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySetting {
    pub enable_telemetry: bool,
}

impl TelemetrySetting {
    pub fn new(enable_telemetry: bool) -> Self {
        Self { enable_telemetry }
    }
}

impl Entity for TelemetrySetting {
    const SCHEMA: EntitySchema = EntitySchema {
        name: "telemetrySetting",
        serializable: &["enableTelemetry"],
        sensitive: &[],
    };
}

impl Singleton for TelemetrySetting {
    const ID: &'static str = "telemetrysetting";
}
