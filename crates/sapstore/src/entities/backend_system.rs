//! SAP backend system connection records

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::{Entity, EntitySchema};

/// Kind of backend the system points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemType {
    OnPrem,
    AbapCloud,
    Generic,
}

impl std::str::FromStr for SystemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "onprem" | "on-prem" => Ok(Self::OnPrem),
            "abapcloud" | "abap-cloud" => Ok(Self::AbapCloud),
            "generic" => Ok(Self::Generic),
            _ => Err(format!(
                "Invalid system type: {}. Use 'OnPrem', 'AbapCloud' or 'Generic'",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthenticationType {
    Basic,
    ReentranceTicket,
    Oauth2,
    Oauth2ClientCredential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    AbapCatalog,
    OdataService,
    GenericHost,
}

/// One saved backend system
///
/// Connection details are stored in plaintext; credentials (`serviceKeys`,
/// `refreshToken`, `username`, `password`) only in the secret manager.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendSystem {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_type: Option<SystemType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_type: Option<AuthenticationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<ConnectionType>,
    /// Whether any credential was present at the last write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_sensitive_data: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_keys: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl BackendSystem {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_system_type(mut self, system_type: SystemType) -> Self {
        self.system_type = Some(system_type);
        self
    }

    pub fn key(&self) -> BackendSystemKey {
        BackendSystemKey::from_system(self)
    }

    /// Whether any credential field currently holds a value
    pub fn has_sensitive_content(&self) -> bool {
        let filled = |s: &Option<String>| s.as_deref().is_some_and(|s| !s.trim().is_empty());

        filled(&self.refresh_token)
            || filled(&self.username)
            || filled(&self.password)
            || self.service_keys.as_ref().is_some_and(|v| !v.is_null())
    }
}

impl fmt::Debug for BackendSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |present: bool| if present { Some("<redacted>") } else { None };

        f.debug_struct("BackendSystem")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("client", &self.client)
            .field("user_display_name", &self.user_display_name)
            .field("system_type", &self.system_type)
            .field("authentication_type", &self.authentication_type)
            .field("connection_type", &self.connection_type)
            .field("has_sensitive_data", &self.has_sensitive_data)
            .field("service_keys", &redacted(self.service_keys.is_some()))
            .field("refresh_token", &redacted(self.refresh_token.is_some()))
            .field("username", &self.username)
            .field("password", &redacted(self.password.is_some()))
            .finish()
    }
}

impl Entity for BackendSystem {
    const SCHEMA: EntitySchema = EntitySchema {
        name: "system",
        serializable: &[
            "name",
            "url",
            "client",
            "userDisplayName",
            "systemType",
            "authenticationType",
            "connectionType",
            "hasSensitiveData",
        ],
        sensitive: &["serviceKeys", "refreshToken", "username", "password"],
    };
}

/// Identity of a backend system: its URL and optional client
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendSystemKey {
    url: String,
    client: Option<String>,
}

impl BackendSystemKey {
    pub fn new(url: impl Into<String>, client: Option<String>) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn from_system(system: &BackendSystem) -> Self {
        Self::new(system.url.clone(), system.client.clone())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn client(&self) -> Option<&str> {
        self.client.as_deref()
    }

    /// Store id: trimmed URL without its trailing slash, then `/<client>`
    /// when a client is set
    pub fn id(&self) -> String {
        let url = self.url.trim();
        let url = url.strip_suffix('/').unwrap_or(url);

        match self.client.as_deref().map(str::trim) {
            Some(client) if !client.is_empty() => format!("{}/{}", url, client),
            _ => url.to_string(),
        }
    }
}

impl fmt::Display for BackendSystemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_normalization() {
        let a = BackendSystemKey::new("http://x/", Some("100".into()));
        let b = BackendSystemKey::new("  http://x  ", Some(" 100 ".into()));
        assert_eq!(a.id(), b.id());
        assert_eq!(a.id(), "http://x/100");
    }

    #[test]
    fn test_key_without_client() {
        assert_eq!(BackendSystemKey::new("http://x/", None).id(), "http://x");
        assert_eq!(
            BackendSystemKey::new("http://x", Some("  ".into())).id(),
            "http://x"
        );
    }

    #[test]
    fn test_serializes_camel_case_and_skips_empty() {
        let system = BackendSystem::new("sys1", "http://a")
            .with_client("100")
            .with_system_type(SystemType::OnPrem);
        let value = serde_json::to_value(&system).unwrap();
        assert_eq!(
            value,
            json!({ "name": "sys1", "url": "http://a", "client": "100", "systemType": "OnPrem" })
        );
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_value(AuthenticationType::Oauth2ClientCredential).unwrap(),
            json!("oauth2ClientCredential")
        );
        assert_eq!(
            serde_json::to_value(ConnectionType::OdataService).unwrap(),
            json!("odata_service")
        );
    }

    #[test]
    fn test_has_sensitive_content() {
        let bare = BackendSystem::new("sys1", "http://a");
        assert!(!bare.has_sensitive_content());

        let blank = BackendSystem {
            password: Some("  ".into()),
            ..bare.clone()
        };
        assert!(!blank.has_sensitive_content());

        assert!(bare.clone().with_credentials("u", "p").has_sensitive_content());
        assert!(BackendSystem {
            service_keys: Some(json!({ "uaa": {} })),
            ..bare
        }
        .has_sensitive_content());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let system = BackendSystem::new("sys1", "http://a").with_credentials("u", "p1");
        let debug = format!("{:?}", system);
        assert!(!debug.contains("p1"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_system_type_from_str() {
        assert_eq!("onprem".parse::<SystemType>(), Ok(SystemType::OnPrem));
        assert_eq!("AbapCloud".parse::<SystemType>(), Ok(SystemType::AbapCloud));
        assert!("cloud".parse::<SystemType>().is_err());
    }
}
