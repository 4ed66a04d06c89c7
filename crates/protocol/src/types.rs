use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_HTTP_PORT, DEFAULT_MQTT_PORT, DEFAULT_WS_PORT};

/// HTTP-style method of a logical operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "get"),
            Method::Post => write!(f, "post"),
            Method::Put => write!(f, "put"),
            Method::Delete => write!(f, "delete"),
        }
    }
}

/// Protocol served by a hub endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Mqtt,
    Ws,
}

/// Per-hub security policy.
///
/// When `request_encrypted` is set, outgoing credentials and bodies are
/// wrapped in a signed+encrypted envelope before leaving the client.
/// When `response_encrypted` is set, local responses are expected to
/// carry an envelope that must verify before plaintext is returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityPolicy {
    pub request_encrypted: bool,
    pub response_encrypted: bool,
}

impl SecurityPolicy {
    /// Returns true if either direction requires envelope handling.
    pub fn requires_security(&self) -> bool {
        self.request_encrypted || self.response_encrypted
    }
}

/// Raw shared-secret key material for a hub.
///
/// Carried as a hex string in configuration and device records; the
/// session key is derived from it by the key manager.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    /// Parses hex-encoded key material.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self(hex::decode(s)?))
    }

    /// Raw secret bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyMaterial").field(&"[redacted]").finish()
    }
}

impl TryFrom<String> for KeyMaterial {
    type Error = hex::FromHexError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        KeyMaterial::from_hex(&s)
    }
}

impl From<KeyMaterial> for String {
    fn from(m: KeyMaterial) -> String {
        hex::encode(m.0)
    }
}

/// A local-network gateway device able to serve a subset of operations.
///
/// Supplied by discovery or explicit configuration; read-only to the
/// routing core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubTarget {
    pub id: String,
    pub address: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_mqtt_port")]
    pub mqtt_port: u16,
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
    #[serde(default)]
    pub security: SecurityPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_material: Option<KeyMaterial>,
}

fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}

fn default_mqtt_port() -> u16 {
    DEFAULT_MQTT_PORT
}

fn default_ws_port() -> u16 {
    DEFAULT_WS_PORT
}

impl HubTarget {
    /// Returns the hub's base URL for the given protocol.
    pub fn url(&self, protocol: Protocol) -> String {
        match protocol {
            Protocol::Http => format!("http://{}:{}", self.address, self.http_port),
            Protocol::Mqtt => format!("mqtt://{}:{}/mqtt", self.address, self.mqtt_port),
            Protocol::Ws => format!("ws://{}:{}/mqtt", self.address, self.ws_port),
        }
    }
}

/// One REST-style call as seen by the router.
///
/// `url` is the operation path (plus optional query string) relative to
/// the executor's configured API root. `api_url` overrides that root for
/// the local leg; the remote fallback re-sends the spec without it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    pub url: String,
    pub method: Method,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    pub authorization: String,
    /// Per-call remote override; beats the router's global default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl RequestSpec {
    /// Creates a spec with no body and no overrides.
    pub fn new(url: impl Into<String>, method: Method, authorization: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            body: None,
            authorization: authorization.into(),
            remote: None,
            api_url: None,
            timeout: None,
        }
    }

    /// Returns the path component of `url`, without any query string.
    pub fn path(&self) -> &str {
        match self.url.find('?') {
            Some(idx) => &self.url[..idx],
            None => &self.url,
        }
    }
}

/// Response from either target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl Response {
    pub fn new(status: u16, body: Option<serde_json::Value>) -> Self {
        Self { status, body }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
