//! Router configuration.
//!
//! An explicit settings object injected into each router instance; no
//! global mutable state. A non-object configuration argument is a
//! contract violation.

use std::time::Duration;

use tracing::warn;

use hubroute_protocol::constants::{
    DEFAULT_HTTP_API_URL, DEFAULT_LOCAL_TIMEOUT, DEFAULT_MQTT_API_URL, DEFAULT_WS_API_URL,
};
use hubroute_protocol::{HubTarget, Protocol};

use crate::error::RouterError;

/// Settings shared by the transport and pub/sub routers.
#[derive(Debug, Clone)]
pub struct HubSettings {
    /// Local hub HTTP API URL, used when no target hub is configured.
    pub http_api_url: String,
    /// Local hub MQTT API URL, used when no target hub is configured.
    pub mqtt_api_url: String,
    /// Local hub WebSocket API URL, used when no target hub is configured.
    pub ws_api_url: String,
    /// Total budget for a local attempt before falling back to remote.
    pub timeout: Duration,
    /// Global default: skip local attempts entirely. A per-call
    /// `remote` override beats this.
    pub remote: bool,
    /// Target hub supplying address, ports, security policy and key
    /// material. Read-only input to the routing core.
    pub hub: Option<HubTarget>,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            http_api_url: DEFAULT_HTTP_API_URL.into(),
            mqtt_api_url: DEFAULT_MQTT_API_URL.into(),
            ws_api_url: DEFAULT_WS_API_URL.into(),
            timeout: DEFAULT_LOCAL_TIMEOUT,
            remote: false,
            hub: None,
        }
    }
}

impl HubSettings {
    /// Merges a JSON configuration object over the defaults.
    ///
    /// A non-object argument is a contract violation and fails with a
    /// configuration error. Unknown keys are ignored.
    pub fn from_value(value: serde_json::Value) -> Result<Self, RouterError> {
        let Some(obj) = value.as_object() else {
            return Err(RouterError::Configuration(
                "setup requires an options object".into(),
            ));
        };

        let mut settings = Self::default();
        for (key, val) in obj {
            match key.as_str() {
                "httpApiUrl" => settings.http_api_url = expect_string(key, val)?,
                "mqttApiUrl" => settings.mqtt_api_url = expect_string(key, val)?,
                "wsApiUrl" => settings.ws_api_url = expect_string(key, val)?,
                "apiUrl" => {
                    // Deprecated alias kept for older configurations.
                    warn!("apiUrl option is deprecated, use httpApiUrl instead");
                    settings.http_api_url = expect_string(key, val)?;
                }
                "timeout" => {
                    let ms = val.as_u64().ok_or_else(|| {
                        RouterError::Configuration("timeout must be milliseconds".into())
                    })?;
                    settings.timeout = Duration::from_millis(ms);
                }
                "remote" => {
                    settings.remote = val.as_bool().ok_or_else(|| {
                        RouterError::Configuration("remote must be a boolean".into())
                    })?;
                }
                "hub" => {
                    let hub: HubTarget = serde_json::from_value(val.clone()).map_err(|e| {
                        RouterError::Configuration(format!("invalid hub target: {e}"))
                    })?;
                    settings.hub = Some(hub);
                }
                _ => {}
            }
        }
        Ok(settings)
    }

    /// Validates the settings for use by a router.
    pub fn validate(&self) -> Result<(), RouterError> {
        if let Some(hub) = &self.hub {
            if hub.security.requires_security() && hub.key_material.is_none() {
                return Err(RouterError::Configuration(format!(
                    "hub '{}' requires security but has no key material",
                    hub.id
                )));
            }
        }
        Ok(())
    }

    /// Returns the configured target hub, or a configuration error.
    pub fn hub(&self) -> Result<&HubTarget, RouterError> {
        self.hub
            .as_ref()
            .ok_or_else(|| RouterError::Configuration("no target hub configured".into()))
    }

    /// Returns the local base URL for the given protocol, preferring
    /// the target hub's address when one is configured.
    pub fn local_url(&self, protocol: Protocol) -> String {
        match &self.hub {
            Some(hub) => hub.url(protocol),
            None => match protocol {
                Protocol::Http => self.http_api_url.clone(),
                Protocol::Mqtt => self.mqtt_api_url.clone(),
                Protocol::Ws => self.ws_api_url.clone(),
            },
        }
    }

    /// Returns true when the target hub's policy requires envelope
    /// handling in either direction.
    pub fn security_enabled(&self) -> bool {
        self.hub
            .as_ref()
            .is_some_and(|hub| hub.security.requires_security())
    }
}

fn expect_string(key: &str, val: &serde_json::Value) -> Result<String, RouterError> {
    val.as_str()
        .map(str::to_owned)
        .ok_or_else(|| RouterError::Configuration(format!("{key} must be a string")))
}
