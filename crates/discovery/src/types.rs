//! Cloud record shapes consumed by discovery.

use serde::Deserialize;

use hubroute_protocol::constants::{DEFAULT_HTTP_PORT, DEFAULT_MQTT_PORT, DEFAULT_WS_PORT};
use hubroute_protocol::{HubTarget, KeyMaterial, SecurityPolicy};

use crate::DiscoveryError;

/// Tag marking a project's hub distribution collection.
pub const HUB_COLLECTION_TAG: &str = "thng-hub";

/// A collection record, reduced to what discovery needs.
#[derive(Debug, Deserialize)]
pub(crate) struct Collection {
    pub id: String,
}

/// A device record inside the distribution collection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HubDevice {
    pub id: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub custom_fields: serde_json::Value,
}

/// Hub connection details carried in a device's custom fields.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct HubFields {
    address: Option<String>,
    http_port: Option<u16>,
    mqtt_port: Option<u16>,
    ws_port: Option<u16>,
    security: Option<SecurityPolicy>,
    key: Option<String>,
}

impl HubDevice {
    /// True when the hub agent last reported itself reachable.
    pub fn is_connected(&self) -> bool {
        self.properties
            .get("connected")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Maps the device record to a routable hub target.
    pub fn into_target(self) -> Result<HubTarget, DiscoveryError> {
        let fields: HubFields = serde_json::from_value(self.custom_fields)
            .map_err(|e| DiscoveryError::Malformed(format!("device '{}': {e}", self.id)))?;
        let address = fields.address.ok_or_else(|| {
            DiscoveryError::Malformed(format!("device '{}' has no address", self.id))
        })?;
        let key_material = match fields.key {
            Some(hex) => Some(KeyMaterial::from_hex(&hex).map_err(|e| {
                DiscoveryError::Malformed(format!("device '{}' key material: {e}", self.id))
            })?),
            None => None,
        };
        Ok(HubTarget {
            id: self.id,
            address,
            http_port: fields.http_port.unwrap_or(DEFAULT_HTTP_PORT),
            mqtt_port: fields.mqtt_port.unwrap_or(DEFAULT_MQTT_PORT),
            ws_port: fields.ws_port.unwrap_or(DEFAULT_WS_PORT),
            security: fields.security.unwrap_or_default(),
            key_material,
        })
    }
}
