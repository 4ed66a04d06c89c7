use std::time::Duration;

/// Default local hub HTTP API URL.
pub const DEFAULT_HTTP_API_URL: &str = "http://localhost:8787";

/// Default local hub MQTT API URL.
pub const DEFAULT_MQTT_API_URL: &str = "mqtt://localhost:4001/mqtt";

/// Default local hub WebSocket API URL.
pub const DEFAULT_WS_API_URL: &str = "ws://localhost:4000/mqtt";

/// Default local hub HTTP port.
pub const DEFAULT_HTTP_PORT: u16 = 8787;

/// Default local hub MQTT port.
pub const DEFAULT_MQTT_PORT: u16 = 4001;

/// Default local hub WebSocket port.
pub const DEFAULT_WS_PORT: u16 = 4000;

/// Time allowed for a local attempt before falling back to remote.
///
/// This is a total budget for the local leg of a call: key derivation,
/// payload encryption and the network round-trip all count against it.
/// Remote attempts use the executor's own (longer) timeout instead.
pub const DEFAULT_LOCAL_TIMEOUT: Duration = Duration::from_millis(1000);
