//! Discovery client.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use hubroute_protocol::{HubTarget, Method, RequestExecutor, RequestSpec};

use crate::DiscoveryError;
use crate::types::{Collection, HUB_COLLECTION_TAG, HubDevice};

/// Looks up a project's hub devices through the cloud API.
pub struct HubDiscovery {
    executor: Arc<dyn RequestExecutor>,
}

impl HubDiscovery {
    /// Creates a discovery client over the given cloud executor.
    pub fn new(executor: Arc<dyn RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Lists the project's hubs currently reporting a connected state,
    /// in the order the cloud returns them.
    ///
    /// Fails with [`DiscoveryError::NotConfigured`] when the project has
    /// no tagged distribution collection, and with
    /// [`DiscoveryError::NoHubs`] when the collection has no member
    /// devices at all. A collection whose members are all disconnected
    /// yields an empty list.
    pub async fn list_connected_hubs(
        &self,
        api_key: &str,
    ) -> Result<Vec<HubTarget>, DiscoveryError> {
        let collections: Vec<Collection> = self
            .fetch(
                &format!("/collections?filter=tags={HUB_COLLECTION_TAG}"),
                api_key,
            )
            .await?;
        let collection = collections
            .into_iter()
            .next()
            .ok_or(DiscoveryError::NotConfigured)?;
        debug!(collection = %collection.id, "found hub distribution collection");

        let devices: Vec<HubDevice> = self
            .fetch(&format!("/collections/{}/thngs", collection.id), api_key)
            .await?;
        if devices.is_empty() {
            return Err(DiscoveryError::NoHubs);
        }

        let total = devices.len();
        let hubs = devices
            .into_iter()
            .filter(|d| d.is_connected())
            .map(HubDevice::into_target)
            .collect::<Result<Vec<_>, _>>()?;
        info!(connected = hubs.len(), total, "hub discovery complete");
        Ok(hubs)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        api_key: &str,
    ) -> Result<Vec<T>, DiscoveryError> {
        let spec = RequestSpec::new(path, Method::Get, api_key);
        let response = self
            .executor
            .execute(&spec)
            .await
            .map_err(|e| DiscoveryError::Cloud(e.to_string()))?;
        if !response.is_success() {
            return Err(DiscoveryError::Cloud(format!(
                "unexpected status {} for {path}",
                response.status
            )));
        }
        let body = response
            .body
            .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));
        serde_json::from_value(body)
            .map_err(|e| DiscoveryError::Malformed(format!("response for {path}: {e}")))
    }
}
