//! Local-first routing for long-lived subscribe/publish operations.
//!
//! The pub/sub transport's target endpoint is connection-level shared
//! state, not a per-call parameter: the router redirects it to the
//! local hub before an attempt and restores the remote endpoint on
//! every exit path, success included, so cross-call state stays
//! consistent. Races between concurrent pub/sub calls on that shared
//! field are an accepted limitation.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{info, warn};

use hubroute_protocol::{
    MessageCallback, Protocol, PubSubOptions, PubSubTransport, is_local_eligible,
};
use hubroute_secure::{ClaimBinding, KeyManager};

use crate::config::HubSettings;
use crate::error::RouterError;

/// Subscribe or publish, for shared attempt plumbing.
#[derive(Clone, Copy)]
enum Op {
    Subscribe,
    Publish,
}

/// Router for publish/subscribe operations.
pub struct PubSubRouter {
    settings: HubSettings,
    transport: Arc<dyn PubSubTransport>,
    keys: Arc<KeyManager>,
    protocol: Protocol,
}

impl std::fmt::Debug for PubSubRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubRouter")
            .field("settings", &self.settings)
            .field("protocol", &self.protocol)
            .finish_non_exhaustive()
    }
}

impl PubSubRouter {
    /// Creates a pub/sub router over the given transport.
    ///
    /// The transport is an optional capability: absence is rejected
    /// here, once, with a configuration error rather than failing
    /// somewhere mid-call.
    pub fn new(
        settings: HubSettings,
        transport: Option<Arc<dyn PubSubTransport>>,
        keys: Arc<KeyManager>,
        protocol: Protocol,
    ) -> Result<Self, RouterError> {
        settings.validate()?;
        let transport = transport.ok_or_else(|| {
            RouterError::Configuration("no pub/sub transport configured".into())
        })?;
        if protocol == Protocol::Http {
            return Err(RouterError::Configuration(
                "pub/sub requires an mqtt or ws protocol".into(),
            ));
        }
        Ok(Self {
            settings,
            transport,
            keys,
            protocol,
        })
    }

    /// Subscribes to a resource, attempting the local hub first.
    ///
    /// In secure mode every inbound message is independently decrypted
    /// and verified before the caller's callback runs; messages failing
    /// verification are logged and never reach the callback.
    pub async fn subscribe(
        &self,
        resource: &str,
        callback: MessageCallback,
        options: &PubSubOptions,
    ) -> Result<(), RouterError> {
        if self.force_remote(resource) {
            return self
                .transport
                .subscribe(resource, callback, options)
                .await
                .map_err(RouterError::from);
        }

        let remote_url = self.redirect_to_local().await;
        let attempt = async {
            let (local_callback, local_options) =
                self.secure_subscribe_args(resource, &callback, options).await?;
            self.transport
                .subscribe(resource, local_callback, &local_options)
                .await
                .map_err(RouterError::from)
        };
        let result = timeout(self.settings.timeout, attempt).await;

        // Shared state must be consistent on every exit path.
        self.transport.set_endpoint(&remote_url).await;

        match flatten(result) {
            Ok(()) => Ok(()),
            Err(RouterError::Connectivity(reason)) => {
                info!(%resource, %reason, "local hub unavailable, subscribing remotely");
                self.transport
                    .subscribe(resource, callback, options)
                    .await
                    .map_err(RouterError::from)
            }
            Err(other) => Err(other),
        }
    }

    /// Publishes a message, attempting the local hub first.
    ///
    /// In secure mode the outgoing body is encrypted before it reaches
    /// the transport's wire-send path.
    pub async fn publish(
        &self,
        resource: &str,
        message: serde_json::Value,
        options: &PubSubOptions,
    ) -> Result<(), RouterError> {
        if self.force_remote(resource) {
            return self
                .transport
                .publish(resource, message, options)
                .await
                .map_err(RouterError::from);
        }

        let remote_url = self.redirect_to_local().await;
        let attempt = async {
            let (local_message, local_options) = self
                .secure_publish_args(resource, message.clone(), options)
                .await?;
            self.transport
                .publish(resource, local_message, &local_options)
                .await
                .map_err(RouterError::from)
        };
        let result = timeout(self.settings.timeout, attempt).await;

        self.transport.set_endpoint(&remote_url).await;

        match flatten(result) {
            Ok(()) => Ok(()),
            Err(RouterError::Connectivity(reason)) => {
                info!(%resource, %reason, "local hub unavailable, publishing remotely");
                self.transport
                    .publish(resource, message, options)
                    .await
                    .map_err(RouterError::from)
            }
            Err(other) => Err(other),
        }
    }

    /// True when this call skips the local attempt entirely.
    ///
    /// Pub/sub resources follow the same eligibility table as REST
    /// paths; ineligible resources and a global remote default both go
    /// straight to the cloud.
    fn force_remote(&self, resource: &str) -> bool {
        self.settings.remote || !is_local_eligible(resource, hubroute_protocol::Method::Get)
    }

    /// Saves the current endpoint and redirects the transport to the
    /// local hub. Returns the saved remote endpoint.
    async fn redirect_to_local(&self) -> String {
        let remote_url = self.transport.endpoint().await;
        let local_url = self.settings.local_url(self.protocol);
        self.transport.set_endpoint(&local_url).await;
        remote_url
    }

    /// Builds the callback and options for a secured local subscribe.
    async fn secure_subscribe_args(
        &self,
        resource: &str,
        callback: &MessageCallback,
        options: &PubSubOptions,
    ) -> Result<(MessageCallback, PubSubOptions), RouterError> {
        if !self.settings.security_enabled() {
            return Ok((callback.clone(), options.clone()));
        }

        let hub = self.settings.hub()?;
        let key = self.keys.session_key(hub).await?;
        let credential = self
            .keys
            .encrypted_credential(&options.authorization, hub)
            .await?;

        // Inbound messages are issued by the hub for this caller and
        // resource; each one carries its own claims and is verified
        // independently.
        let binding = ClaimBinding::new(
            &hub.id,
            self.keys.principal(&options.authorization),
            resource,
        );
        let keys = self.keys.clone();
        let inner = callback.clone();
        let resource = resource.to_string();
        let wrapped: MessageCallback = Arc::new(move |message| match &message {
            serde_json::Value::String(opaque) => {
                match keys.decrypt_payload(&key, opaque, &binding) {
                    Ok(data) => inner(data),
                    Err(e) => {
                        warn!(resource = %resource, error = %e, "dropping message failing envelope verification");
                    }
                }
            }
            _ => {
                warn!(resource = %resource, "dropping non-envelope message on secured subscription");
            }
        });

        Ok((wrapped, PubSubOptions::new(credential)))
    }

    /// Builds the message and options for a secured local publish.
    async fn secure_publish_args(
        &self,
        resource: &str,
        message: serde_json::Value,
        options: &PubSubOptions,
    ) -> Result<(serde_json::Value, PubSubOptions), RouterError> {
        if !self.settings.security_enabled() {
            return Ok((message, options.clone()));
        }

        let hub = self.settings.hub()?;
        let key = self.keys.session_key(hub).await?;
        let credential = self
            .keys
            .encrypted_credential(&options.authorization, hub)
            .await?;

        let binding = ClaimBinding::new(
            self.keys.principal(&options.authorization),
            &hub.id,
            resource,
        );
        let opaque = self.keys.encrypt_payload(&key, message, &binding)?;
        Ok((
            serde_json::Value::String(opaque),
            PubSubOptions::new(credential),
        ))
    }
}

/// Collapses a timed-out local attempt into the connectivity class.
fn flatten(
    result: Result<Result<(), RouterError>, tokio::time::error::Elapsed>,
) -> Result<(), RouterError> {
    match result {
        Ok(inner) => inner,
        Err(_) => Err(RouterError::Connectivity("local attempt timed out".into())),
    }
}
