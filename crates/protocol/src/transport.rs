//! Transport capability traits consumed by the routers.
//!
//! Actual network I/O lives behind these traits; the routing core only
//! sequences calls and classifies failures. Error classification is the
//! contract that makes fallback safe: only a connectivity-class failure
//! may trigger a remote retry.

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{RequestSpec, Response};

/// Failure classes a transport must distinguish.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Target host unreachable or timed out. The only class that may
    /// trigger a remote fallback.
    #[error("host unreachable: {0}")]
    Connectivity(String),

    /// The host was reachable and responded with a well-formed error.
    /// Propagated verbatim; never retried.
    #[error("application error (status {})", .0.status)]
    Application(Response),

    /// The operation was cancelled because a pub/sub transport already
    /// delivered the data. Propagated; never triggers fallback.
    #[error("cancelled: already delivered via pub/sub")]
    Cancelled,
}

/// Executor for one-shot REST-style calls.
///
/// `spec.api_url` selects the target root (local hub vs the executor's
/// configured cloud root when absent); `spec.timeout` bounds the attempt
/// when set, otherwise the executor's normal timeout applies.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, spec: &RequestSpec) -> Result<Response, TransportError>;
}

/// Callback invoked for every message delivered on a subscription.
pub type MessageCallback = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

/// Per-call pub/sub options.
#[derive(Debug, Clone)]
pub struct PubSubOptions {
    pub authorization: String,
}

impl PubSubOptions {
    pub fn new(authorization: impl Into<String>) -> Self {
        Self {
            authorization: authorization.into(),
        }
    }
}

/// Long-lived publish/subscribe transport.
///
/// The endpoint is connection-level shared state, not a per-call
/// parameter: every user of the transport sees the same target. Callers
/// that redirect it must restore it on every exit path.
#[async_trait]
pub trait PubSubTransport: Send + Sync {
    /// Returns the current connection endpoint URL.
    async fn endpoint(&self) -> String;

    /// Redirects the connection endpoint. Shared across all users.
    async fn set_endpoint(&self, url: &str);

    /// Subscribes to a resource path, delivering messages to `callback`.
    async fn subscribe(
        &self,
        resource: &str,
        callback: MessageCallback,
        options: &PubSubOptions,
    ) -> Result<(), TransportError>;

    /// Publishes a message to a resource path.
    async fn publish(
        &self,
        resource: &str,
        message: serde_json::Value,
        options: &PubSubOptions,
    ) -> Result<(), TransportError>;
}
