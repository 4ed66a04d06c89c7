//! One-shot request routing with local attempt and remote fallback.
//!
//! `execute` runs a fixed pipeline of named stages: classify →
//! resolve-address → secure-wrap → dispatch → secure-unwrap. Per-call
//! variation is expressed through the request spec, never through
//! dynamically assembled stage lists.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use hubroute_protocol::{
    HubTarget, Protocol, RequestExecutor, RequestSpec, Response, is_local_eligible,
};
use hubroute_secure::crypto::SessionKey;
use hubroute_secure::{ClaimBinding, KeyManager};

use crate::config::HubSettings;
use crate::error::RouterError;

/// Router for one-shot REST-style calls.
///
/// Wraps a remote-capable request executor and exposes the same call
/// contract; callers compose it around their transport instead of the
/// transport being patched underneath them.
pub struct TransportRouter {
    settings: HubSettings,
    executor: Arc<dyn RequestExecutor>,
    keys: Arc<KeyManager>,
}

impl std::fmt::Debug for TransportRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRouter")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TransportRouter {
    /// Creates a router over the given executor.
    ///
    /// Fails with a configuration error when the settings are invalid,
    /// e.g. a hub that requires security without key material.
    pub fn new(
        settings: HubSettings,
        executor: Arc<dyn RequestExecutor>,
        keys: Arc<KeyManager>,
    ) -> Result<Self, RouterError> {
        settings.validate()?;
        Ok(Self {
            settings,
            executor,
            keys,
        })
    }

    /// Executes one logical call, locally when eligible, with at most
    /// one remote fallback on a connectivity-class failure.
    pub async fn execute(&self, spec: RequestSpec) -> Result<Response, RouterError> {
        // Stage: classify.
        if !self.classify(&spec) {
            return self.dispatch_remote(&spec).await;
        }

        // Stage: resolve-address.
        let local = self.resolve_address(&spec);

        // The LAN timeout is a total budget for the local leg: key
        // derivation, envelope work and the network call all count.
        let attempt = self.local_attempt(local, &spec);
        match timeout(self.settings.timeout, attempt).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(RouterError::Connectivity(reason))) => {
                info!(url = %spec.url, %reason, "local hub unavailable, switching to remote");
                self.dispatch_remote(&spec).await
            }
            Err(_) => {
                info!(url = %spec.url, "local attempt timed out, switching to remote");
                self.dispatch_remote(&spec).await
            }
            // Application errors, verification failures and
            // cancellations propagate unchanged: falling back would
            // mask real errors or duplicate cloud side effects.
            Ok(Err(other)) => Err(other),
        }
    }

    /// Returns true when this call should be attempted locally.
    fn classify(&self, spec: &RequestSpec) -> bool {
        let remote = spec.remote.unwrap_or(self.settings.remote);
        if remote {
            debug!(url = %spec.url, "forced remote");
            return false;
        }
        is_local_eligible(spec.path(), spec.method)
    }

    /// Rewrites the spec to target the hub's local HTTP address with
    /// the LAN timeout attached.
    fn resolve_address(&self, spec: &RequestSpec) -> RequestSpec {
        let mut local = spec.clone();
        local.api_url = Some(self.settings.local_url(Protocol::Http));
        local.timeout = Some(self.settings.timeout);
        local
    }

    /// Runs secure-wrap → dispatch → secure-unwrap against the hub.
    async fn local_attempt(
        &self,
        mut local: RequestSpec,
        original: &RequestSpec,
    ) -> Result<Response, RouterError> {
        // Stage: secure-wrap.
        let unwrap_ctx = if self.settings.security_enabled() {
            let hub = self.settings.hub()?;
            Some(self.secure_wrap(&mut local, original, hub).await?)
        } else {
            None
        };

        // Stage: dispatch.
        let response = self.executor.execute(&local).await?;

        // Stage: secure-unwrap.
        match unwrap_ctx {
            Some((key, binding)) => self.secure_unwrap(response, &key, &binding),
            None => Ok(response),
        }
    }

    /// Replaces the plaintext credential with its encrypted form and
    /// wraps the body, when present, in an envelope bound to
    /// {issuer: credential principal, audience: hub id, subject: path}.
    async fn secure_wrap(
        &self,
        local: &mut RequestSpec,
        original: &RequestSpec,
        hub: &HubTarget,
    ) -> Result<(Arc<SessionKey>, ClaimBinding), RouterError> {
        let key = self.keys.session_key(hub).await?;
        let binding = ClaimBinding::new(
            self.keys.principal(&original.authorization),
            &hub.id,
            original.path(),
        );

        if hub.security.request_encrypted {
            let credential = self
                .keys
                .encrypted_credential(&original.authorization, hub)
                .await?;
            local.authorization = credential;

            if let Some(body) = original.body.clone() {
                let opaque = self.keys.encrypt_payload(&key, body, &binding)?;
                local.body = Some(serde_json::Value::String(opaque));
            }
        }

        Ok((key, binding))
    }

    /// Decrypts and verifies a response envelope before returning
    /// plaintext. A verification failure is fatal for the call.
    fn secure_unwrap(
        &self,
        response: Response,
        key: &SessionKey,
        binding: &ClaimBinding,
    ) -> Result<Response, RouterError> {
        let must_verify = self
            .settings
            .hub
            .as_ref()
            .is_some_and(|hub| hub.security.response_encrypted);
        if !must_verify {
            return Ok(response);
        }

        match &response.body {
            Some(serde_json::Value::String(opaque)) => {
                let data = self.keys.decrypt_payload(key, opaque, binding).map_err(|e| {
                    warn!(error = %e, "local response failed envelope verification");
                    RouterError::from(e)
                })?;
                Ok(Response::new(response.status, Some(data)))
            }
            // No envelope present; pass through untouched.
            _ => Ok(response),
        }
    }

    /// Dispatches the original, unmodified spec to the remote-capable
    /// executor. The outcome is final.
    async fn dispatch_remote(&self, spec: &RequestSpec) -> Result<Response, RouterError> {
        self.executor.execute(spec).await.map_err(RouterError::from)
    }
}
