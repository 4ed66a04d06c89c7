//! Key manager owning session keys and the encrypted-credential cache.
//!
//! Both caches follow a single-in-flight rule: the first concurrent
//! caller installs a pending cell and runs the derivation; later callers
//! on the same key await that same cell instead of re-deriving. Once
//! resolved the value is immutable and shared by reference. Entries are
//! never implicitly expired — per-payload freshness is carried by the
//! envelope's unique token id — and only explicit reconfiguration of a
//! hub invalidates them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use hubroute_protocol::HubTarget;

use crate::SecureError;
use crate::crypto::{
    HmacSha256Signer, KeyImport, RawKeyImport, Sealer, SessionKey, Signer, XChaChaSealer,
    credential_principal,
};
use crate::envelope::{self, ClaimBinding};

/// Subject claim used for encrypted-credential envelopes.
const CREDENTIAL_SUBJECT: &str = "auth";

type SessionCell = Arc<OnceCell<Arc<SessionKey>>>;
type CredentialCell = Arc<OnceCell<String>>;

/// Owns per-hub session keys and encrypted credentials; routers only
/// read through this interface.
pub struct KeyManager {
    importer: Arc<dyn KeyImport>,
    signer: Arc<dyn Signer>,
    sealer: Arc<dyn Sealer>,
    sessions: Mutex<HashMap<String, SessionCell>>,
    credentials: Mutex<HashMap<(String, String), CredentialCell>>,
}

impl KeyManager {
    /// Creates a key manager with injected cipher capabilities.
    pub fn new(
        importer: Arc<dyn KeyImport>,
        signer: Arc<dyn Signer>,
        sealer: Arc<dyn Sealer>,
    ) -> Self {
        Self {
            importer,
            signer,
            sealer,
            sessions: Mutex::new(HashMap::new()),
            credentials: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a key manager with the default primitives.
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(RawKeyImport),
            Arc::new(HmacSha256Signer),
            Arc::new(XChaChaSealer),
        )
    }

    /// Returns the session key for `hub`, deriving it on first use.
    ///
    /// Idempotent per hub; concurrent cold-cache callers share a single
    /// in-flight import.
    pub async fn session_key(&self, hub: &HubTarget) -> Result<Arc<SessionKey>, SecureError> {
        let cell = {
            let mut sessions = self.sessions.lock().await;
            sessions.entry(hub.id.clone()).or_default().clone()
        };
        cell.get_or_try_init(|| async {
            let material = hub.key_material.as_ref().ok_or_else(|| {
                SecureError::Configuration(format!("hub '{}' has no key material", hub.id))
            })?;
            debug!(hub = %hub.id, "deriving session key");
            Ok(Arc::new(self.importer.import(material)?))
        })
        .await
        .cloned()
    }

    /// Returns the encrypted form of `credential` for `hub`, computing
    /// it once per (credential, hub) pair and reusing it thereafter.
    pub async fn encrypted_credential(
        &self,
        credential: &str,
        hub: &HubTarget,
    ) -> Result<String, SecureError> {
        let cell = {
            let mut credentials = self.credentials.lock().await;
            credentials
                .entry((credential.to_string(), hub.id.clone()))
                .or_default()
                .clone()
        };
        cell.get_or_try_init(|| async {
            let key = self.session_key(hub).await?;
            let binding =
                ClaimBinding::new(credential_principal(credential), &hub.id, CREDENTIAL_SUBJECT);
            debug!(hub = %hub.id, "encrypting caller credential");
            envelope::encrypt_payload(
                self.signer.as_ref(),
                self.sealer.as_ref(),
                &key,
                serde_json::Value::String(credential.to_string()),
                &binding,
            )
        })
        .await
        .cloned()
    }

    /// Wraps `data` in a signed+encrypted envelope bound to `binding`.
    pub fn encrypt_payload(
        &self,
        key: &SessionKey,
        data: serde_json::Value,
        binding: &ClaimBinding,
    ) -> Result<String, SecureError> {
        envelope::encrypt_payload(self.signer.as_ref(), self.sealer.as_ref(), key, data, binding)
    }

    /// Opens an envelope and verifies it against `expected`.
    pub fn decrypt_payload(
        &self,
        key: &SessionKey,
        opaque: &str,
        expected: &ClaimBinding,
    ) -> Result<serde_json::Value, SecureError> {
        envelope::decrypt_payload(self.signer.as_ref(), self.sealer.as_ref(), key, opaque, expected)
    }

    /// Stable principal identifier for a caller credential.
    pub fn principal(&self, credential: &str) -> String {
        credential_principal(credential)
    }

    /// Drops the session key and every cached credential for `hub_id`.
    ///
    /// Must be called whenever a hub's key material changes, so stale
    /// envelopes are never produced under a rotated key.
    pub async fn invalidate_hub(&self, hub_id: &str) {
        self.sessions.lock().await.remove(hub_id);
        self.credentials
            .lock()
            .await
            .retain(|(_, hub), _| hub.as_str() != hub_id);
        debug!(hub = %hub_id, "invalidated cached keys and credentials");
    }
}
