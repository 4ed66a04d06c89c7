//! Key management and envelope construction for secured hub traffic.
//!
//! Wraps credentials and payloads in a signed-then-encrypted compact
//! token so the hub cannot be impersonated and local-network traffic is
//! never cleartext. Cipher primitives are consumed through capability
//! traits, never implemented here.

pub mod crypto;
pub mod envelope;
pub mod keys;

pub use crypto::{
    HmacSha256Signer, KeyImport, NullSealer, NullSigner, RawKeyImport, Sealer, SessionKey, Signer,
    XChaChaSealer,
};
pub use envelope::{Claims, ClaimBinding};
pub use keys::KeyManager;

/// Errors for key management and envelope handling.
#[derive(Debug, thiserror::Error)]
pub enum SecureError {
    /// Missing key material or a null capability where security is
    /// required. Raised at setup/call time, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Envelope failed signature or claim matching. Fatal for the call.
    #[error("verification failed: {0}")]
    Verification(String),

    /// The underlying primitive rejected the operation.
    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
