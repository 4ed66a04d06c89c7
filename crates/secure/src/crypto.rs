//! Capability traits over the cipher primitives, with default
//! implementations backed by real crates and explicit null
//! implementations for insecure setups.

use std::fmt;

use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use hubroute_protocol::KeyMaterial;

use crate::SecureError;

type HmacSha256 = Hmac<Sha256>;

/// XChaCha20-Poly1305 nonce length in bytes.
const NONCE_LEN: usize = 24;

/// Derived shared key bound to one hub.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; 32]);

impl SessionKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionKey").field(&"[redacted]").finish()
    }
}

/// Imports raw hub key material into a session key.
pub trait KeyImport: Send + Sync {
    fn import(&self, material: &KeyMaterial) -> Result<SessionKey, SecureError>;
}

/// Detached signing over a canonical claim set.
pub trait Signer: Send + Sync {
    fn sign(&self, key: &SessionKey, data: &[u8]) -> Result<Vec<u8>, SecureError>;
    fn verify(&self, key: &SessionKey, data: &[u8], signature: &[u8]) -> Result<(), SecureError>;
}

/// Authenticated encryption producing an opaque byte blob.
pub trait Sealer: Send + Sync {
    fn seal(&self, key: &SessionKey, plaintext: &[u8]) -> Result<Vec<u8>, SecureError>;
    fn open(&self, key: &SessionKey, ciphertext: &[u8]) -> Result<Vec<u8>, SecureError>;
}

/// Default key import: SHA-256 of the raw material, so hub secrets of
/// any length yield a 32-byte session key.
#[derive(Debug, Default)]
pub struct RawKeyImport;

impl KeyImport for RawKeyImport {
    fn import(&self, material: &KeyMaterial) -> Result<SessionKey, SecureError> {
        if material.bytes().is_empty() {
            return Err(SecureError::Configuration("empty key material".into()));
        }
        let digest = Sha256::digest(material.bytes());
        Ok(SessionKey::from_bytes(digest.into()))
    }
}

/// Default signer: HMAC-SHA256 detached tags.
#[derive(Debug, Default)]
pub struct HmacSha256Signer;

impl Signer for HmacSha256Signer {
    fn sign(&self, key: &SessionKey, data: &[u8]) -> Result<Vec<u8>, SecureError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(key.bytes())
            .map_err(|e| SecureError::Crypto(e.to_string()))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn verify(&self, key: &SessionKey, data: &[u8], signature: &[u8]) -> Result<(), SecureError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(key.bytes())
            .map_err(|e| SecureError::Crypto(e.to_string()))?;
        mac.update(data);
        mac.verify_slice(signature)
            .map_err(|_| SecureError::Verification("signature mismatch".into()))
    }
}

/// Default sealer: XChaCha20-Poly1305 with a random nonce prefixed to
/// the ciphertext.
#[derive(Debug, Default)]
pub struct XChaChaSealer;

impl Sealer for XChaChaSealer {
    fn seal(&self, key: &SessionKey, plaintext: &[u8]) -> Result<Vec<u8>, SecureError> {
        let cipher = XChaCha20Poly1305::new(key.bytes().into());
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| SecureError::Crypto(e.to_string()))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn open(&self, key: &SessionKey, ciphertext: &[u8]) -> Result<Vec<u8>, SecureError> {
        if ciphertext.len() <= NONCE_LEN {
            return Err(SecureError::Verification("envelope too short".into()));
        }
        let (nonce, body) = ciphertext.split_at(NONCE_LEN);
        let cipher = XChaCha20Poly1305::new(key.bytes().into());
        cipher
            .decrypt(XNonce::from_slice(nonce), body)
            .map_err(|_| SecureError::Verification("authenticated decryption failed".into()))
    }
}

/// Null signer for setups without signing capability. Any use is a
/// configuration error.
#[derive(Debug, Default)]
pub struct NullSigner;

impl Signer for NullSigner {
    fn sign(&self, _key: &SessionKey, _data: &[u8]) -> Result<Vec<u8>, SecureError> {
        Err(SecureError::Configuration("no signing capability".into()))
    }

    fn verify(&self, _key: &SessionKey, _data: &[u8], _sig: &[u8]) -> Result<(), SecureError> {
        Err(SecureError::Configuration("no signing capability".into()))
    }
}

/// Null sealer for setups without encryption capability.
#[derive(Debug, Default)]
pub struct NullSealer;

impl Sealer for NullSealer {
    fn seal(&self, _key: &SessionKey, _plaintext: &[u8]) -> Result<Vec<u8>, SecureError> {
        Err(SecureError::Configuration("no encryption capability".into()))
    }

    fn open(&self, _key: &SessionKey, _ciphertext: &[u8]) -> Result<Vec<u8>, SecureError> {
        Err(SecureError::Configuration("no encryption capability".into()))
    }
}

/// Stable, non-secret principal identifier for a caller credential.
///
/// Used as the envelope issuer so the raw credential never appears in
/// claims.
pub fn credential_principal(credential: &str) -> String {
    let digest = Sha256::digest(credential.as_bytes());
    hex::encode(&digest[..8])
}
