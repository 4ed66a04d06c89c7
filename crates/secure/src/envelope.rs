//! Signed-then-encrypted compact envelope.
//!
//! The envelope binds a payload to its intended sender, recipient and
//! operation: claims `{iss, aud, sub, jti, iat, data}` are serialized,
//! signed with a detached tag, and the signed token is sealed by the
//! AEAD. The result travels as an opaque base64 string inside an
//! existing credential header or message body field. Envelopes are
//! created at send time and consumed at receive time, never persisted.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::SecureError;
use crate::crypto::{Sealer, SessionKey, Signer};

/// The identity triple an envelope is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimBinding {
    pub issuer: String,
    pub audience: String,
    pub subject: String,
}

impl ClaimBinding {
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            subject: subject.into(),
        }
    }
}

/// Claim set carried inside an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    /// Unique token id; per-payload freshness lives here, not in any cache.
    pub jti: String,
    pub iat: i64,
    pub data: serde_json::Value,
}

/// Builds, signs and seals an envelope around `data`.
pub fn encrypt_payload(
    signer: &dyn Signer,
    sealer: &dyn Sealer,
    key: &SessionKey,
    data: serde_json::Value,
    binding: &ClaimBinding,
) -> Result<String, SecureError> {
    let claims = Claims {
        iss: binding.issuer.clone(),
        aud: binding.audience.clone(),
        sub: binding.subject.clone(),
        jti: uuid::Uuid::new_v4().to_string(),
        iat: chrono::Utc::now().timestamp(),
        data,
    };
    let claims_json = serde_json::to_vec(&claims)?;
    let tag = signer.sign(key, &claims_json)?;

    let token = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(&claims_json),
        URL_SAFE_NO_PAD.encode(&tag)
    );
    let sealed = sealer.seal(key, token.as_bytes())?;
    Ok(URL_SAFE_NO_PAD.encode(sealed))
}

/// Opens an envelope, verifies its signature and claim binding, and
/// returns the embedded data.
///
/// Issuer, audience and subject must match `expected` exactly; any
/// mismatch is a [`SecureError::Verification`].
pub fn decrypt_payload(
    signer: &dyn Signer,
    sealer: &dyn Sealer,
    key: &SessionKey,
    opaque: &str,
    expected: &ClaimBinding,
) -> Result<serde_json::Value, SecureError> {
    let sealed = URL_SAFE_NO_PAD
        .decode(opaque)
        .map_err(|_| SecureError::Verification("malformed envelope encoding".into()))?;
    let token = sealer.open(key, &sealed)?;
    let token = std::str::from_utf8(&token)
        .map_err(|_| SecureError::Verification("malformed signed token".into()))?;

    let (claims_b64, tag_b64) = token
        .split_once('.')
        .ok_or_else(|| SecureError::Verification("malformed signed token".into()))?;
    let claims_json = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| SecureError::Verification("malformed claims encoding".into()))?;
    let tag = URL_SAFE_NO_PAD
        .decode(tag_b64)
        .map_err(|_| SecureError::Verification("malformed signature encoding".into()))?;

    signer.verify(key, &claims_json, &tag)?;

    let claims: Claims = serde_json::from_slice(&claims_json)
        .map_err(|_| SecureError::Verification("malformed claim set".into()))?;
    if claims.iss != expected.issuer {
        return Err(SecureError::Verification(format!(
            "issuer mismatch: expected '{}', got '{}'",
            expected.issuer, claims.iss
        )));
    }
    if claims.aud != expected.audience {
        return Err(SecureError::Verification(format!(
            "audience mismatch: expected '{}', got '{}'",
            expected.audience, claims.aud
        )));
    }
    if claims.sub != expected.subject {
        return Err(SecureError::Verification(format!(
            "subject mismatch: expected '{}', got '{}'",
            expected.subject, claims.sub
        )));
    }

    Ok(claims.data)
}
