//! Router error types.

use hubroute_protocol::{Response, TransportError};
use hubroute_secure::SecureError;

/// Errors produced while routing an operation.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Invalid setup argument, missing hub target, or missing key
    /// material where security is required. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Local target unreachable or timed out after the remote fallback
    /// was also exhausted, or a remote-only call failed to connect.
    #[error("host unreachable: {0}")]
    Connectivity(String),

    /// Well-formed error response from either target, propagated
    /// verbatim. Never triggers fallback.
    #[error("application error (status {})", .0.status)]
    Application(Response),

    /// Envelope failed signature or claim matching. Fatal for the call;
    /// never converted into a fallback, since retrying past a tampered
    /// response would hide an active attack.
    #[error("envelope verification failed: {0}")]
    Verification(String),

    /// A cipher primitive rejected an operation outside of
    /// verification.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// A pub/sub transport already delivered the data for this call.
    /// Propagated; never triggers fallback.
    #[error("request cancelled: already delivered via pub/sub")]
    Cancelled,
}

impl From<TransportError> for RouterError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connectivity(msg) => RouterError::Connectivity(msg),
            TransportError::Application(resp) => RouterError::Application(resp),
            TransportError::Cancelled => RouterError::Cancelled,
        }
    }
}

impl From<SecureError> for RouterError {
    fn from(err: SecureError) -> Self {
        match err {
            // Verification stays distinct: it must never look like a
            // connectivity failure to the fallback logic.
            SecureError::Verification(msg) => RouterError::Verification(msg),
            SecureError::Configuration(msg) => RouterError::Configuration(msg),
            SecureError::Crypto(msg) => RouterError::Crypto(msg),
            SecureError::Json(e) => RouterError::Crypto(e.to_string()),
        }
    }
}
