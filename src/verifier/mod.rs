//! Session token verification.
//!
//! The gate only asks one question of a token: is it correctly signed and
//! unexpired. Every way of answering "no" is a `VerifyError`, which the gate
//! folds into "invalid" and only reports in logs and metrics.

mod hmac_verifier;

pub use hmac_verifier::HmacVerifier;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Claims we read from a verified session token.
///
/// Only `exp` is required, and any JSON number is accepted for it. The other
/// claims are informational and never fail verification, whatever their type.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub exp: f64,
    #[serde(default)]
    pub token_type: Option<Value>,
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub sub: Option<Value>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("verification secret is not configured")]
    MissingSecret,
    #[error("token is malformed: {0}")]
    Malformed(String),
    #[error("token signature does not match")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is not valid yet")]
    NotYetValid,
    #[error("token is missing required claim '{0}'")]
    MissingClaim(String),
    #[error("token rejected: {0}")]
    Rejected(String),
}

impl VerifyError {
    /// Short label used for the `result` metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            VerifyError::MissingSecret => "missing_secret",
            VerifyError::Malformed(_) => "malformed",
            VerifyError::BadSignature => "bad_signature",
            VerifyError::Expired => "expired",
            VerifyError::NotYetValid => "not_yet_valid",
            VerifyError::MissingClaim(_) => "missing_claim",
            VerifyError::Rejected(_) => "rejected",
        }
    }
}

/// Confirms a session token's signature and expiry.
#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    /// A display name for logs/debugging.
    fn get_name(&self) -> &str;

    async fn verify(&self, token: &str) -> Result<SessionClaims, VerifyError>;
}
