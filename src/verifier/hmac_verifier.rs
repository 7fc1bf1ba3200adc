use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tracing::{error, info};

use super::{SessionClaims, TokenVerifier, VerifyError};
use crate::config::JWTConfig;

const MISSING_SECRET_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Verifies HS256/HS384/HS512 tokens against one shared secret.
///
/// `jsonwebtoken` checks the header and signature; `exp` and `nbf` are checked
/// here on the raw claims so integer and fractional timestamps both work.
/// Without a secret every call fails with `MissingSecret`.
pub struct HmacVerifier {
    key: Option<DecodingKey>,
    validation: Validation,
    missing_secret_alarm: MissingSecretAlarm,
}

impl HmacVerifier {
    pub fn new(secret: Option<&str>) -> Self {
        let key = secret
            .filter(|s| !s.is_empty())
            .map(|s| DecodingKey::from_secret(s.as_bytes()));

        if key.is_some() {
            info!("Session token verifier ready (HMAC)");
        } else {
            error!("JWT secret is not configured; every session token will be treated as invalid");
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            key,
            validation,
            missing_secret_alarm: MissingSecretAlarm::new(MISSING_SECRET_LOG_INTERVAL),
        }
    }

    pub fn from_config(config: &JWTConfig) -> Self {
        Self::new(config.resolve_secret().as_deref())
    }
}

#[async_trait::async_trait]
impl TokenVerifier for HmacVerifier {
    fn get_name(&self) -> &str {
        "hmac"
    }

    async fn verify(&self, token: &str) -> Result<SessionClaims, VerifyError> {
        let Some(key) = &self.key else {
            if let Some(suppressed) = self.missing_secret_alarm.raise() {
                error!(
                    event_name = "verifier.missing_secret",
                    suppressed, "Rejecting session token: JWT secret is not configured"
                );
            }
            return Err(VerifyError::MissingSecret);
        };

        let claims = decode::<Value>(token, key, &self.validation)
            .map_err(classify_error)?
            .claims;
        check_lifetime(&claims, Utc::now().timestamp())?;
        serde_json::from_value(claims).map_err(|e| VerifyError::Malformed(e.to_string()))
    }
}

/// Zero leeway: expired once `exp <= now`, not yet valid while `nbf > now`.
fn check_lifetime(claims: &Value, now: i64) -> Result<(), VerifyError> {
    let now = now as f64;
    let exp = match claims.get("exp") {
        None | Some(Value::Null) => return Err(VerifyError::MissingClaim("exp".to_string())),
        Some(exp) => numeric_claim("exp", exp)?,
    };
    if exp <= now {
        return Err(VerifyError::Expired);
    }
    if let Some(nbf) = claims.get("nbf").filter(|nbf| !nbf.is_null()) {
        if numeric_claim("nbf", nbf)? > now {
            return Err(VerifyError::NotYetValid);
        }
    }
    Ok(())
}

fn numeric_claim(name: &str, value: &Value) -> Result<f64, VerifyError> {
    value
        .as_f64()
        .ok_or_else(|| VerifyError::Malformed(format!("'{name}' claim is not a number")))
}

fn classify_error(e: JwtError) -> VerifyError {
    match e.kind() {
        ErrorKind::ExpiredSignature => VerifyError::Expired,
        ErrorKind::ImmatureSignature => VerifyError::NotYetValid,
        ErrorKind::InvalidSignature => VerifyError::BadSignature,
        ErrorKind::MissingRequiredClaim(claim) => VerifyError::MissingClaim(claim.clone()),
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            VerifyError::Malformed(e.to_string())
        }
        _ => VerifyError::Rejected(e.to_string()),
    }
}

/// Lets one missing-secret error through per interval and counts the rest,
/// so a misconfigured deployment does not log on every request.
struct MissingSecretAlarm {
    interval: Duration,
    window: Mutex<AlarmWindow>,
}

#[derive(Default)]
struct AlarmWindow {
    opened_at: Option<Instant>,
    suppressed: u64,
}

impl MissingSecretAlarm {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            window: Mutex::new(AlarmWindow::default()),
        }
    }

    /// `Some(suppressed)` when the caller should log, with the number of
    /// alarms swallowed since the previous line.
    fn raise(&self) -> Option<u64> {
        let mut window = self
            .window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();

        match window.opened_at {
            Some(opened_at) if now.duration_since(opened_at) < self.interval => {
                window.suppressed += 1;
                None
            }
            _ => {
                window.opened_at = Some(now);
                Some(std::mem::take(&mut window.suppressed))
            }
        }
    }
}
