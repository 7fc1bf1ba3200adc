//! The session gate.
//!
//! Every navigation request is classified by path and checked for a valid
//! session, then either passed through or redirected. The gate holds only
//! immutable data and is shared across requests behind an `Arc`.

pub mod middleware;
mod path;
mod routes;

pub use path::{canonical_path, PathError};
pub use routes::{RouteClass, RouteTable};

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::metrics::{Metrics, MetricsRecorder};
use crate::verifier::TokenVerifier;

/// Everything the gate looks at for one request.
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    pub path: &'a str,
    pub access_token: Option<&'a str>,
    pub refresh_token: Option<&'a str>,
}

/// What to do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Pass,
    Redirect { target: String, clear_cookies: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Authenticated,
    Unauthenticated,
}

/// The cookie a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSlot {
    Access,
    Refresh,
}

impl TokenSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSlot::Access => "access",
            TokenSlot::Refresh => "refresh",
        }
    }
}

pub struct SessionGate {
    routes: RouteTable,
    verifier: Arc<dyn TokenVerifier>,
    metrics: Metrics,
}

impl SessionGate {
    pub fn new(routes: RouteTable, verifier: Arc<dyn TokenVerifier>, metrics: Metrics) -> Self {
        info!(
            "Session gate ready: login='{}', landing='{}', verifier='{}'",
            routes.login(),
            routes.landing(),
            verifier.get_name()
        );
        Self {
            routes,
            verifier,
            metrics,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decides whether `request` passes or is redirected.
    ///
    /// Unrestricted paths pass without looking at the cookies at all.
    pub async fn evaluate(&self, request: &GateRequest<'_>) -> Decision {
        let route_class = self.routes.classify(request.path);

        let (decision, label) = match route_class {
            RouteClass::Unrestricted => (Decision::Pass, "pass"),
            RouteClass::PublicOnly => match self.verdict(request).await {
                Verdict::Authenticated => (
                    Decision::Redirect {
                        target: self.routes.landing().to_string(),
                        clear_cookies: false,
                    },
                    "redirect_landing",
                ),
                Verdict::Unauthenticated => (Decision::Pass, "pass"),
            },
            RouteClass::Protected => match self.verdict(request).await {
                Verdict::Authenticated => (Decision::Pass, "pass"),
                Verdict::Unauthenticated => {
                    info!(
                        path = request.path,
                        "User is not authenticated. Redirecting to {}",
                        self.routes.login()
                    );
                    (
                        Decision::Redirect {
                            target: self.routes.login().to_string(),
                            clear_cookies: true,
                        },
                        "redirect_login",
                    )
                }
            },
        };

        debug!(
            path = request.path,
            route_class = route_class.as_str(),
            decision = label,
            "Gate decision"
        );
        self.metrics
            .record_gate_decision(route_class.as_str(), label);
        decision
    }

    /// Access token first; the refresh token is only consulted when the
    /// access token is absent or invalid. A valid refresh token is enough on
    /// its own, no new access token is issued here.
    pub async fn verdict(&self, request: &GateRequest<'_>) -> Verdict {
        if let Some(token) = present(request.access_token) {
            if self.check(TokenSlot::Access, token).await {
                return Verdict::Authenticated;
            }
        }
        if let Some(token) = present(request.refresh_token) {
            if self.check(TokenSlot::Refresh, token).await {
                return Verdict::Authenticated;
            }
        }
        Verdict::Unauthenticated
    }

    async fn check(&self, slot: TokenSlot, token: &str) -> bool {
        let started = Instant::now();
        let result = self.verifier.verify(token).await;
        self.metrics
            .record_verification_duration(slot.as_str(), started.elapsed().as_secs_f64());

        match result {
            Ok(claims) => {
                self.metrics.record_token_verification(slot.as_str(), "valid");
                debug!(
                    slot = slot.as_str(),
                    token_type = ?claims.token_type,
                    user_id = ?claims.user_id,
                    "Session token accepted"
                );
                true
            }
            Err(e) => {
                self.metrics
                    .record_token_verification(slot.as_str(), e.reason());
                debug!(
                    slot = slot.as_str(),
                    reason = e.reason(),
                    "Session token rejected: {}",
                    e
                );
                false
            }
        }
    }
}

fn present(token: Option<&str>) -> Option<&str> {
    token.filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoutesConfig;
    use crate::verifier::{HmacVerifier, SessionClaims, VerifyError};
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use std::sync::Mutex;

    const SECRET: &str = "gate-secret";

    /// Accepts exactly the listed tokens and remembers what it was asked.
    struct ListVerifier {
        valid: Vec<&'static str>,
        seen: Mutex<Vec<String>>,
    }

    impl ListVerifier {
        fn new(valid: &[&'static str]) -> Arc<Self> {
            Arc::new(Self {
                valid: valid.to_vec(),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl TokenVerifier for ListVerifier {
        fn get_name(&self) -> &str {
            "list"
        }

        async fn verify(&self, token: &str) -> Result<SessionClaims, VerifyError> {
            self.seen.lock().unwrap().push(token.to_string());
            if self.valid.iter().any(|valid| *valid == token) {
                Ok(SessionClaims {
                    exp: f64::MAX,
                    token_type: None,
                    user_id: None,
                    sub: None,
                })
            } else {
                Err(VerifyError::BadSignature)
            }
        }
    }

    fn gate(verifier: Arc<dyn TokenVerifier>) -> SessionGate {
        let routes = RouteTable::new(&RoutesConfig::default()).expect("default routes are valid");
        SessionGate::new(routes, verifier, Metrics::new())
    }

    fn request<'a>(
        path: &'a str,
        access_token: Option<&'a str>,
        refresh_token: Option<&'a str>,
    ) -> GateRequest<'a> {
        GateRequest {
            path,
            access_token,
            refresh_token,
        }
    }

    fn to_login() -> Decision {
        Decision::Redirect {
            target: "/auth/login".to_string(),
            clear_cookies: true,
        }
    }

    fn to_landing() -> Decision {
        Decision::Redirect {
            target: "/home".to_string(),
            clear_cookies: false,
        }
    }

    fn sign(exp: i64, secret: &str) -> String {
        encode(
            &Header::default(),
            &json!({"exp": exp, "token_type": "access"}),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("Failed to create token")
    }

    #[tokio::test]
    async fn decision_table() {
        let gate = gate(ListVerifier::new(&["good"]));

        let cases = [
            ("/auth/login", Some("good"), to_landing()),
            ("/auth/signup", Some("good"), to_landing()),
            ("/auth/login", None, Decision::Pass),
            ("/auth/login", Some("bad"), Decision::Pass),
            ("/home", Some("good"), Decision::Pass),
            ("/meals/3", Some("good"), Decision::Pass),
            ("/home", None, to_login()),
            ("/", Some("bad"), to_login()),
            ("/api/meals", None, Decision::Pass),
            ("/api/meals", Some("bad"), Decision::Pass),
            ("/api/meals", Some("good"), Decision::Pass),
        ];

        for (path, access, expected) in cases {
            assert_eq!(
                gate.evaluate(&request(path, access, None)).await,
                expected,
                "path={path} access={access:?}"
            );
        }
    }

    #[tokio::test]
    async fn refresh_token_alone_is_enough() {
        let gate = gate(ListVerifier::new(&["refresh"]));

        assert_eq!(
            gate.evaluate(&request("/settings", Some("stale"), Some("refresh")))
                .await,
            Decision::Pass
        );
        assert_eq!(
            gate.evaluate(&request("/auth/signup", None, Some("refresh")))
                .await,
            to_landing()
        );
    }

    #[tokio::test]
    async fn refresh_is_not_checked_when_access_is_valid() {
        let verifier = ListVerifier::new(&["access"]);
        let gate = gate(verifier.clone());

        gate.evaluate(&request("/home", Some("access"), Some("refresh")))
            .await;
        assert_eq!(verifier.seen(), vec!["access".to_string()]);
    }

    #[tokio::test]
    async fn unrestricted_paths_skip_verification() {
        let verifier = ListVerifier::new(&[]);
        let gate = gate(verifier.clone());

        gate.evaluate(&request("/favicon.ico", Some("a"), Some("r")))
            .await;
        assert!(verifier.seen().is_empty());
    }

    #[tokio::test]
    async fn empty_cookies_count_as_absent() {
        let verifier = ListVerifier::new(&[""]);
        let gate = gate(verifier.clone());

        assert_eq!(
            gate.evaluate(&request("/history", Some(""), Some(""))).await,
            to_login()
        );
        assert!(verifier.seen().is_empty());
    }

    #[tokio::test]
    async fn expired_access_with_valid_refresh_passes_settings() {
        let gate = gate(Arc::new(HmacVerifier::new(Some(SECRET))));
        let now = Utc::now().timestamp();
        let expired = sign(now - 60, SECRET);
        let refresh = sign(now + 86_400, SECRET);

        assert_eq!(
            gate.evaluate(&request("/settings", Some(&expired), Some(&refresh)))
                .await,
            Decision::Pass
        );
    }

    #[tokio::test]
    async fn wrong_secret_redirects_and_clears_cookies() {
        let gate = gate(Arc::new(HmacVerifier::new(Some(SECRET))));
        let forged = sign(Utc::now().timestamp() + 3600, "not-the-secret");

        assert_eq!(
            gate.evaluate(&request("/home", Some(&forged), None)).await,
            to_login()
        );
    }

    #[tokio::test]
    async fn valid_access_token_leaves_login_page() {
        let gate = gate(Arc::new(HmacVerifier::new(Some(SECRET))));
        let token = sign(Utc::now().timestamp() + 3600, SECRET);

        assert_eq!(
            gate.evaluate(&request("/auth/login", Some(&token), None))
                .await,
            to_landing()
        );
    }

    #[tokio::test]
    async fn missing_secret_redirects_every_protected_request() {
        let gate = gate(Arc::new(HmacVerifier::new(None)));
        let token = sign(Utc::now().timestamp() + 3600, SECRET);

        for path in ["/", "/home", "/meals/new", "/history", "/settings"] {
            for (access, refresh) in [
                (None, None),
                (Some(token.as_str()), None),
                (None, Some(token.as_str())),
                (Some(token.as_str()), Some(token.as_str())),
            ] {
                assert_eq!(
                    gate.evaluate(&request(path, access, refresh)).await,
                    to_login(),
                    "path={path}"
                );
            }
        }
        // public-only and unrestricted routes still pass
        assert_eq!(
            gate.evaluate(&request("/auth/login", Some(&token), None))
                .await,
            Decision::Pass
        );
        assert_eq!(
            gate.evaluate(&request("/api/meals", None, None)).await,
            Decision::Pass
        );
    }
}
