#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use sessiongate::config::{extract_config, ConfigV1};
use sessiongate::routes::create_router;
use sessiongate::startup::build_state;

pub const TEST_SECRET: &str = "test-secret";
pub const FUTURE_EXP: i64 = 4_102_444_800; // Far in the future to avoid flakiness.

/// Test config pointing at `upstream_url`. `jwt_block` is spliced in verbatim
/// so tests can choose between an inline secret and an unset environment variable.
pub fn build_config(upstream_url: &str, jwt_block: &str) -> ConfigV1 {
    let yaml = format!(
        r#"
version: "1.0.0"
bind_address: 127.0.0.1:8090
upstream:
  url: "{upstream_url}"
  timeout_in_ms: 2000
  max_body_bytes: 1024
{jwt_block}
logging:
  level: "warn"
  format: "json"
"#
    );

    extract_config(&Figment::new().merge(Yaml::string(&yaml)))
        .expect("Failed to parse integration test config")
}

pub fn with_secret() -> &'static str {
    "jwt:\n  secret: test-secret"
}

pub fn without_secret() -> &'static str {
    "jwt:\n  secret_env: SESSIONGATE_TEST_SECRET_THAT_IS_NEVER_SET"
}

pub fn build_app(config: ConfigV1) -> Router {
    let state = build_state(Arc::new(config)).expect("state should build");
    create_router(state)
}

pub fn sign_claims(claims: &serde_json::Value, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to create token")
}

pub fn sign_token(exp: i64, token_type: &str, secret: &str) -> String {
    sign_claims(
        &json!({"exp": exp, "token_type": token_type, "user_id": 1, "jti": "abc"}),
        secret,
    )
}

pub fn valid_access() -> String {
    sign_token(FUTURE_EXP, "access", TEST_SECRET)
}

pub fn valid_refresh() -> String {
    sign_token(FUTURE_EXP, "refresh", TEST_SECRET)
}

pub fn expired_access() -> String {
    sign_token(Utc::now().timestamp() - 60, "access", TEST_SECRET)
}

pub fn request(path: &str, cookies: &[(&str, &str)], method: Method) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if !cookies.is_empty() {
        let header = cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        builder = builder.header("Cookie", header);
    }
    builder.body(Body::empty()).expect("failed to build request")
}

pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().expect("set-cookie not UTF-8").to_string())
        .collect()
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    String::from_utf8(bytes.to_vec()).expect("body not UTF-8")
}
