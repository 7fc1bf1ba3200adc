use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Static route classification tables for the session gate.
///
/// - `public_only`: exact paths only anonymous users should see (login, signup).
/// - `protected_exact` / `protected_prefixes`: paths requiring a valid session.
///   A prefix covers itself and everything below it.
/// - `unrestricted_prefixes`: never gated, checked before everything else.
/// - `login` / `landing`: redirect targets for anonymous and signed-in users.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct RoutesConfig {
    #[serde(default = "default_login")]
    pub login: String,
    #[serde(default = "default_landing")]
    pub landing: String,
    #[serde(default = "default_public_only")]
    pub public_only: Vec<String>,
    #[serde(default = "default_protected_exact")]
    pub protected_exact: Vec<String>,
    #[serde(default = "default_protected_prefixes")]
    pub protected_prefixes: Vec<String>,
    #[serde(default = "default_unrestricted_prefixes")]
    pub unrestricted_prefixes: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        RoutesConfig {
            login: default_login(),
            landing: default_landing(),
            public_only: default_public_only(),
            protected_exact: default_protected_exact(),
            protected_prefixes: default_protected_prefixes(),
            unrestricted_prefixes: default_unrestricted_prefixes(),
        }
    }
}

fn default_login() -> String {
    "/auth/login".to_string()
}

fn default_landing() -> String {
    "/home".to_string()
}

fn default_public_only() -> Vec<String> {
    vec!["/auth/login".to_string(), "/auth/signup".to_string()]
}

fn default_protected_exact() -> Vec<String> {
    vec!["/".to_string()]
}

fn default_protected_prefixes() -> Vec<String> {
    ["/home", "/meals", "/history", "/settings"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_unrestricted_prefixes() -> Vec<String> {
    [
        "/api",
        "/_next/static",
        "/_next/image",
        "/.well-known",
        "/favicon.ico",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Names of the two session cookies.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct CookieConfig {
    #[serde(default = "default_access_cookie")]
    pub access: String,
    #[serde(default = "default_refresh_cookie")]
    pub refresh: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        CookieConfig {
            access: default_access_cookie(),
            refresh: default_refresh_cookie(),
        }
    }
}

fn default_access_cookie() -> String {
    "access_token".to_string()
}

fn default_refresh_cookie() -> String {
    "refresh_token".to_string()
}
