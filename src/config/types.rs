use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::logging::LoggingConfig;
use super::routes::{CookieConfig, RoutesConfig};
use crate::gate::RouteTable;

const CONFIG_PATH_ENV: &str = "SESSIONGATE_CONFIG";
const ENV_PREFIX: &str = "SESSIONGATE_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: listener, upstream page server, token secret,
/// cookie names, route tables and logging.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub bind_address: String,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub jwt: JWTConfig,
    #[serde(default)]
    pub cookies: CookieConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    pub logging: LoggingConfig,
}

/// Errors raised while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Figment(#[from] figment::Error),
    #[error("invalid logging.level '{0}'. Valid values: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
    #[error("invalid route '{0}': paths must start with '/'")]
    InvalidRoute(String),
    #[error("route tables overlap: {0}")]
    OverlappingRoutes(String),
    #[error("login route '{0}' must be listed as public-only")]
    LoginNotPublic(String),
    #[error("landing route '{0}' must be protected")]
    LandingNotProtected(String),
    #[error("invalid upstream url '{0}': {1}")]
    InvalidUpstream(String, String),
}

impl ConfigV1 {
    /// Checks everything serde cannot: log level, route table consistency and the upstream url.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logging.level_filter()?;
        RouteTable::new(&self.routes)?;
        reqwest::Url::parse(&self.upstream.url)
            .map_err(|e| ConfigError::InvalidUpstream(self.upstream.url.clone(), e.to_string()))?;
        Ok(())
    }
}

/// Builds the figment: the YAML file, then `SESSIONGATE_`-prefixed environment overrides.
pub fn figment() -> Figment {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "./config.yaml".to_string());
    Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"))
}

/// Extracts and validates a configuration from any figment.
pub fn extract_config(figment: &Figment) -> Result<ConfigV1, ConfigError> {
    let config = match figment.extract::<Config>()? {
        Config::ConfigV1(c) => c,
    };
    config.validate()?;
    Ok(config)
}

/// Load the configuration, exiting the process if it is missing or invalid.
pub fn load_config() -> ConfigV1 {
    match extract_config(&figment()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// Where the HMAC secret for session tokens comes from.
///
/// An inline `secret` wins; otherwise the environment variable named by
/// `secret_env` is read. Empty values count as unset.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct JWTConfig {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
}

impl Default for JWTConfig {
    fn default() -> Self {
        JWTConfig {
            secret: None,
            secret_env: default_secret_env(),
        }
    }
}

fn default_secret_env() -> String {
    "JWT_SECRET_KEY".to_string()
}

impl JWTConfig {
    pub fn resolve_secret(&self) -> Option<String> {
        self.secret
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| {
                std::env::var(&self.secret_env)
                    .ok()
                    .filter(|s| !s.is_empty())
            })
    }
}

/// The page server that passed requests are forwarded to.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct UpstreamConfig {
    pub url: String,
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_timeout_in_ms() -> u64 {
    10_000
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}
