use std::collections::HashSet;

use crate::config::{ConfigError, RoutesConfig};

/// Which gate rule applies to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Only for visitors without a session (login, signup).
    PublicOnly,
    /// Requires a valid session.
    Protected,
    /// Never gated.
    Unrestricted,
}

impl RouteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::PublicOnly => "public_only",
            RouteClass::Protected => "protected",
            RouteClass::Unrestricted => "unrestricted",
        }
    }
}

/// Immutable lookup tables built from `RoutesConfig`.
///
/// Construction rejects configurations where a path could fall into more
/// than one class, so `classify` is total and unambiguous.
#[derive(Debug, Clone)]
pub struct RouteTable {
    login: String,
    landing: String,
    public_only: HashSet<String>,
    protected_exact: HashSet<String>,
    protected_prefixes: Vec<String>,
    unrestricted_prefixes: Vec<String>,
}

impl RouteTable {
    pub fn new(config: &RoutesConfig) -> Result<Self, ConfigError> {
        let table = RouteTable {
            login: normalize_route(&config.login)?,
            landing: normalize_route(&config.landing)?,
            public_only: normalize_all(&config.public_only)?.into_iter().collect(),
            protected_exact: normalize_all(&config.protected_exact)?.into_iter().collect(),
            protected_prefixes: normalize_all(&config.protected_prefixes)?,
            unrestricted_prefixes: normalize_all(&config.unrestricted_prefixes)?,
        };
        table.check_disjoint()?;

        if table.classify(&table.login) != RouteClass::PublicOnly {
            return Err(ConfigError::LoginNotPublic(table.login.clone()));
        }
        if table.classify(&table.landing) != RouteClass::Protected {
            return Err(ConfigError::LandingNotProtected(table.landing.clone()));
        }
        Ok(table)
    }

    /// Where anonymous visitors to protected routes are sent.
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Where signed-in visitors to public-only routes are sent.
    pub fn landing(&self) -> &str {
        &self.landing
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        let path = trim_trailing_slash(path);
        if self.is_unrestricted(path) {
            RouteClass::Unrestricted
        } else if self.public_only.contains(path) {
            RouteClass::PublicOnly
        } else if self.is_protected(path) {
            RouteClass::Protected
        } else {
            RouteClass::Unrestricted
        }
    }

    fn is_unrestricted(&self, path: &str) -> bool {
        self.unrestricted_prefixes
            .iter()
            .any(|prefix| under_prefix(path, prefix))
    }

    fn is_protected(&self, path: &str) -> bool {
        self.protected_exact.contains(path)
            || self
                .protected_prefixes
                .iter()
                .any(|prefix| under_prefix(path, prefix))
    }

    fn check_disjoint(&self) -> Result<(), ConfigError> {
        for path in &self.public_only {
            if self.is_protected(path) {
                return Err(ConfigError::OverlappingRoutes(format!(
                    "public-only path '{}' is also protected",
                    path
                )));
            }
            if self.is_unrestricted(path) {
                return Err(ConfigError::OverlappingRoutes(format!(
                    "public-only path '{}' is shadowed by an unrestricted prefix",
                    path
                )));
            }
        }
        for path in self.protected_exact.iter().chain(&self.protected_prefixes) {
            if self.is_unrestricted(path) {
                return Err(ConfigError::OverlappingRoutes(format!(
                    "protected path '{}' is shadowed by an unrestricted prefix",
                    path
                )));
            }
        }
        Ok(())
    }
}

/// `prefix` covers the path itself and anything below it, but not siblings
/// that merely share the leading characters (`/home` vs `/homework`).
fn under_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

fn normalize_route(route: &str) -> Result<String, ConfigError> {
    if !route.starts_with('/') {
        return Err(ConfigError::InvalidRoute(route.to_string()));
    }
    Ok(trim_trailing_slash(route).to_string())
}

fn normalize_all(routes: &[String]) -> Result<Vec<String>, ConfigError> {
    routes.iter().map(|r| normalize_route(r)).collect()
}
