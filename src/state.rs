//! Shared application state.

use crate::config::ConfigV1;
use crate::gate::SessionGate;
use crate::metrics::Metrics;
use crate::proxy::Upstream;
use std::sync::Arc;

/// Application state shared across all HTTP handlers and the gate middleware.
///
/// Cloned per request; everything inside is immutable or internally synchronized.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Route classification and token verification.
    pub gate: Arc<SessionGate>,
    /// Client for the page server that passed requests go to.
    pub upstream: Arc<Upstream>,
    /// Prometheus registry shared by the gate and the proxy.
    pub metrics: Metrics,
}
