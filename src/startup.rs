//! Application startup and server initialization.
//!
//! Builds the session gate, the upstream client and the router from the
//! configuration, then serves until the listener fails.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ConfigV1;
use crate::gate::{RouteTable, SessionGate};
use crate::metrics::Metrics;
use crate::proxy::Upstream;
use crate::routes;
use crate::state::AppState;
use crate::verifier::HmacVerifier;

/// Assembles the shared state. A missing JWT secret is not an error here:
/// the verifier then rejects every token.
pub fn build_state(config: Arc<ConfigV1>) -> Result<AppState, Box<dyn std::error::Error>> {
    let metrics = Metrics::new();
    let routes = RouteTable::new(&config.routes)?;
    let verifier = Arc::new(HmacVerifier::from_config(&config.jwt));
    let gate = Arc::new(SessionGate::new(routes, verifier, metrics.clone()));
    let upstream = Arc::new(Upstream::new(&config.upstream)?);

    Ok(AppState {
        config,
        gate,
        upstream,
        metrics,
    })
}

/// Initializes and runs the application server.
///
/// # Errors
///
/// Returns an error if the state cannot be built, the server fails to bind
/// to the configured address, or serving fails.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(config.clone())?;
    let app = routes::create_router(state);

    info!(
        "Starting server on {}, forwarding to {}",
        config.bind_address, config.upstream.url
    );
    let listener = TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
