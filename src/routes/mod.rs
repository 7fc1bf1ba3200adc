//! HTTP route definitions.
//!
//! Two local endpoints (health and metrics); everything else falls through to
//! the upstream page server. The session gate wraps the whole router.

mod health_routes;
mod metrics_routes;

use axum::{middleware, Router};

use crate::gate::middleware::session_gate;
use crate::proxy::forward_to_upstream;
use crate::state::AppState;

/// Creates the application router with all configured routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes::routes())
        .merge(metrics_routes::routes())
        .fallback(forward_to_upstream)
        .layer(middleware::from_fn_with_state(state.clone(), session_gate))
        .with_state(state)
}
