//! Axum glue for the session gate: read the cookies, evaluate, and either
//! continue down the stack or answer with a redirect.

use axum::extract::{Request, State};
use axum::http::uri::PathAndQuery;
use axum::http::{StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::warn;

use super::{canonical_path, Decision, GateRequest};
use crate::config::CookieConfig;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Middleware entry point, installed with `axum::middleware::from_fn_with_state`.
///
/// The request is classified by its canonical path, and a passed request
/// continues with that path, so the upstream never serves a different page
/// than the one the gate checked.
pub async fn session_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let cookies = &state.config.cookies;
    let path = match canonical_path(request.uri().path()) {
        Ok(path) => path,
        Err(e) => {
            warn!(path = request.uri().path(), "Refusing request path: {}", e);
            return HTTPError::new(StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };
    if path != request.uri().path() {
        match with_path(request.uri(), &path) {
            Some(uri) => *request.uri_mut() = uri,
            None => {
                return HTTPError::new(StatusCode::BAD_REQUEST, "invalid request path")
                    .into_response()
            }
        }
    }

    let gate_request = GateRequest {
        path: &path,
        access_token: jar.get(&cookies.access).map(Cookie::value),
        refresh_token: jar.get(&cookies.refresh).map(Cookie::value),
    };

    match state.gate.evaluate(&gate_request).await {
        Decision::Pass => next.run(request).await,
        Decision::Redirect {
            target,
            clear_cookies,
        } => redirect_response(&target, clear_cookies.then_some(cookies)),
    }
}

/// `uri` with its path replaced, query kept.
fn with_path(uri: &Uri, path: &str) -> Option<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_owned(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

/// A 307 to `target`. With `clear`, both session cookies are expired as well.
pub fn redirect_response(target: &str, clear: Option<&CookieConfig>) -> Response {
    let redirect = Redirect::temporary(target);
    match clear {
        Some(cookies) => {
            let jar = CookieJar::new()
                .add(removal_cookie(&cookies.access))
                .add(removal_cookie(&cookies.refresh));
            (jar, redirect).into_response()
        }
        None => redirect.into_response(),
    }
}

fn removal_cookie(name: &str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name.to_owned(), "")).path("/").build();
    cookie.make_removal();
    cookie
}
