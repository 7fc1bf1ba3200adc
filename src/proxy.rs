//! Forwarding of passed requests to the upstream page server.

use std::time::Duration;

use axum::body::{self, Body};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Uri};
use axum::response::Response;
use reqwest::Url;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::metrics::MetricsRecorder;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),
    #[error("failed to read request body: {0}")]
    Body(String),
    #[error("invalid upstream url: {0}")]
    Url(String),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

/// HTTP client bound to one upstream base url.
pub struct Upstream {
    client: reqwest::Client,
    base: Url,
    max_body_bytes: usize,
}

impl Upstream {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ProxyError> {
        let base = Url::parse(&config.url).map_err(|e| ProxyError::Url(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_in_ms))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            base,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Joins the incoming path and query onto the base url, keeping any base path.
    pub fn target_url(&self, uri: &Uri) -> Url {
        let mut url = self.base.clone();
        let base_path = self.base.path().trim_end_matches('/');
        url.set_path(&format!("{}{}", base_path, uri.path()));
        url.set_query(uri.query());
        url
    }

    pub async fn forward(&self, request: Request) -> Result<Response, ProxyError> {
        let (parts, body) = request.into_parts();

        let declared_length = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared_length.is_some_and(|len| len > self.max_body_bytes) {
            return Err(ProxyError::BodyTooLarge(self.max_body_bytes));
        }
        let bytes = body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| ProxyError::Body(e.to_string()))?;

        let url = self.target_url(&parts.uri);
        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);

        debug!("Forwarding {} {} upstream", parts.method, url);
        let upstream_response = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(bytes)
            .send()
            .await?;

        let status = upstream_response.status();
        let mut headers = upstream_response.headers().clone();
        strip_hop_by_hop(&mut headers);
        let bytes = upstream_response.bytes().await?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Fallback handler: every request the gate lets through ends up here.
pub async fn forward_to_upstream(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, HTTPError> {
    match state.upstream.forward(request).await {
        Ok(response) => {
            state.metrics.record_upstream_request("ok");
            Ok(response)
        }
        Err(e) => {
            state.metrics.record_upstream_request("error");
            warn!("Upstream forwarding failed: {}", e);
            Err(e.into())
        }
    }
}
