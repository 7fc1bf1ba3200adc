use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::proxy::ProxyError;

/// A general purpose HTTP error type that can be converted into an `IntoResponse`.
#[derive(Debug)]
pub struct HTTPError {
    status: StatusCode,
    message: String,
}

impl HTTPError {
    /// Creates a new HTTP error with the given status code and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        HTTPError {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Converts our `HTTPError` into a JSON error response.
impl IntoResponse for HTTPError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<ProxyError> for HTTPError {
    fn from(e: ProxyError) -> Self {
        let status = match e {
            ProxyError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Body(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) | ProxyError::Url(_) => StatusCode::BAD_GATEWAY,
        };
        HTTPError::new(status, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn renders_json_error_body() {
        let response = HTTPError::new(StatusCode::BAD_GATEWAY, "upstream down").into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({"error": "upstream down"}));
    }

    #[test]
    fn maps_proxy_errors_to_statuses() {
        assert_eq!(
            HTTPError::from(ProxyError::BodyTooLarge(10)).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            HTTPError::from(ProxyError::Url("bad".to_string())).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
