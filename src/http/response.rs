//! Error responses returned by the gateway itself.
//!
//! # Responsibilities
//! - Render terminal failures as JSON with a stable error code
//! - Map failures to 4xx/5xx status codes
//! - Correlate error bodies with the request ID
//!
//! # Design Decisions
//! - Backend responses are never rewritten here; only gateway-generated
//!   errors use this format
//! - Backend timeouts result in 504 Gateway Timeout

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::http::request::X_REQUEST_ID;

/// Standard error response format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable code for programmatic handling.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: None,
        }
    }

    pub fn from_error(error: &GatewayError) -> Self {
        Self::new(error.code(), error.to_string())
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Convert to an HTTP response, echoing the request ID header.
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        let request_id = self.request_id.clone();
        let mut response = (status, Json(self)).into_response();

        if let Some(id) = request_id {
            if let Ok(value) = HeaderValue::from_str(&id) {
                response.headers_mut().insert(X_REQUEST_ID, value);
            }
        }
        response
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        ErrorResponse::from_error(&self).into_response_with_status(self.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_error_body() {
        let error = GatewayError::NoRoute {
            path: "/nowhere".into(),
        };
        let response = ErrorResponse::from_error(&error)
            .with_request_id("req-1")
            .into_response_with_status(error.status_code());

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[X_REQUEST_ID], "req-1");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.code, "UNRECOGNIZED_REQUEST");
        assert!(parsed.message.contains("not configured"));
        assert_eq!(parsed.request_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn test_into_response_status() {
        let response = GatewayError::BodyTooLarge { limit: 10 }.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
