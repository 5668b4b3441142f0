//! Gateway error taxonomy.
//!
//! # Responsibilities
//! - Name every way a forwarded request can fail
//! - Group failures into coarse kinds the retry classifiers inspect
//! - Map failures onto the HTTP status returned to the caller
//!
//! # Design Decisions
//! - Classifiers look at `kind()`, never at message text
//! - Validation failures are raised before any backend is contacted
//! - Every terminal failure maps to an explicit 4xx/5xx status

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

/// Result alias used across the gateway.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Boxed transport error, as produced by hyper and http-body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Bad argument, request or configuration. Never retried.
    Validation,
    /// The resolver could not produce an endpoint.
    Resolution,
    /// Client construction, connection or send failure.
    Transport,
    /// The backend did not answer in time.
    Timeout,
    /// The backend answered 503 Service Unavailable.
    UpstreamUnavailable,
    /// The caller went away or the gateway is shutting down.
    Cancelled,
}

impl FailureKind {
    /// Stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::Resolution => "resolution",
            FailureKind::Transport => "transport",
            FailureKind::Timeout => "timeout",
            FailureKind::UpstreamUnavailable => "upstream_unavailable",
            FailureKind::Cancelled => "cancelled",
        }
    }
}

/// Errors raised while dispatching a request through the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unrecognized request. The gateway is not configured to handle {path}")]
    NoRoute { path: String },

    #[error("cannot derive partition key: {0}")]
    PartitionKey(String),

    #[error("request body exceeds the {limit} byte limit")]
    BodyTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    RequestBody(String),

    #[error("cannot resolve {service}: {reason}")]
    Resolution { service: String, reason: String },

    #[error("cannot create client for {endpoint}: {reason}")]
    ClientBuild { endpoint: String, reason: String },

    #[error("connection to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("request to {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },

    #[error("{endpoint} reported service unavailable")]
    UpstreamUnavailable { endpoint: String },

    #[error("request was cancelled")]
    Cancelled,
}

impl GatewayError {
    /// Shorthand for a resolution failure.
    pub fn resolution(service: impl Into<String>, reason: impl Into<String>) -> Self {
        GatewayError::Resolution {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Coarse category of this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            GatewayError::InvalidArgument(_)
            | GatewayError::NoRoute { .. }
            | GatewayError::PartitionKey(_)
            | GatewayError::BodyTooLarge { .. }
            | GatewayError::RequestBody(_) => FailureKind::Validation,
            GatewayError::Resolution { .. } => FailureKind::Resolution,
            GatewayError::ClientBuild { .. }
            | GatewayError::Connect { .. }
            | GatewayError::Transport { .. } => FailureKind::Transport,
            GatewayError::Timeout { .. } => FailureKind::Timeout,
            GatewayError::UpstreamUnavailable { .. } => FailureKind::UpstreamUnavailable,
            GatewayError::Cancelled => FailureKind::Cancelled,
        }
    }

    /// True for connection-level failures (refused, reset before a response).
    pub fn is_connect(&self) -> bool {
        matches!(self, GatewayError::Connect { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayError::Cancelled)
    }

    /// Status code returned to the caller when this failure is terminal.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidArgument(_)
            | GatewayError::NoRoute { .. }
            | GatewayError::PartitionKey(_)
            | GatewayError::RequestBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Resolution { .. }
            | GatewayError::UpstreamUnavailable { .. }
            | GatewayError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::ClientBuild { .. }
            | GatewayError::Connect { .. }
            | GatewayError::Transport { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Machine-readable error code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::InvalidArgument(_) => "INVALID_ARGUMENT",
            GatewayError::NoRoute { .. } => "UNRECOGNIZED_REQUEST",
            GatewayError::PartitionKey(_) => "INVALID_PARTITION_KEY",
            GatewayError::BodyTooLarge { .. } => "REQUEST_TOO_LARGE",
            GatewayError::RequestBody(_) => "INVALID_REQUEST_BODY",
            GatewayError::Resolution { .. } => "RESOLUTION_FAILED",
            GatewayError::ClientBuild { .. } | GatewayError::Connect { .. } => "CONNECTION_ERROR",
            GatewayError::Transport { .. } => "UPSTREAM_ERROR",
            GatewayError::Timeout { .. } => "UPSTREAM_TIMEOUT",
            GatewayError::UpstreamUnavailable { .. } => "SERVICE_UNAVAILABLE",
            GatewayError::Cancelled => "CANCELLED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_statuses() {
        let unavailable = GatewayError::UpstreamUnavailable {
            endpoint: "http://10.0.0.5:8080/".into(),
        };
        assert_eq!(unavailable.kind(), FailureKind::UpstreamUnavailable);
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let timeout = GatewayError::Timeout {
            endpoint: "http://10.0.0.5:8080/".into(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(timeout.kind(), FailureKind::Timeout);
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let resolution = GatewayError::resolution("fabric:/app/svc", "unknown service");
        assert_eq!(resolution.kind(), FailureKind::Resolution);
        assert!(resolution.status_code().is_server_error());

        let bad_key = GatewayError::PartitionKey("empty path".into());
        assert_eq!(bad_key.kind(), FailureKind::Validation);
        assert_eq!(bad_key.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_terminal_transport_failures_are_server_errors() {
        let build = GatewayError::ClientBuild {
            endpoint: "ftp://host/".into(),
            reason: "unsupported scheme".into(),
        };
        assert!(build.status_code().is_server_error());
        assert_eq!(build.code(), "CONNECTION_ERROR");
    }
}
