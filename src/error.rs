//! Error types for rPDU-Exporter
//!
//! This module defines the error types used throughout the application.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::rpc::RequestId;

/// Errors raised by the bulk JSON-RPC layer
#[derive(Error, Debug)]
pub enum RpcError {
    /// HTTP 클라이언트 초기화 실패
    #[error("Failed to initialize HTTP client: {0}")]
    ClientInit(#[source] reqwest::Error),

    /// 타임아웃
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// 연결 실패 (TLS 검증 실패 포함)
    #[error("Connection failed: {0}")]
    Connect(String),

    /// HTTP 요청 실패
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[source] reqwest::Error),

    /// HTTP 응답 읽기 실패
    #[error("Failed to read HTTP response: {0}")]
    HttpResponse(#[source] reqwest::Error),

    /// HTTP 상태 코드 에러
    #[error("HTTP error status: {0}")]
    HttpStatus(u16),

    /// 잘못된 엔드포인트 URL
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// JSON 파싱 에러
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// JSON-RPC 프로토콜 위반 (top-level error, missing keys, no responses)
    #[error("JSON-RPC error: {0}")]
    Protocol(String),

    /// 단일 요청 id에 대해 복수의 응답 반환
    #[error("Multiple responses returned in response object for id: {0}")]
    MultiResponse(RequestId),
}

impl RpcError {
    /// Whether this failure happened below the JSON-RPC protocol layer.
    ///
    /// Transport failures become an empty-reply sentinel so the caller can
    /// decide; protocol failures always raise.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RpcError::Timeout(_)
                | RpcError::Connect(_)
                | RpcError::HttpRequest(_)
                | RpcError::HttpResponse(_)
                | RpcError::HttpStatus(_)
        )
    }

    /// Whether the endpoint could not be reached at all.
    pub fn is_connect(&self) -> bool {
        matches!(self, RpcError::Connect(_))
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RpcError::Timeout(err)
        } else if err.is_connect() {
            RpcError::Connect(err.to_string())
        } else if err.is_request() {
            RpcError::HttpRequest(err)
        } else {
            RpcError::HttpResponse(err)
        }
    }
}

/// Errors raised while assembling the PDU object graph
#[derive(Error, Debug)]
pub enum ModelError {
    /// Sensor exposes an interface outside the known gauge/counter families
    #[error("Unusable interface '{interface}' for sensor '{rid}'")]
    UnknownInterface { rid: String, interface: String },

    /// Metric added to a family with a different name or kind.
    /// Signals a metric-naming collision bug, not a runtime condition.
    #[error("Metric '{metric}' cannot be added to family '{family}'")]
    MetricMismatch { family: String, metric: String },
}

/// Discovery error: either the RPC layer or the model layer failed
#[derive(Error, Debug)]
pub enum PduError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl PduError {
    /// Whether the PDU could not be reached at all (as opposed to
    /// answering and then failing mid-discovery).
    pub fn is_connect(&self) -> bool {
        matches!(self, PduError::Rpc(e) if e.is_connect())
    }
}

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Bulk RPC error
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Object graph error
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, public_message, log_message) = match self {
            AppError::Config(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error",
                e.to_string(),
            ),
            AppError::Rpc(e) => (StatusCode::BAD_GATEWAY, "Upstream error", e.to_string()),
            AppError::Model(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Model error",
                e.to_string(),
            ),
            AppError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error", e),
        };

        tracing::error!(status = %status, error = %log_message, "Request failed");

        (status, public_message).into_response()
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(RpcError::Connect("refused".to_string()).is_transport());
        assert!(RpcError::HttpStatus(502).is_transport());
        assert!(!RpcError::Protocol("no responses returned".to_string()).is_transport());
        assert!(!RpcError::JsonParse("bad body".to_string()).is_transport());
        assert!(!RpcError::MultiResponse(RequestId::Index(3)).is_transport());
    }

    #[test]
    fn test_connect_classification() {
        assert!(RpcError::Connect("refused".to_string()).is_connect());
        assert!(!RpcError::HttpStatus(404).is_connect());

        let err = PduError::from(RpcError::Connect("refused".to_string()));
        assert!(err.is_connect());
        let err = PduError::from(ModelError::UnknownInterface {
            rid: "r".to_string(),
            interface: "foo".to_string(),
        });
        assert!(!err.is_connect());
    }
}
