//! Directory client errors

use reqwest::StatusCode;
use thiserror::Error;

use crate::types::UpstreamErrorBody;

/// Errors produced while talking to the directory API
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The upstream did not answer within the configured timeout
    #[error("Request timeout")]
    Timeout,

    /// DNS, TCP or TLS failure before a response was received
    #[error("Connection error: {0}")]
    Connection(String),

    /// A 200 response whose body is not JSON
    #[error("Invalid JSON response from directory server")]
    InvalidJson,

    /// A JSON response missing fields this backend relies on
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// Any non-200 response
    #[error("HTTP {status}")]
    Http { status: StatusCode, body: String },

    /// Only GET and POST are sent upstream
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// Other transport failures (body read errors, invalid multipart parts)
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to build directory client: {0}")]
    Build(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

impl DirectoryError {
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DirectoryError::Timeout
        } else if err.is_connect() {
            DirectoryError::Connection(err.to_string())
        } else {
            DirectoryError::Request(err.to_string())
        }
    }

    /// Timeout or connection failure, i.e. the directory is unavailable
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DirectoryError::Timeout | DirectoryError::Connection(_))
    }

    /// Upstream status code, when a response was received
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DirectoryError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Best-effort human readable message for API clients
    pub fn message(&self) -> String {
        match self {
            DirectoryError::Http { status, body } => {
                serde_json::from_str::<UpstreamErrorBody>(body)
                    .ok()
                    .and_then(UpstreamErrorBody::into_message)
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
            }
            DirectoryError::Connection(_) => "Connection error".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_prefers_upstream_error_field() {
        let err = DirectoryError::Http {
            status: StatusCode::UNAUTHORIZED,
            body: r#"{"error":"Invalid credentials"}"#.to_string(),
        };
        assert_eq!(err.message(), "Invalid credentials");
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_message_falls_back_to_status() {
        let err = DirectoryError::Http {
            status: StatusCode::BAD_GATEWAY,
            body: "<html>bad gateway</html>".to_string(),
        };
        assert_eq!(err.message(), "HTTP 502");
    }

    #[test]
    fn test_unavailable_classification() {
        assert!(DirectoryError::Timeout.is_unavailable());
        assert!(DirectoryError::Connection("refused".into()).is_unavailable());
        assert!(!DirectoryError::InvalidJson.is_unavailable());
        assert_eq!(DirectoryError::Timeout.message(), "Request timeout");
    }
}
