//! API error handling
//!
//! Every failure is answered with `{"success": false, "error": "..."}`.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tiue_core::error::ValidationErrors;
use tiue_db::{RegisterError, RepositoryError};
use tiue_directory::DirectoryError;
use tiue_models::RegistrationError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Validation(ValidationErrors),
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    Conflict(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    pub fn not_found(resource: &'static str, id: impl std::fmt::Display) -> Self {
        ApiError::NotFound(format!("{} with id {} not found", resource, id))
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::Validation(errors) => errors.full_messages().join(", "),
            ApiError::NotFound(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::ServiceUnavailable(msg)
            | ApiError::Internal(msg) => msg.clone(),
        }
    }

    /// Login and refresh treat every upstream 4xx as bad credentials
    pub fn from_token_exchange(err: DirectoryError) -> Self {
        match err.status() {
            Some(status) if status.is_client_error() => ApiError::Unauthorized(err.message()),
            _ => err.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status_code().as_u16(), self.message())
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorEnvelope {
            success: false,
            error: self.message(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        if err.is_unavailable() {
            return ApiError::ServiceUnavailable(err.message());
        }

        match err.status() {
            Some(status) if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN => {
                ApiError::Unauthorized(err.message())
            }
            Some(status) if status.is_client_error() => ApiError::BadRequest(err.message()),
            _ => ApiError::Internal(err.message()),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => ApiError::NotFound(msg),
            RepositoryError::Validation(msg) => ApiError::BadRequest(msg),
            RepositoryError::Conflict(msg) => ApiError::Conflict(msg),
            RepositoryError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                ApiError::internal("Internal server error")
            }
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::EventNotFound | RegistrationError::NotRegistered => {
                ApiError::NotFound(err.to_string())
            }
            RegistrationError::AlreadyRegistered | RegistrationError::CapacityReached => {
                ApiError::BadRequest(err.to_string())
            }
        }
    }
}

impl From<RegisterError> for ApiError {
    fn from(err: RegisterError) -> Self {
        match err {
            RegisterError::Rejected(reason) => reason.into(),
            RegisterError::Repository(e) => e.into(),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: StatusCode, body: &str) -> DirectoryError {
        DirectoryError::Http {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_directory_status_mapping() {
        let cases = [
            (StatusCode::UNAUTHORIZED, StatusCode::UNAUTHORIZED),
            (StatusCode::FORBIDDEN, StatusCode::UNAUTHORIZED),
            (StatusCode::NOT_FOUND, StatusCode::BAD_REQUEST),
            (StatusCode::UNPROCESSABLE_ENTITY, StatusCode::BAD_REQUEST),
            (StatusCode::INTERNAL_SERVER_ERROR, StatusCode::INTERNAL_SERVER_ERROR),
            (StatusCode::BAD_GATEWAY, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (upstream, expected) in cases {
            let err: ApiError = http(upstream, "{}").into();
            assert_eq!(err.status_code(), expected, "upstream {}", upstream);
        }
    }

    #[test]
    fn test_unavailable_is_503() {
        let err: ApiError = DirectoryError::Timeout.into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.message(), "Request timeout");

        let err: ApiError = DirectoryError::Connection("refused".into()).into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_invalid_json_is_500() {
        let err: ApiError = DirectoryError::InvalidJson.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_token_exchange_maps_any_4xx_to_401() {
        let err = ApiError::from_token_exchange(http(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Wrong password"}"#,
        ));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), "Wrong password");

        let err = ApiError::from_token_exchange(DirectoryError::Timeout);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_registration_mapping() {
        let full: ApiError = RegistrationError::CapacityReached.into();
        assert_eq!(full.status_code(), StatusCode::BAD_REQUEST);

        let missing: ApiError = RegistrationError::NotRegistered.into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_repository_mapping_hides_database_details() {
        let err: ApiError = RepositoryError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Internal server error");

        let err: ApiError = RepositoryError::Conflict("taken".into()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_validation_joins_messages() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "can't be blank");
        let err: ApiError = errors.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "title can't be blank");
    }
}
