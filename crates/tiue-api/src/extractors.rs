//! Axum extractors for API handlers

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tiue_core::config::AppConfig;
use tiue_db::{Pagination, SessionRepository, UserRow};
use tiue_directory::{DirectoryClient, StudentNormalizer};

use crate::error::{ApiError, ApiResult};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub directory: DirectoryClient,
    /// `None` when the server runs without a database
    pub db: Option<PgPool>,
}

impl AppState {
    pub fn new(config: AppConfig, directory: DirectoryClient, db: Option<PgPool>) -> Self {
        Self {
            config: Arc::new(config),
            directory,
            db,
        }
    }

    /// Database pool, or 503 when the local store is unavailable
    pub fn pool(&self) -> ApiResult<&PgPool> {
        self.db
            .as_ref()
            .ok_or_else(|| ApiError::service_unavailable("Local database is not available"))
    }

    pub fn normalizer(&self) -> StudentNormalizer {
        StudentNormalizer::new(self.config.students.course_reference_year)
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Directory access token taken verbatim from the request
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_bearer_token(parts)
            .map(|token| BearerToken(token.to_string()))
            .ok_or_else(|| ApiError::unauthorized("Bearer token required"))
    }
}

impl std::ops::Deref for BearerToken {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Local user resolved from the session of the bearer token
pub struct AuthenticatedUser(pub UserRow);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let app_state = AppState::from_ref(state);
        let pool = app_state.pool()?;

        SessionRepository::new(pool.clone())
            .find_user(&token)
            .await?
            .map(AuthenticatedUser)
            .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))
    }
}

impl AuthenticatedUser {
    pub fn require_admin(&self, action: &str) -> ApiResult<()> {
        if self.0.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "Only administrators can {}.",
                action
            )))
        }
    }
}

impl std::ops::Deref for AuthenticatedUser {
    type Target = UserRow;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Caller on public endpoints; anonymous when no valid session is presented
pub struct MaybeUser(pub Option<UserRow>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if extract_bearer_token(parts).is_none() {
            return Ok(MaybeUser(None));
        }
        match AuthenticatedUser::from_request_parts(parts, state).await {
            Ok(AuthenticatedUser(user)) => Ok(MaybeUser(Some(user))),
            Err(ApiError::Unauthorized(_)) => Ok(MaybeUser(None)),
            Err(e) => Err(e),
        }
    }
}

/// JSON body whose rejections use the error envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Query string whose rejections use the error envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// `?limit=&offset=` on list endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub struct Paging(pub Pagination);

#[async_trait]
impl<S> FromRequestParts<S> for Paging
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<ListParams>::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|_| Query(ListParams::default()));
        Ok(Paging(Pagination::new(params.limit, params.offset)))
    }
}

impl std::ops::Deref for Paging {
    type Target = Pagination;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Success envelope: `{"success": true, "data": ...}`
pub struct ApiResponse<T: Serialize> {
    status: StatusCode,
    data: T,
}

#[derive(Serialize)]
struct SuccessEnvelope<'a, T: Serialize> {
    success: bool,
    data: &'a T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = SuccessEnvelope {
            success: true,
            data: &self.data,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(&parts(Some("Bearer abc"))), Some("abc"));
        assert_eq!(extract_bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(extract_bearer_token(&parts(Some("Basic abc"))), None);
        assert_eq!(extract_bearer_token(&parts(None)), None);
    }

    #[tokio::test]
    async fn test_bearer_extractor_rejects_missing_token() {
        let mut parts = parts(None);
        let result = BearerToken::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }
}
