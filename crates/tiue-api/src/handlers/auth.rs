//! Directory proxy handlers under `/api/auth`

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tiue_db::{DirectoryIdentity, SessionRepository, UserRepository};
use tiue_directory::{
    students::split_profile_name, CourseListQuery, Credentials, ImageUpload, ProfileSummary,
    TokenPair,
};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiResponse, AppState, BearerToken, JsonBody, QueryParams};

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "can't be blank"))]
    pub username: String,
    #[validate(length(min = 1, message = "can't be blank"))]
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Raw directory profile, `null` when it could not be fetched
    pub user: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ServiceStatus {
    status: &'static str,
    message: &'static str,
    version: &'static str,
}

/// GET /api/auth/test
pub async fn test() -> impl IntoResponse {
    Json(ServiceStatus {
        status: "ok",
        message: "Directory API proxy is running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    body.validate()?;
    let credentials = Credentials {
        username: body.username.trim().to_string(),
        password: body.password,
    };

    tracing::info!(username = %credentials.username, "Login attempt");
    let tokens = state
        .directory
        .login(&credentials)
        .await
        .map_err(ApiError::from_token_exchange)?;

    let profile = match state.directory.get_profile(&tokens.access_token).await {
        Ok(profile) => Some(profile),
        Err(e) => {
            tracing::warn!(username = %credentials.username, error = %e, "Profile fetch after login failed");
            None
        }
    };

    open_session(&state, &credentials.username, profile.as_ref(), &tokens).await;
    tracing::info!(username = %credentials.username, "Login succeeded");

    Ok(ApiResponse::ok(LoginResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user: profile,
    }))
}

/// Mirror the account locally and remember the token pair.
/// Failures are logged; the directory login stays valid without them.
async fn open_session(state: &AppState, username: &str, profile: Option<&Value>, tokens: &TokenPair) {
    let Some(pool) = state.db.as_ref() else {
        return;
    };

    let identity = identity_from_profile(
        username,
        profile,
        state.config.auth.is_admin(username),
    );

    let user = match UserRepository::new(pool.clone())
        .upsert_from_directory(&identity)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(username, error = %e, "Failed to store local user");
            return;
        }
    };

    if let Err(e) = SessionRepository::new(pool.clone())
        .create(
            user.id,
            &tokens.access_token,
            &tokens.refresh_token,
            state.config.auth.session_ttl_hours,
        )
        .await
    {
        tracing::error!(username, error = %e, "Failed to store session");
    }
}

pub fn identity_from_profile(
    username: &str,
    profile: Option<&Value>,
    admin: bool,
) -> DirectoryIdentity {
    let summary = profile.map(ProfileSummary::from_profile).unwrap_or_default();
    let (first_name, last_name) = summary
        .full_name
        .as_deref()
        .map(split_profile_name)
        .map(|(first, last)| (Some(first), Some(last)))
        .unwrap_or((None, None));

    DirectoryIdentity {
        username: username.to_string(),
        email: summary.email.filter(|e| !e.trim().is_empty()),
        first_name: first_name.filter(|n| !n.is_empty()),
        last_name: last_name.filter(|n| !n.is_empty()),
        admin,
    }
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let old_refresh = body
        .refresh_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Refresh token required"))?;

    let tokens = state
        .directory
        .refresh_token(&old_refresh)
        .await
        .map_err(ApiError::from_token_exchange)?;

    if let Some(pool) = state.db.as_ref() {
        match SessionRepository::new(pool.clone())
            .rotate(
                &old_refresh,
                &tokens.access_token,
                &tokens.refresh_token,
                state.config.auth.session_ttl_hours,
            )
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::debug!("Refreshed token has no local session"),
            Err(e) => tracing::error!(error = %e, "Failed to rotate session"),
        }
    }

    Ok(ApiResponse::ok(tokens))
}

/// GET|POST /api/auth/profile, GET /api/auth/me
pub async fn profile(
    token: BearerToken,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let profile = state.directory.get_profile(&token).await?;
    Ok(ApiResponse::ok(profile))
}

/// GET /api/auth/courses
pub async fn courses(
    token: BearerToken,
    State(state): State<AppState>,
    QueryParams(query): QueryParams<CourseListQuery>,
) -> ApiResult<impl IntoResponse> {
    let courses = state.directory.get_courses(&token, &query).await?;
    Ok(ApiResponse::ok(courses))
}

/// GET /api/auth/grades
pub async fn grades(
    token: BearerToken,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let grades = state.directory.get_grades(&token).await?;
    Ok(ApiResponse::ok(grades))
}

/// GET /api/auth/attendance
pub async fn attendance(
    token: BearerToken,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let attendance = state.directory.get_attendance(&token).await?;
    Ok(ApiResponse::ok(attendance))
}

/// POST /api/auth/messages
pub async fn messages(
    token: BearerToken,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let messages = state.directory.get_messages(&token).await?;
    Ok(ApiResponse::ok(messages))
}

/// POST /api/auth/upload
pub async fn upload(
    token: BearerToken,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<impl IntoResponse> {
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let image = read_image_field(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::bad_request("No image file provided"))?;

    let result = state.directory.upload_image(&token, image).await?;
    Ok(ApiResponse::ok(result))
}

async fn read_image_field(multipart: &mut Multipart) -> ApiResult<Option<ImageUpload>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("image").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        return Ok(Some(ImageUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

#[derive(Debug, Serialize)]
struct LogoutResponse {
    message: &'static str,
}

/// POST /api/auth/logout
pub async fn logout(
    token: BearerToken,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    if let Some(pool) = state.db.as_ref() {
        let removed = SessionRepository::new(pool.clone()).delete(&token).await?;
        tracing::debug!(removed, "Session closed");
    }
    Ok(ApiResponse::ok(LogoutResponse {
        message: "Logged out",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_from_profile_splits_surname_first() {
        let profile = json!({"full_name": "SULAYMONOVA SABINA", "email": "s@tiue.uz"});
        let identity = identity_from_profile("U22312", Some(&profile), false);
        assert_eq!(identity.username, "U22312");
        assert_eq!(identity.first_name.as_deref(), Some("Sabina"));
        assert_eq!(identity.last_name.as_deref(), Some("Sulaymonova"));
        assert_eq!(identity.email.as_deref(), Some("s@tiue.uz"));
        assert!(!identity.admin);
    }

    #[test]
    fn test_identity_without_profile_keeps_username_only() {
        let identity = identity_from_profile("U1", None, true);
        assert_eq!(identity.first_name, None);
        assert_eq!(identity.email, None);
        assert!(identity.admin);
    }

    #[test]
    fn test_login_request_rejects_blank_fields() {
        let request = LoginRequest {
            username: String::new(),
            password: "x".into(),
        };
        let err: ApiError = request.validate().unwrap_err().into();
        assert_eq!(err.message(), "username can't be blank");
    }
}
