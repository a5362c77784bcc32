//! User handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tiue_core::Id;
use tiue_db::{
    CreateUserDto, ProfessorProfileRow, Repository, StudentProfileRow, UpdateUserDto,
    UserRepository, UserRow,
};
use tiue_models::UserRole;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiResponse, AppState, AuthenticatedUser, JsonBody, Paging};
use crate::handlers::students::{absolute_url, avatar_url};

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Id,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub role: String,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_profile: Option<StudentProfileResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub professor_profile: Option<ProfessorProfileResponse>,
}

impl UserResponse {
    fn new(row: UserRow, public_base_url: &str) -> Self {
        Self {
            full_name: row.full_name(),
            avatar: row
                .avatar
                .filter(|a| !a.is_empty())
                .map(|a| absolute_url(public_base_url, &a)),
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            role: row.role,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            student_profile: None,
            professor_profile: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StudentProfileResponse {
    pub student_id: String,
    pub faculty: String,
    pub course: i32,
    pub group: Option<Id>,
    pub gpa: f64,
}

impl From<StudentProfileRow> for StudentProfileResponse {
    fn from(row: StudentProfileRow) -> Self {
        Self {
            student_id: row.student_id,
            faculty: row.faculty,
            course: row.course,
            group: row.group_id,
            gpa: row.gpa,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfessorProfileResponse {
    pub employee_id: String,
    pub department: String,
    pub title: String,
    pub subjects: Vec<String>,
}

impl From<ProfessorProfileRow> for ProfessorProfileResponse {
    fn from(row: ProfessorProfileRow) -> Self {
        Self {
            employee_id: row.employee_id,
            department: row.department,
            title: row.title,
            subjects: row.subjects,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 150, message = "must be between 1 and 150 characters"))]
    pub username: String,
    #[validate(email(message = "is not a valid email"))]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: UserRole,
    pub avatar: Option<String>,
    pub student_id: Option<String>,
    pub faculty: Option<String>,
    #[validate(range(min = 1, max = 6, message = "must be between 1 and 6"))]
    pub course: Option<i32>,
    pub group_id: Option<Id>,
    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
}

impl From<CreateUserRequest> for CreateUserDto {
    fn from(body: CreateUserRequest) -> Self {
        Self {
            username: body.username,
            email: body.email,
            first_name: body.first_name,
            last_name: body.last_name,
            role: body.role,
            avatar: body.avatar,
            student_id: body.student_id,
            faculty: body.faculty,
            course: body.course,
            group_id: body.group_id,
            employee_id: body.employee_id,
            department: body.department,
            title: body.title,
            subjects: body.subjects,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "is not a valid email"))]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub avatar: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    /// Role and activation are reserved for administrators
    fn check_allowed(&self, caller: &UserRow, target: Id) -> ApiResult<()> {
        if caller.is_admin() {
            return Ok(());
        }
        if caller.id != target {
            return Err(ApiError::forbidden("You can only update your own account."));
        }
        if self.role.is_some() || self.is_active.is_some() {
            return Err(ApiError::forbidden(
                "Only administrators can change roles or activation.",
            ));
        }
        Ok(())
    }
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    paging: Paging,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool()?;
    let rows = UserRepository::new(pool.clone())
        .find_all(paging.limit, paging.offset)
        .await?;

    let base = &state.config.server.public_base_url;
    let users: Vec<UserResponse> = rows
        .into_iter()
        .map(|row| UserResponse::new(row, base))
        .collect();
    Ok(ApiResponse::ok(users))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool()?;
    let repo = UserRepository::new(pool.clone());

    let row = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    let role = row.role();
    let mut response = UserResponse::new(row, &state.config.server.public_base_url);
    match role {
        UserRole::Student => {
            response.student_profile = repo.student_profile(id).await?.map(Into::into);
        }
        UserRole::Professor => {
            response.professor_profile = repo.professor_profile(id).await?.map(Into::into);
        }
        UserRole::Admin => {}
    }

    Ok(ApiResponse::ok(response))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    JsonBody(body): JsonBody<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin("create users")?;
    body.validate()?;

    let pool = state.pool()?;
    let row = UserRepository::new(pool.clone())
        .create(body.into())
        .await?;

    Ok(ApiResponse::created(UserResponse::new(
        row,
        &state.config.server.public_base_url,
    )))
}

/// PATCH|PUT /api/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    JsonBody(body): JsonBody<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    body.check_allowed(&user, id)?;
    body.validate()?;

    let pool = state.pool()?;
    let row = UserRepository::new(pool.clone())
        .update(
            id,
            UpdateUserDto {
                email: body.email,
                first_name: body.first_name,
                last_name: body.last_name,
                role: body.role,
                avatar: body.avatar,
                is_active: body.is_active,
            },
        )
        .await?;

    Ok(ApiResponse::ok(UserResponse::new(
        row,
        &state.config.server.public_base_url,
    )))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin("delete users")?;
    if user.id == id {
        return Err(ApiError::bad_request("You cannot delete your own account."));
    }

    let pool = state.pool()?;
    UserRepository::new(pool.clone()).delete(id).await?;

    tracing::info!(user_id = id, by = %user.username, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct AvatarResponse {
    username: String,
    avatar_url: String,
}

/// GET /api/users/avatar/:username
pub async fn get_avatar(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let avatar_url = avatar_url(&state, &username).await?;
    Ok(ApiResponse::ok(AvatarResponse {
        username,
        avatar_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: Id, role: &str) -> UserRow {
        UserRow {
            id,
            username: format!("u{}", id),
            email: format!("u{}@tiue.uz", id),
            first_name: "Ali".into(),
            last_name: "Karimov".into(),
            role: role.into(),
            avatar: Some("/media/avatars/u.png".into()),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_response_makes_avatar_absolute() {
        let response = UserResponse::new(row(1, "student"), "https://mobile.tiue.uz");
        assert_eq!(
            response.avatar.as_deref(),
            Some("https://mobile.tiue.uz/media/avatars/u.png")
        );
        assert_eq!(response.full_name, "Ali Karimov");
    }

    #[test]
    fn test_self_update_cannot_change_role() {
        let caller = row(5, "student");
        let body = UpdateUserRequest {
            first_name: Some("Vali".into()),
            ..Default::default()
        };
        assert!(body.check_allowed(&caller, 5).is_ok());
        assert!(matches!(
            body.check_allowed(&caller, 6),
            Err(ApiError::Forbidden(_))
        ));

        let promote = UpdateUserRequest {
            role: Some(UserRole::Admin),
            ..Default::default()
        };
        assert!(matches!(
            promote.check_allowed(&caller, 5),
            Err(ApiError::Forbidden(_))
        ));
        assert!(promote.check_allowed(&row(1, "admin"), 5).is_ok());
    }

    #[test]
    fn test_create_request_validates_email() {
        let body: CreateUserRequest = serde_json::from_str(
            r#"{"username":"p1","email":"not-an-email","role":"professor"}"#,
        )
        .unwrap();
        let err: ApiError = body.validate().unwrap_err().into();
        assert_eq!(err.message(), "email is not a valid email");
    }

    #[test]
    fn test_create_request_maps_profile_fields() {
        let body: CreateUserRequest = serde_json::from_str(
            r#"{"username":"s1","email":"s1@tiue.uz","student_id":"S1","faculty":"IT","course":2,"group_id":3}"#,
        )
        .unwrap();
        let dto: CreateUserDto = body.into();
        assert_eq!(dto.role, UserRole::Student);
        assert!(dto.missing_profile_fields().is_empty());
    }
}
