//! Student group handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tiue_core::Id;
use tiue_db::{CreateGroupDto, GroupRepository, GroupRow, Repository, UpdateGroupDto};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiResponse, AppState, AuthenticatedUser, JsonBody, Paging};

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: Id,
    pub name: String,
    pub faculty: String,
    pub course: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GroupRow> for GroupResponse {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            faculty: row.faculty,
            course: row.course,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 50, message = "must be between 1 and 50 characters"))]
    pub name: String,
    #[validate(length(min = 1, message = "can't be blank"))]
    pub faculty: String,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub course: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGroupRequest {
    #[validate(length(min = 1, max = 50, message = "must be between 1 and 50 characters"))]
    pub name: Option<String>,
    pub faculty: Option<String>,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub course: Option<i32>,
}

/// GET /api/groups
pub async fn list_groups(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    paging: Paging,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool()?;
    let rows = GroupRepository::new(pool.clone())
        .find_all(paging.limit, paging.offset)
        .await?;

    let groups: Vec<GroupResponse> = rows.into_iter().map(Into::into).collect();
    Ok(ApiResponse::ok(groups))
}

/// GET /api/groups/:id
pub async fn get_group(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool()?;
    let row = GroupRepository::new(pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Group", id))?;

    Ok(ApiResponse::ok(GroupResponse::from(row)))
}

/// POST /api/groups
pub async fn create_group(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    JsonBody(body): JsonBody<CreateGroupRequest>,
) -> ApiResult<impl IntoResponse> {
    body.validate()?;

    let pool = state.pool()?;
    let row = GroupRepository::new(pool.clone())
        .create(CreateGroupDto {
            name: body.name,
            faculty: body.faculty,
            course: body.course,
        })
        .await?;

    Ok(ApiResponse::created(GroupResponse::from(row)))
}

/// PATCH|PUT /api/groups/:id
pub async fn update_group(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
    JsonBody(body): JsonBody<UpdateGroupRequest>,
) -> ApiResult<impl IntoResponse> {
    body.validate()?;

    let pool = state.pool()?;
    let row = GroupRepository::new(pool.clone())
        .update(
            id,
            UpdateGroupDto {
                name: body.name,
                faculty: body.faculty,
                course: body.course,
            },
        )
        .await?;

    Ok(ApiResponse::ok(GroupResponse::from(row)))
}

/// DELETE /api/groups/:id
pub async fn delete_group(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool()?;
    GroupRepository::new(pool.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_must_be_positive() {
        let body: CreateGroupRequest =
            serde_json::from_str(r#"{"name":"BM_01","faculty":"Business","course":0}"#).unwrap();
        let err: ApiError = body.validate().unwrap_err().into();
        assert_eq!(err.message(), "course must be at least 1");
    }
}
