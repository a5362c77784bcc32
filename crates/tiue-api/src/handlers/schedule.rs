//! Timetable handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tiue_core::Id;
use tiue_db::{CreateScheduleDto, Repository, ScheduleRepository, ScheduleRow, UpdateScheduleDto};
use tiue_models::{LessonType, Weekday};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiResponse, AppState, AuthenticatedUser, JsonBody, Paging, QueryParams};

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub id: Id,
    pub subject: String,
    pub teacher: Option<Id>,
    pub teacher_name: Option<String>,
    pub group: Id,
    pub group_name: Option<String>,
    pub room: String,
    pub building: String,
    pub time: String,
    pub day: String,
    #[serde(rename = "type")]
    pub lesson_type: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ScheduleRow> for ScheduleResponse {
    fn from(row: ScheduleRow) -> Self {
        Self {
            id: row.id,
            subject: row.subject,
            teacher: row.teacher_id,
            teacher_name: row.teacher_name,
            group: row.group_id,
            group_name: row.group_name,
            room: row.room,
            building: row.building,
            time: row.time,
            day: row.day,
            lesson_type: row.lesson_type,
            color: row.color,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleFilter {
    pub group_id: Option<Id>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateScheduleRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub subject: String,
    pub teacher: Option<Id>,
    pub group: Id,
    #[validate(length(min = 1, message = "can't be blank"))]
    pub room: String,
    #[serde(default)]
    pub building: String,
    #[validate(length(min = 1, message = "can't be blank"))]
    pub time: String,
    pub day: Weekday,
    #[serde(rename = "type", default)]
    pub lesson_type: LessonType,
    pub color: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateScheduleRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub subject: Option<String>,
    pub teacher: Option<Id>,
    pub group: Option<Id>,
    pub room: Option<String>,
    pub building: Option<String>,
    pub time: Option<String>,
    pub day: Option<Weekday>,
    #[serde(rename = "type")]
    pub lesson_type: Option<LessonType>,
    pub color: Option<String>,
}

/// GET /api/schedule
pub async fn list_schedule(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    paging: Paging,
    QueryParams(filter): QueryParams<ScheduleFilter>,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool()?;
    let repo = ScheduleRepository::new(pool.clone());

    let rows = match filter.group_id {
        Some(group_id) => repo.find_by_group(group_id).await?,
        None => repo.find_all(paging.limit, paging.offset).await?,
    };

    let lessons: Vec<ScheduleResponse> = rows.into_iter().map(Into::into).collect();
    Ok(ApiResponse::ok(lessons))
}

/// GET /api/schedule/:id
pub async fn get_schedule(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool()?;
    let row = ScheduleRepository::new(pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Schedule", id))?;

    Ok(ApiResponse::ok(ScheduleResponse::from(row)))
}

/// POST /api/schedule
pub async fn create_schedule(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    JsonBody(body): JsonBody<CreateScheduleRequest>,
) -> ApiResult<impl IntoResponse> {
    body.validate()?;

    let pool = state.pool()?;
    let row = ScheduleRepository::new(pool.clone())
        .create(CreateScheduleDto {
            subject: body.subject,
            teacher_id: body.teacher,
            group_id: body.group,
            room: body.room,
            building: body.building,
            time: body.time,
            day: body.day,
            lesson_type: body.lesson_type,
            color: body.color,
        })
        .await?;

    Ok(ApiResponse::created(ScheduleResponse::from(row)))
}

/// PATCH|PUT /api/schedule/:id
pub async fn update_schedule(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
    JsonBody(body): JsonBody<UpdateScheduleRequest>,
) -> ApiResult<impl IntoResponse> {
    body.validate()?;

    let pool = state.pool()?;
    let row = ScheduleRepository::new(pool.clone())
        .update(
            id,
            UpdateScheduleDto {
                subject: body.subject,
                teacher_id: body.teacher,
                group_id: body.group,
                room: body.room,
                building: body.building,
                time: body.time,
                day: body.day,
                lesson_type: body.lesson_type,
                color: body.color,
            },
        )
        .await?;

    Ok(ApiResponse::ok(ScheduleResponse::from(row)))
}

/// DELETE /api/schedule/:id
pub async fn delete_schedule(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool()?;
    ScheduleRepository::new(pool.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_reads_type_and_day() {
        let body: CreateScheduleRequest = serde_json::from_str(
            r#"{"subject":"Economics","group":1,"room":"204","time":"09:00-10:20","day":"monday","type":"seminar"}"#,
        )
        .unwrap();
        assert_eq!(body.day, Weekday::Monday);
        assert_eq!(body.lesson_type, LessonType::Seminar);
        assert_eq!(body.color, None);
        assert!(body.validate().is_ok());
    }
}
