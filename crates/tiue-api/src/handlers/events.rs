//! Event handlers, including registration

use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tiue_core::Id;
use tiue_db::{
    register_for_event, unregister_from_event, CreateEventDto, EventRepository, EventRow,
    RegistrationRow, Repository, UpdateEventDto,
};
use tiue_models::{parse_event_date, EventCategory};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::handlers::nullable;
use crate::extractors::{
    ApiResponse, AppState, AuthenticatedUser, JsonBody, MaybeUser, Paging, QueryParams,
};

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub location: String,
    pub date: NaiveDate,
    pub time: String,
    pub category: String,
    pub max_participants: Option<i32>,
    pub current_participants: i32,
    pub image: Option<String>,
    pub news: Option<Id>,
    pub created_by: Option<Id>,
    pub created_by_name: Option<String>,
    pub is_registered: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventResponse {
    fn new(row: EventRow, is_registered: bool) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            location: row.location,
            date: row.date,
            time: row.time,
            category: row.category,
            max_participants: row.max_participants,
            current_participants: row.current_participants,
            image: row.image,
            news: row.news_id,
            created_by: row.created_by,
            created_by_name: row.created_by_name,
            is_registered,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub id: Id,
    pub user: Id,
    pub event: Id,
    pub registered_at: DateTime<Utc>,
    pub event_title: Option<String>,
    pub user_name: Option<String>,
}

impl From<RegistrationRow> for RegistrationResponse {
    fn from(row: RegistrationRow) -> Self {
        Self {
            id: row.id,
            user: row.user_id,
            event: row.event_id,
            registered_at: row.registered_at,
            event_title: row.event_title,
            user_name: row.user_name,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EventFilter {
    pub category: Option<EventCategory>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, message = "can't be blank"))]
    pub location: String,
    /// `DD.MM.YYYY` or `YYYY-MM-DD`
    pub date: String,
    #[validate(length(min = 1, message = "can't be blank"))]
    pub time: String,
    #[serde(default)]
    pub category: EventCategory,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub max_participants: Option<i32>,
    pub image: Option<String>,
    pub news: Option<Id>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub category: Option<EventCategory>,
    /// `null` clears the limit
    #[serde(default, deserialize_with = "nullable")]
    pub max_participants: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub news: Option<Option<Id>>,
}

impl UpdateEventRequest {
    fn check_max_participants(&self) -> ApiResult<()> {
        match self.max_participants {
            Some(Some(max)) if max < 1 => Err(ApiError::bad_request(
                "max_participants: must be at least 1",
            )),
            _ => Ok(()),
        }
    }
}

fn event_date(raw: &str) -> ApiResult<NaiveDate> {
    parse_event_date(raw).map_err(ApiError::bad_request)
}

/// Registered event ids of the caller; empty for anonymous requests
async fn registrations_of(
    repo: &EventRepository,
    user: &MaybeUser,
    events: &[EventRow],
) -> ApiResult<HashSet<Id>> {
    match user.0.as_ref() {
        Some(user) => {
            let ids: Vec<Id> = events.iter().map(|e| e.id).collect();
            Ok(repo.registered_event_ids(user.id, &ids).await?)
        }
        None => Ok(HashSet::new()),
    }
}

/// GET /api/events
pub async fn list_events(
    State(state): State<AppState>,
    user: MaybeUser,
    paging: Paging,
    QueryParams(filter): QueryParams<EventFilter>,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool()?;
    let repo = EventRepository::new(pool.clone());

    let rows = match filter.category {
        Some(category) => {
            repo.find_by_category(category, paging.limit, paging.offset)
                .await?
        }
        None => repo.find_all(paging.limit, paging.offset).await?,
    };

    let registered = registrations_of(&repo, &user, &rows).await?;
    let events: Vec<EventResponse> = rows
        .into_iter()
        .map(|row| {
            let is_registered = registered.contains(&row.id);
            EventResponse::new(row, is_registered)
        })
        .collect();

    Ok(ApiResponse::ok(events))
}

/// GET /api/events/:id
pub async fn get_event(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool()?;
    let repo = EventRepository::new(pool.clone());

    let row = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event", id))?;

    let registered = registrations_of(&repo, &user, std::slice::from_ref(&row)).await?;
    let is_registered = registered.contains(&row.id);
    Ok(ApiResponse::ok(EventResponse::new(row, is_registered)))
}

/// POST /api/events
pub async fn create_event(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    JsonBody(body): JsonBody<CreateEventRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin("create events")?;
    body.validate()?;
    let date = event_date(&body.date)?;

    let pool = state.pool()?;
    let row = EventRepository::new(pool.clone())
        .create(CreateEventDto {
            title: body.title,
            description: body.description,
            location: body.location,
            date,
            time: body.time,
            category: body.category,
            max_participants: body.max_participants,
            image: body.image,
            news_id: body.news,
            created_by: user.id,
        })
        .await?;

    tracing::info!(event_id = row.id, author = %user.username, "Event created");
    Ok(ApiResponse::created(EventResponse::new(row, false)))
}

/// PATCH|PUT /api/events/:id
pub async fn update_event(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    JsonBody(body): JsonBody<UpdateEventRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin("update events")?;
    body.validate()?;
    body.check_max_participants()?;
    let date = body.date.as_deref().map(event_date).transpose()?;

    let pool = state.pool()?;
    let repo = EventRepository::new(pool.clone());
    let row = repo
        .update(
            id,
            UpdateEventDto {
                title: body.title,
                description: body.description,
                location: body.location,
                date,
                time: body.time,
                category: body.category,
                max_participants: body.max_participants,
                image: body.image,
                news_id: body.news,
            },
        )
        .await?;

    let is_registered = repo
        .registered_event_ids(user.id, &[row.id])
        .await?
        .contains(&row.id);
    Ok(ApiResponse::ok(EventResponse::new(row, is_registered)))
}

/// DELETE /api/events/:id
pub async fn delete_event(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin("delete events")?;

    let pool = state.pool()?;
    EventRepository::new(pool.clone()).delete(id).await?;

    tracing::info!(event_id = id, "Event deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/events/:id/register
pub async fn register(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool()?;
    let repo = EventRepository::new(pool.clone());

    let registration = register_for_event(&repo, id, user.id).await?;
    Ok(ApiResponse::created(RegistrationResponse::from(
        registration,
    )))
}

#[derive(Debug, Serialize)]
struct UnregisterResponse {
    message: &'static str,
}

/// DELETE /api/events/:id/unregister
pub async fn unregister(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool()?;
    let repo = EventRepository::new(pool.clone());

    unregister_from_event(&repo, id, user.id).await?;
    Ok(ApiResponse::ok(UnregisterResponse {
        message: "Successfully unregistered from event.",
    }))
}
