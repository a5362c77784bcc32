//! News handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tiue_core::Id;
use tiue_db::{CreateNewsDto, NewsRepository, NewsRow, Repository, UpdateNewsDto};
use tiue_models::{NewsCategory, NewsIcon};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiResponse, AppState, AuthenticatedUser, JsonBody, Paging, QueryParams};

/// Display format of the `date` field
pub const NEWS_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
pub struct NewsResponse {
    pub id: Id,
    pub title: String,
    pub subtitle: String,
    pub content: String,
    pub image: Option<String>,
    pub author: Option<Id>,
    pub author_name: Option<String>,
    pub category: String,
    pub icon: String,
    pub is_important: bool,
    pub date: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<NewsRow> for NewsResponse {
    fn from(row: NewsRow) -> Self {
        Self {
            date: row.created_at.format(NEWS_DATE_FORMAT).to_string(),
            id: row.id,
            title: row.title,
            subtitle: row.subtitle,
            content: row.content,
            image: row.image,
            author: row.author_id,
            author_name: row.author_name,
            category: row.category,
            icon: row.icon,
            is_important: row.is_important,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsFilter {
    pub category: Option<NewsCategory>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNewsRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 300))]
    pub subtitle: String,
    #[validate(length(min = 1, message = "can't be blank"))]
    pub content: String,
    pub image: Option<String>,
    #[serde(default)]
    pub category: NewsCategory,
    #[serde(default)]
    pub icon: NewsIcon,
    #[serde(default)]
    pub is_important: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateNewsRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 300))]
    pub subtitle: Option<String>,
    #[validate(length(min = 1, message = "can't be blank"))]
    pub content: Option<String>,
    pub image: Option<String>,
    pub category: Option<NewsCategory>,
    pub icon: Option<NewsIcon>,
    pub is_important: Option<bool>,
}

/// GET /api/news
pub async fn list_news(
    State(state): State<AppState>,
    paging: Paging,
    QueryParams(filter): QueryParams<NewsFilter>,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool()?;
    let repo = NewsRepository::new(pool.clone());

    let rows = match filter.category {
        Some(category) => {
            repo.find_by_category(category, paging.limit, paging.offset)
                .await?
        }
        None => repo.find_all(paging.limit, paging.offset).await?,
    };

    let news: Vec<NewsResponse> = rows.into_iter().map(Into::into).collect();
    Ok(ApiResponse::ok(news))
}

/// GET /api/news/:id
pub async fn get_news(
    State(state): State<AppState>,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool()?;
    let row = NewsRepository::new(pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("News", id))?;

    Ok(ApiResponse::ok(NewsResponse::from(row)))
}

/// POST /api/news
pub async fn create_news(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    JsonBody(body): JsonBody<CreateNewsRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin("create news")?;
    body.validate()?;

    let pool = state.pool()?;
    let row = NewsRepository::new(pool.clone())
        .create(CreateNewsDto {
            title: body.title,
            subtitle: body.subtitle,
            content: body.content,
            image: body.image,
            author_id: user.id,
            category: body.category,
            icon: body.icon,
            is_important: body.is_important,
        })
        .await?;

    tracing::info!(news_id = row.id, author = %user.username, "News created");
    Ok(ApiResponse::created(NewsResponse::from(row)))
}

/// PATCH|PUT /api/news/:id
pub async fn update_news(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    JsonBody(body): JsonBody<UpdateNewsRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin("update news")?;
    body.validate()?;

    let pool = state.pool()?;
    let row = NewsRepository::new(pool.clone())
        .update(
            id,
            UpdateNewsDto {
                title: body.title,
                subtitle: body.subtitle,
                content: body.content,
                image: body.image,
                category: body.category,
                icon: body.icon,
                is_important: body.is_important,
            },
        )
        .await?;

    Ok(ApiResponse::ok(NewsResponse::from(row)))
}

/// DELETE /api/news/:id
pub async fn delete_news(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin("delete news")?;

    let pool = state.pool()?;
    NewsRepository::new(pool.clone()).delete(id).await?;

    tracing::info!(news_id = id, "News deleted");
    Ok(StatusCode::NO_CONTENT)
}
