//! News repository
//!
//! Newest first. Rows carry the author's display name so list endpoints do
//! not need a second lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tiue_core::Id;
use tiue_models::{NewsCategory, NewsIcon};

use crate::repository::{expect_deleted, not_found, Repository, RepositoryResult};

const NEWS_COLUMNS: &str = r#"
    id, title, subtitle, content, image, author_id, category, icon, is_important,
    created_at, updated_at,
    (SELECT TRIM(u.first_name || ' ' || u.last_name) FROM users u WHERE u.id = news.author_id)
        AS author_name
"#;

/// News database entity
#[derive(Debug, Clone, FromRow)]
pub struct NewsRow {
    pub id: i64,
    pub title: String,
    pub subtitle: String,
    pub content: String,
    pub image: Option<String>,
    pub author_id: Option<i64>,
    pub category: String,
    pub icon: String,
    pub is_important: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_name: Option<String>,
}

impl NewsRow {
    /// Subtitle, or the first 100 characters of the content followed by "..."
    pub fn summary(&self) -> String {
        if !self.subtitle.is_empty() {
            return self.subtitle.clone();
        }
        let head: String = self.content.chars().take(100).collect();
        format!("{}...", head)
    }
}

#[derive(Debug, Clone)]
pub struct CreateNewsDto {
    pub title: String,
    pub subtitle: String,
    pub content: String,
    pub image: Option<String>,
    pub author_id: Id,
    pub category: NewsCategory,
    pub icon: NewsIcon,
    pub is_important: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateNewsDto {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub category: Option<NewsCategory>,
    pub icon: Option<NewsIcon>,
    pub is_important: Option<bool>,
}

#[derive(Clone)]
pub struct NewsRepository {
    pool: PgPool,
}

impl NewsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_category(
        &self,
        category: NewsCategory,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<NewsRow>> {
        let rows = sqlx::query_as::<_, NewsRow>(&format!(
            r#"
            SELECT {} FROM news
            WHERE category = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            NEWS_COLUMNS
        ))
        .bind(category.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Latest important news
    pub async fn find_important(&self, limit: i64) -> RepositoryResult<Vec<NewsRow>> {
        let rows = sqlx::query_as::<_, NewsRow>(&format!(
            "SELECT {} FROM news WHERE is_important ORDER BY created_at DESC LIMIT $1",
            NEWS_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl Repository<NewsRow, CreateNewsDto, UpdateNewsDto> for NewsRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<NewsRow>> {
        let row = sqlx::query_as::<_, NewsRow>(&format!(
            "SELECT {} FROM news WHERE id = $1",
            NEWS_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<NewsRow>> {
        let rows = sqlx::query_as::<_, NewsRow>(&format!(
            "SELECT {} FROM news ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            NEWS_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM news")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn create(&self, dto: CreateNewsDto) -> RepositoryResult<NewsRow> {
        let row = sqlx::query_as::<_, NewsRow>(&format!(
            r#"
            INSERT INTO news (
                title, subtitle, content, image, author_id, category, icon, is_important,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
            RETURNING {}
            "#,
            NEWS_COLUMNS
        ))
        .bind(&dto.title)
        .bind(&dto.subtitle)
        .bind(&dto.content)
        .bind(&dto.image)
        .bind(dto.author_id)
        .bind(dto.category.as_str())
        .bind(dto.icon.as_str())
        .bind(dto.is_important)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(news_id = row.id, author_id = dto.author_id, "News created");
        Ok(row)
    }

    async fn update(&self, id: Id, dto: UpdateNewsDto) -> RepositoryResult<NewsRow> {
        let row = sqlx::query_as::<_, NewsRow>(&format!(
            r#"
            UPDATE news SET
                title = COALESCE($1, title),
                subtitle = COALESCE($2, subtitle),
                content = COALESCE($3, content),
                image = COALESCE($4, image),
                category = COALESCE($5, category),
                icon = COALESCE($6, icon),
                is_important = COALESCE($7, is_important),
                updated_at = NOW()
            WHERE id = $8
            RETURNING {}
            "#,
            NEWS_COLUMNS
        ))
        .bind(&dto.title)
        .bind(&dto.subtitle)
        .bind(&dto.content)
        .bind(&dto.image)
        .bind(dto.category.map(|c| c.as_str()))
        .bind(dto.icon.map(|i| i.as_str()))
        .bind(dto.is_important)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found("News", id))?;

        Ok(row)
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM news WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_deleted(result.rows_affected(), "News", id)
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM news WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn news(subtitle: &str, content: &str) -> NewsRow {
        NewsRow {
            id: 1,
            title: "Exam week".to_string(),
            subtitle: subtitle.to_string(),
            content: content.to_string(),
            image: None,
            author_id: Some(1),
            category: "academic".to_string(),
            icon: "school-outline".to_string(),
            is_important: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            author_name: Some("Admin User".to_string()),
        }
    }

    #[test]
    fn test_summary_prefers_subtitle() {
        assert_eq!(news("Short", "Long body").summary(), "Short");
    }

    #[test]
    fn test_summary_truncates_content_by_chars() {
        let content = "я".repeat(150);
        let summary = news("", &content).summary();
        assert_eq!(summary.chars().count(), 103);
        assert!(summary.ends_with("..."));
        assert_eq!(news("", "Hi").summary(), "Hi...");
    }
}
