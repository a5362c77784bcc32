//! Study group repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tiue_core::Id;

use crate::repository::{expect_deleted, not_found, Repository, RepositoryError, RepositoryResult};

/// Group database entity
#[derive(Debug, Clone, FromRow)]
pub struct GroupRow {
    pub id: i64,
    pub name: String,
    pub faculty: String,
    pub course: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateGroupDto {
    pub name: String,
    pub faculty: String,
    pub course: i32,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateGroupDto {
    pub name: Option<String>,
    pub faculty: Option<String>,
    pub course: Option<i32>,
}

const NAME_TAKEN: &str = "Group name has already been taken";

#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<GroupRow, CreateGroupDto, UpdateGroupDto> for GroupRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<GroupRow>> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, faculty, course, created_at, updated_at FROM groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<GroupRow>> {
        let rows = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT id, name, faculty, course, created_at, updated_at
            FROM groups
            ORDER BY faculty ASC, course ASC, name ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM groups")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn create(&self, dto: CreateGroupDto) -> RepositoryResult<GroupRow> {
        if dto.course < 1 {
            return Err(RepositoryError::Validation(
                "course must be a positive number".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, GroupRow>(
            r#"
            INSERT INTO groups (name, faculty, course, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING id, name, faculty, course, created_at, updated_at
            "#,
        )
        .bind(&dto.name)
        .bind(&dto.faculty)
        .bind(dto.course)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, NAME_TAKEN))?;

        Ok(row)
    }

    async fn update(&self, id: Id, dto: UpdateGroupDto) -> RepositoryResult<GroupRow> {
        if matches!(dto.course, Some(course) if course < 1) {
            return Err(RepositoryError::Validation(
                "course must be a positive number".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, GroupRow>(
            r#"
            UPDATE groups SET
                name = COALESCE($1, name),
                faculty = COALESCE($2, faculty),
                course = COALESCE($3, course),
                updated_at = NOW()
            WHERE id = $4
            RETURNING id, name, faculty, course, created_at, updated_at
            "#,
        )
        .bind(&dto.name)
        .bind(&dto.faculty)
        .bind(dto.course)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, NAME_TAKEN))?
        .ok_or_else(|| not_found("Group", id))?;

        Ok(row)
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_deleted(result.rows_affected(), "Group", id)
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM groups WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}
