//! Timetable repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tiue_core::Id;
use tiue_models::schedule::{is_hex_color, DEFAULT_COLOR};
use tiue_models::{LessonType, Weekday};

use crate::repository::{expect_deleted, not_found, Repository, RepositoryError, RepositoryResult};

const SCHEDULE_COLUMNS: &str = r#"
    id, subject, teacher_id, group_id, room, building, time, day, lesson_type, color,
    created_at, updated_at,
    (SELECT TRIM(u.first_name || ' ' || u.last_name) FROM users u WHERE u.id = schedules.teacher_id)
        AS teacher_name,
    (SELECT g.name FROM groups g WHERE g.id = schedules.group_id) AS group_name
"#;

/// Timetable slot
#[derive(Debug, Clone, FromRow)]
pub struct ScheduleRow {
    pub id: i64,
    pub subject: String,
    pub teacher_id: Option<i64>,
    pub group_id: i64,
    pub room: String,
    pub building: String,
    pub time: String,
    pub day: String,
    pub lesson_type: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub teacher_name: Option<String>,
    pub group_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateScheduleDto {
    pub subject: String,
    pub teacher_id: Option<Id>,
    pub group_id: Id,
    pub room: String,
    pub building: String,
    pub time: String,
    pub day: Weekday,
    pub lesson_type: LessonType,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateScheduleDto {
    pub subject: Option<String>,
    pub teacher_id: Option<Id>,
    pub group_id: Option<Id>,
    pub room: Option<String>,
    pub building: Option<String>,
    pub time: Option<String>,
    pub day: Option<Weekday>,
    pub lesson_type: Option<LessonType>,
    pub color: Option<String>,
}

fn check_color(color: Option<&str>) -> RepositoryResult<()> {
    match color {
        Some(c) if !is_hex_color(c) => Err(RepositoryError::Validation(format!(
            "color must be a #rrggbb value, got {}",
            c
        ))),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct ScheduleRepository {
    pool: PgPool,
}

impl ScheduleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lessons of one group, Monday first
    pub async fn find_by_group(&self, group_id: Id) -> RepositoryResult<Vec<ScheduleRow>> {
        let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
            "SELECT {} FROM schedules WHERE group_id = $1 ORDER BY day_order ASC, time ASC",
            SCHEDULE_COLUMNS
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl Repository<ScheduleRow, CreateScheduleDto, UpdateScheduleDto> for ScheduleRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<ScheduleRow>> {
        let row = sqlx::query_as::<_, ScheduleRow>(&format!(
            "SELECT {} FROM schedules WHERE id = $1",
            SCHEDULE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<ScheduleRow>> {
        let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
            "SELECT {} FROM schedules ORDER BY day_order ASC, time ASC, id ASC LIMIT $1 OFFSET $2",
            SCHEDULE_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM schedules")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn create(&self, dto: CreateScheduleDto) -> RepositoryResult<ScheduleRow> {
        check_color(dto.color.as_deref())?;

        let row = sqlx::query_as::<_, ScheduleRow>(&format!(
            r#"
            INSERT INTO schedules (
                subject, teacher_id, group_id, room, building, time, day, day_order,
                lesson_type, color, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
            RETURNING {}
            "#,
            SCHEDULE_COLUMNS
        ))
        .bind(&dto.subject)
        .bind(dto.teacher_id)
        .bind(dto.group_id)
        .bind(&dto.room)
        .bind(&dto.building)
        .bind(&dto.time)
        .bind(dto.day.as_str())
        .bind(dto.day.ordinal())
        .bind(dto.lesson_type.as_str())
        .bind(dto.color.as_deref().unwrap_or(DEFAULT_COLOR))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "Schedule slot already exists"))?;

        Ok(row)
    }

    async fn update(&self, id: Id, dto: UpdateScheduleDto) -> RepositoryResult<ScheduleRow> {
        check_color(dto.color.as_deref())?;

        let row = sqlx::query_as::<_, ScheduleRow>(&format!(
            r#"
            UPDATE schedules SET
                subject = COALESCE($1, subject),
                teacher_id = COALESCE($2, teacher_id),
                group_id = COALESCE($3, group_id),
                room = COALESCE($4, room),
                building = COALESCE($5, building),
                time = COALESCE($6, time),
                day = COALESCE($7, day),
                day_order = COALESCE($8, day_order),
                lesson_type = COALESCE($9, lesson_type),
                color = COALESCE($10, color),
                updated_at = NOW()
            WHERE id = $11
            RETURNING {}
            "#,
            SCHEDULE_COLUMNS
        ))
        .bind(&dto.subject)
        .bind(dto.teacher_id)
        .bind(dto.group_id)
        .bind(&dto.room)
        .bind(&dto.building)
        .bind(&dto.time)
        .bind(dto.day.map(|d| d.as_str()))
        .bind(dto.day.map(|d| d.ordinal()))
        .bind(dto.lesson_type.map(|t| t.as_str()))
        .bind(&dto.color)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "Schedule slot already exists"))?
        .ok_or_else(|| not_found("Schedule", id))?;

        Ok(row)
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM schedules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_deleted(result.rows_affected(), "Schedule", id)
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM schedules WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }
}
