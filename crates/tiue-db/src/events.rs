//! Event repository and participant registration
//!
//! Registration keeps `current_participants <= max_participants`: the counter
//! is only incremented by a conditional UPDATE inside the same transaction
//! that inserts the registration row.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use tiue_core::Id;
use tiue_models::event::check_capacity;
use tiue_models::{EventCategory, RegistrationError};

use crate::repository::{expect_deleted, not_found, Repository, RepositoryError, RepositoryResult};

const EVENT_COLUMNS: &str = r#"
    id, title, description, location, date, time, category, max_participants,
    current_participants, image, news_id, created_by, created_at, updated_at,
    (SELECT TRIM(u.first_name || ' ' || u.last_name) FROM users u WHERE u.id = events.created_by)
        AS created_by_name
"#;

const REGISTRATION_COLUMNS: &str = r#"
    id, user_id, event_id, registered_at,
    (SELECT e.title FROM events e WHERE e.id = event_registrations.event_id) AS event_title,
    (SELECT TRIM(u.first_name || ' ' || u.last_name) FROM users u
        WHERE u.id = event_registrations.user_id) AS user_name
"#;

/// Event database entity
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub location: String,
    pub date: NaiveDate,
    pub time: String,
    pub category: String,
    pub max_participants: Option<i32>,
    pub current_participants: i32,
    pub image: Option<String>,
    pub news_id: Option<i64>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by_name: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct RegistrationRow {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub registered_at: DateTime<Utc>,
    pub event_title: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateEventDto {
    pub title: String,
    pub description: String,
    pub location: String,
    pub date: NaiveDate,
    pub time: String,
    pub category: EventCategory,
    pub max_participants: Option<i32>,
    pub image: Option<String>,
    pub news_id: Option<Id>,
    pub created_by: Id,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateEventDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub category: Option<EventCategory>,
    /// Outer `None` keeps the stored value, `Some(None)` clears it
    pub max_participants: Option<Option<i32>>,
    pub image: Option<Option<String>>,
    pub news_id: Option<Option<Id>>,
}

fn check_max_participants(max: Option<i32>) -> RepositoryResult<()> {
    match max {
        Some(max) if max < 0 => Err(RepositoryError::Validation(
            "max_participants must not be negative".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Outcome of the atomic registration write
#[derive(Debug, Clone)]
pub enum RegisterAttempt {
    Registered(RegistrationRow),
    /// The conditional increment matched no row
    Full,
    Duplicate,
}

/// Storage operations behind event registration
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRegistrations: Send + Sync {
    async fn find_event(&self, event_id: Id) -> RepositoryResult<Option<EventRow>>;

    async fn is_registered(&self, event_id: Id, user_id: Id) -> RepositoryResult<bool>;

    /// Increment the counter if capacity allows and insert the registration, atomically
    async fn try_register(&self, event_id: Id, user_id: Id) -> RepositoryResult<RegisterAttempt>;

    /// Remove the registration and decrement the counter, never below zero.
    /// Returns false when there was nothing to remove.
    async fn unregister(&self, event_id: Id, user_id: Id) -> RepositoryResult<bool>;
}

/// Registration failure: a domain refusal or a storage error
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error(transparent)]
    Rejected(#[from] RegistrationError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Register a user for an event
pub async fn register_for_event<S>(
    store: &S,
    event_id: Id,
    user_id: Id,
) -> Result<RegistrationRow, RegisterError>
where
    S: EventRegistrations + ?Sized,
{
    let event = store
        .find_event(event_id)
        .await?
        .ok_or(RegistrationError::EventNotFound)?;

    if store.is_registered(event_id, user_id).await? {
        return Err(RegistrationError::AlreadyRegistered.into());
    }

    check_capacity(event.current_participants, event.max_participants)?;

    match store.try_register(event_id, user_id).await? {
        RegisterAttempt::Registered(row) => {
            tracing::info!(event_id, user_id, "User registered for event");
            Ok(row)
        }
        RegisterAttempt::Full => Err(RegistrationError::CapacityReached.into()),
        RegisterAttempt::Duplicate => Err(RegistrationError::AlreadyRegistered.into()),
    }
}

/// Cancel a user's registration
pub async fn unregister_from_event<S>(
    store: &S,
    event_id: Id,
    user_id: Id,
) -> Result<(), RegisterError>
where
    S: EventRegistrations + ?Sized,
{
    if store.find_event(event_id).await?.is_none() {
        return Err(RegistrationError::EventNotFound.into());
    }

    if !store.unregister(event_id, user_id).await? {
        return Err(RegistrationError::NotRegistered.into());
    }

    tracing::info!(event_id, user_id, "User unregistered from event");
    Ok(())
}

#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_category(
        &self,
        category: EventCategory,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {} FROM events
            WHERE category = $1
            ORDER BY date ASC, time ASC
            LIMIT $2 OFFSET $3
            "#,
            EVENT_COLUMNS
        ))
        .bind(category.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Events on or after a date, soonest first
    pub async fn find_upcoming(&self, from: NaiveDate, limit: i64) -> RepositoryResult<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events WHERE date >= $1 ORDER BY date ASC, time ASC LIMIT $2",
            EVENT_COLUMNS
        ))
        .bind(from)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Which of the given events the user is registered for
    pub async fn registered_event_ids(
        &self,
        user_id: Id,
        event_ids: &[Id],
    ) -> RepositoryResult<HashSet<Id>> {
        if event_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT event_id FROM event_registrations WHERE user_id = $1 AND event_id = ANY($2)",
        )
        .bind(user_id)
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }
}

#[async_trait]
impl EventRegistrations for EventRepository {
    async fn find_event(&self, event_id: Id) -> RepositoryResult<Option<EventRow>> {
        self.find_by_id(event_id).await
    }

    async fn is_registered(&self, event_id: Id, user_id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM event_registrations WHERE event_id = $1 AND user_id = $2)",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn try_register(&self, event_id: Id, user_id: Id) -> RepositoryResult<RegisterAttempt> {
        let mut tx = self.pool.begin().await?;

        let incremented = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE events SET
                current_participants = current_participants + 1,
                updated_at = NOW()
            WHERE id = $1
              AND (max_participants IS NULL OR current_participants < max_participants)
            RETURNING id
            "#,
        )
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;

        if incremented.is_none() {
            return Ok(RegisterAttempt::Full);
        }

        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            r#"
            INSERT INTO event_registrations (user_id, event_id, registered_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id, event_id) DO NOTHING
            RETURNING {}
            "#,
            REGISTRATION_COLUMNS
        ))
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;

        match row {
            Some(row) => {
                tx.commit().await?;
                Ok(RegisterAttempt::Registered(row))
            }
            // dropping the transaction rolls the increment back
            None => Ok(RegisterAttempt::Duplicate),
        }
    }

    async fn unregister(&self, event_id: Id, user_id: Id) -> RepositoryResult<bool> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query(
            "DELETE FROM event_registrations WHERE event_id = $1 AND user_id = $2",
        )
        .bind(event_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE events SET
                current_participants = GREATEST(current_participants - 1, 0),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl Repository<EventRow, CreateEventDto, UpdateEventDto> for EventRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<EventRow>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events WHERE id = $1",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events ORDER BY date ASC, time ASC LIMIT $1 OFFSET $2",
            EVENT_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn create(&self, dto: CreateEventDto) -> RepositoryResult<EventRow> {
        check_max_participants(dto.max_participants)?;

        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events (
                title, description, location, date, time, category, max_participants,
                current_participants, image, news_id, created_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $10, NOW(), NOW())
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(&dto.title)
        .bind(&dto.description)
        .bind(&dto.location)
        .bind(dto.date)
        .bind(&dto.time)
        .bind(dto.category.as_str())
        .bind(dto.max_participants)
        .bind(&dto.image)
        .bind(dto.news_id)
        .bind(dto.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "Event already exists"))?;

        tracing::info!(event_id = row.id, created_by = dto.created_by, "Event created");
        Ok(row)
    }

    async fn update(&self, id: Id, dto: UpdateEventDto) -> RepositoryResult<EventRow> {
        check_max_participants(dto.max_participants.flatten())?;

        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            UPDATE events SET
                title = COALESCE($1, title),
                description = COALESCE($2, description),
                location = COALESCE($3, location),
                date = COALESCE($4, date),
                time = COALESCE($5, time),
                category = COALESCE($6, category),
                max_participants = CASE WHEN $11 THEN $7 ELSE max_participants END,
                image = CASE WHEN $12 THEN $8 ELSE image END,
                news_id = CASE WHEN $13 THEN $9 ELSE news_id END,
                updated_at = NOW()
            WHERE id = $10
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(&dto.title)
        .bind(&dto.description)
        .bind(&dto.location)
        .bind(dto.date)
        .bind(&dto.time)
        .bind(dto.category.map(|c| c.as_str()))
        .bind(dto.max_participants.flatten())
        .bind(dto.image.clone().flatten())
        .bind(dto.news_id.flatten())
        .bind(id)
        .bind(dto.max_participants.is_some())
        .bind(dto.image.is_some())
        .bind(dto.news_id.is_some())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "Event already exists"))?
        .ok_or_else(|| not_found("Event", id))?;

        Ok(row)
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_deleted(result.rows_affected(), "Event", id)
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn event(current: i32, max: Option<i32>) -> EventRow {
        EventRow {
            id: 7,
            title: "Open day".to_string(),
            description: String::new(),
            location: "Main hall".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            time: "10:00".to_string(),
            category: "university".to_string(),
            max_participants: max,
            current_participants: current,
            image: None,
            news_id: None,
            created_by: Some(1),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            created_by_name: Some("Admin User".to_string()),
        }
    }

    fn registration() -> RegistrationRow {
        RegistrationRow {
            id: 1,
            user_id: 42,
            event_id: 7,
            registered_at: Utc::now(),
            event_title: Some("Open day".to_string()),
            user_name: Some("Sabina Sulaymonova".to_string()),
        }
    }

    fn rejection(result: Result<impl std::fmt::Debug, RegisterError>) -> RegistrationError {
        match result {
            Err(RegisterError::Rejected(reason)) => reason,
            other => panic!("expected a rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let mut store = MockEventRegistrations::new();
        store
            .expect_find_event()
            .with(eq(7))
            .returning(|_| Ok(Some(event(3, Some(10)))));
        store.expect_is_registered().returning(|_, _| Ok(false));
        store
            .expect_try_register()
            .with(eq(7), eq(42))
            .times(1)
            .returning(|_, _| Ok(RegisterAttempt::Registered(registration())));

        let row = register_for_event(&store, 7, 42).await.unwrap();
        assert_eq!(row.event_title.as_deref(), Some("Open day"));
    }

    #[tokio::test]
    async fn test_full_event_is_refused_without_writing() {
        let mut store = MockEventRegistrations::new();
        store
            .expect_find_event()
            .returning(|_| Ok(Some(event(10, Some(10)))));
        store.expect_is_registered().returning(|_, _| Ok(false));
        store.expect_try_register().times(0);

        let result = register_for_event(&store, 7, 42).await;
        assert_eq!(rejection(result), RegistrationError::CapacityReached);
    }

    #[tokio::test]
    async fn test_lost_race_for_last_seat_is_capacity_error() {
        let mut store = MockEventRegistrations::new();
        store
            .expect_find_event()
            .returning(|_| Ok(Some(event(9, Some(10)))));
        store.expect_is_registered().returning(|_, _| Ok(false));
        store
            .expect_try_register()
            .times(1)
            .returning(|_, _| Ok(RegisterAttempt::Full));

        let result = register_for_event(&store, 7, 42).await;
        assert_eq!(rejection(result), RegistrationError::CapacityReached);
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_refused() {
        let mut store = MockEventRegistrations::new();
        store
            .expect_find_event()
            .returning(|_| Ok(Some(event(1, None))));
        store.expect_is_registered().returning(|_, _| Ok(true));
        store.expect_try_register().times(0);

        let result = register_for_event(&store, 7, 42).await;
        assert_eq!(rejection(result), RegistrationError::AlreadyRegistered);
    }

    #[tokio::test]
    async fn test_unknown_event() {
        let mut store = MockEventRegistrations::new();
        store.expect_find_event().returning(|_| Ok(None));
        store.expect_is_registered().times(0);

        let result = register_for_event(&store, 99, 42).await;
        assert_eq!(rejection(result), RegistrationError::EventNotFound);
    }

    #[tokio::test]
    async fn test_unregister_without_registration() {
        let mut store = MockEventRegistrations::new();
        store
            .expect_find_event()
            .returning(|_| Ok(Some(event(0, None))));
        store.expect_unregister().returning(|_, _| Ok(false));

        let result = unregister_from_event(&store, 7, 42).await;
        assert_eq!(rejection(result), RegistrationError::NotRegistered);
    }

    #[tokio::test]
    async fn test_unregister_success() {
        let mut store = MockEventRegistrations::new();
        store
            .expect_find_event()
            .returning(|_| Ok(Some(event(1, Some(5)))));
        store
            .expect_unregister()
            .with(eq(7), eq(42))
            .times(1)
            .returning(|_, _| Ok(true));

        assert!(unregister_from_event(&store, 7, 42).await.is_ok());
    }

    #[test]
    fn test_negative_capacity_rejected() {
        assert!(check_max_participants(Some(-1)).is_err());
        assert!(check_max_participants(Some(0)).is_ok());
        assert!(check_max_participants(None).is_ok());
    }
}
