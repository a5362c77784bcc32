//! Repository traits and base implementations
//!
//! Provides generic CRUD operations for database entities.

use async_trait::async_trait;
use tiue_core::Id;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl RepositoryError {
    /// Turn a constraint violation into a client error
    pub(crate) fn from_constraint(err: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => return RepositoryError::Conflict(conflict.to_string()),
                // foreign_key_violation
                Some("23503") => {
                    return RepositoryError::Validation(
                        db_err
                            .constraint()
                            .map(|c| format!("Referenced record does not exist ({})", c))
                            .unwrap_or_else(|| "Referenced record does not exist".to_string()),
                    )
                }
                // check_violation
                Some("23514") => {
                    return RepositoryError::Validation(format!(
                        "Value violates constraint {}",
                        db_err.constraint().unwrap_or("check")
                    ))
                }
                _ => {}
            }
        }
        RepositoryError::Database(err)
    }
}

/// Base repository trait for CRUD operations
#[async_trait]
pub trait Repository<T, CreateDto, UpdateDto>: Send + Sync {
    /// Find an entity by ID
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<T>>;

    /// Find all entities with pagination
    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<T>>;

    /// Count all entities
    async fn count(&self) -> RepositoryResult<i64>;

    /// Create a new entity
    async fn create(&self, dto: CreateDto) -> RepositoryResult<T>;

    /// Update an existing entity
    async fn update(&self, id: Id, dto: UpdateDto) -> RepositoryResult<T>;

    /// Delete an entity by ID
    async fn delete(&self, id: Id) -> RepositoryResult<()>;

    /// Check if an entity exists
    async fn exists(&self, id: Id) -> RepositoryResult<bool>;
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 100;
    pub const MAX_LIMIT: i64 = 500;

    /// Clamp client supplied values into a sane window
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

/// Rows affected by a DELETE, turned into `NotFound` when zero
pub(crate) fn expect_deleted(rows_affected: u64, entity: &str, id: Id) -> RepositoryResult<()> {
    if rows_affected == 0 {
        Err(RepositoryError::NotFound(format!(
            "{} with id {} not found",
            entity, id
        )))
    } else {
        Ok(())
    }
}

pub(crate) fn not_found(entity: &str, id: Id) -> RepositoryError {
    RepositoryError::NotFound(format!("{} with id {} not found", entity, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_default() {
        let p = Pagination::default();
        assert_eq!(p.limit, 100);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_clamps() {
        assert_eq!(Pagination::new(Some(0), Some(-5)), Pagination { limit: 1, offset: 0 });
        assert_eq!(Pagination::new(Some(10_000), None).limit, 500);
        assert_eq!(Pagination::new(Some(20), Some(40)), Pagination { limit: 20, offset: 40 });
    }

    #[test]
    fn test_expect_deleted() {
        assert!(expect_deleted(1, "News", 1).is_ok());
        assert!(matches!(
            expect_deleted(0, "News", 7),
            Err(RepositoryError::NotFound(msg)) if msg == "News with id 7 not found"
        ));
    }

    #[test]
    fn test_non_database_errors_pass_through() {
        let err = RepositoryError::from_constraint(sqlx::Error::RowNotFound, "taken");
        assert!(matches!(err, RepositoryError::Database(sqlx::Error::RowNotFound)));
    }
}
