//! Local sessions keyed by hashed directory tokens
//!
//! Tokens are never stored in clear; only their SHA-256 hex digest is kept.

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tiue_core::Id;

use crate::repository::RepositoryResult;
use crate::users::UserRow;

/// SHA-256 hex digest of a token
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a session for a freshly issued token pair
    pub async fn create(
        &self,
        user_id: Id,
        access_token: &str,
        refresh_token: &str,
        ttl_hours: i64,
    ) -> RepositoryResult<()> {
        let expires_at = Utc::now() + Duration::hours(ttl_hours);

        sqlx::query(
            r#"
            INSERT INTO sessions (token_hash, refresh_hash, user_id, created_at, expires_at)
            VALUES ($1, $2, $3, NOW(), $4)
            ON CONFLICT (token_hash) DO UPDATE SET
                refresh_hash = EXCLUDED.refresh_hash,
                user_id = EXCLUDED.user_id,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(hash_token(access_token))
        .bind(hash_token(refresh_token))
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Resolve an access token to its active user
    pub async fn find_user(&self, access_token: &str) -> RepositoryResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.role, u.avatar,
                   u.is_active, u.created_at, u.updated_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = $1 AND s.expires_at > NOW() AND u.is_active
            "#,
        )
        .bind(hash_token(access_token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Replace the session of an old refresh token with the new pair.
    /// Returns false when the refresh token has no local session.
    pub async fn rotate(
        &self,
        old_refresh_token: &str,
        access_token: &str,
        refresh_token: &str,
        ttl_hours: i64,
    ) -> RepositoryResult<bool> {
        let expires_at = Utc::now() + Duration::hours(ttl_hours);
        let mut tx = self.pool.begin().await?;

        let user_id = sqlx::query_scalar::<_, i64>(
            "DELETE FROM sessions WHERE refresh_hash = $1 RETURNING user_id",
        )
        .bind(hash_token(old_refresh_token))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            return Ok(false);
        };

        sqlx::query(
            r#"
            INSERT INTO sessions (token_hash, refresh_hash, user_id, created_at, expires_at)
            VALUES ($1, $2, $3, NOW(), $4)
            ON CONFLICT (token_hash) DO UPDATE SET
                refresh_hash = EXCLUDED.refresh_hash,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(hash_token(access_token))
        .bind(hash_token(refresh_token))
        .bind(user_id)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Returns false when the token had no session
    pub async fn delete(&self, access_token: &str) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(hash_token(access_token))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn purge_expired(&self) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
