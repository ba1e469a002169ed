//! Database operations for the `sessions` table.
//!
//! Only token digests are stored. Expiry is idle-based: a session whose
//! `last_seen_at` is older than the configured TTL is treated as absent
//! by [`resolve_session`] and can be swept with
//! [`delete_expired_sessions`].

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{gebietsleiter::GebietsleiterRow, DbError};

/// A row from the `sessions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub token_digest: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Persist a new session for a user.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_session(pool: &PgPool, token_digest: &str, user_id: Uuid) -> Result<(), DbError> {
    sqlx::query("INSERT INTO sessions (token_digest, user_id) VALUES ($1, $2)")
        .bind(token_digest)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Resolve a token digest to its account and refresh `last_seen_at`.
///
/// Returns `None` when the session does not exist, has been idle longer
/// than `ttl_hours`, or belongs to a deactivated account. The touch and
/// the expiry check happen in one statement, so a stale session is never
/// revived by the lookup itself.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn resolve_session(
    pool: &PgPool,
    token_digest: &str,
    ttl_hours: i64,
) -> Result<Option<GebietsleiterRow>, DbError> {
    let row = sqlx::query_as::<_, GebietsleiterRow>(
        "UPDATE sessions s \
         SET last_seen_at = NOW() \
         FROM gebietsleiter g \
         WHERE s.token_digest = $1 \
           AND s.last_seen_at > NOW() - make_interval(hours => $2::int) \
           AND g.id = s.user_id \
           AND g.is_active = TRUE \
         RETURNING g.id, g.username, g.display_name, g.email, g.role, \
                   g.is_active, g.created_at, g.updated_at",
    )
    .bind(token_digest)
    .bind(ttl_hours)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Remove a session by token digest. Returns whether a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_session(pool: &PgPool, token_digest: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM sessions WHERE token_digest = $1")
        .bind(token_digest)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Sweep sessions idle longer than `ttl_hours`. Returns the number removed.
///
/// Expired sessions already fail [`resolve_session`]; this only reclaims
/// the rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_expired_sessions(pool: &PgPool, ttl_hours: i64) -> Result<u64, DbError> {
    let result = sqlx::query(
        "DELETE FROM sessions WHERE last_seen_at <= NOW() - make_interval(hours => $1::int)",
    )
    .bind(ttl_hours)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
