//! Database operations for the `action_history` audit trail.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `action_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActionHistoryRow {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub target_gl: Option<Uuid>,
    pub description: String,
    pub detail: Value,
    pub created_at: DateTime<Utc>,
}

/// Input for recording one audit entry.
#[derive(Debug, Clone)]
pub struct NewActionEntry {
    pub actor: String,
    pub action: String,
    pub target_gl: Option<Uuid>,
    pub description: String,
    pub detail: Value,
}

/// Input filters for audit listing.
#[derive(Debug, Clone, Default)]
pub struct ActionHistoryFilters {
    pub target_gl: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

/// Record an audit entry and return the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn record_action(
    pool: &PgPool,
    entry: &NewActionEntry,
) -> Result<ActionHistoryRow, DbError> {
    let row = sqlx::query_as::<_, ActionHistoryRow>(
        "INSERT INTO action_history (actor, action, target_gl, description, detail) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, actor, action, target_gl, description, detail, created_at",
    )
    .bind(&entry.actor)
    .bind(&entry.action)
    .bind(entry.target_gl)
    .bind(&entry.description)
    .bind(&entry.detail)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Return the most recent audit entries, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_action_history(
    pool: &PgPool,
    filters: ActionHistoryFilters,
) -> Result<Vec<ActionHistoryRow>, DbError> {
    let rows = sqlx::query_as::<_, ActionHistoryRow>(
        "SELECT id, actor, action, target_gl, description, detail, created_at \
         FROM action_history \
         WHERE ($1::uuid IS NULL OR target_gl = $1) \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2 OFFSET $3",
    )
    .bind(filters.target_gl)
    .bind(filters.limit)
    .bind(filters.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete a single audit entry.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_action_entry(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM action_history WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
