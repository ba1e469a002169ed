//! Database operations for the `gebietsleiter` table.

use chrono::{DateTime, Utc};
use rover_core::Role;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `gebietsleiter` table, without credential material.
///
/// This is the shape handed to API serialization; `password_digest` is
/// deliberately absent.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GebietsleiterRow {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Credential lookup result for login. Carries the stored digest and just
/// enough profile to decide whether the account may sign in.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CredentialRow {
    pub id: Uuid,
    pub username: String,
    pub password_digest: String,
    pub role: String,
    pub is_active: bool,
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewGebietsleiter {
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    /// Pre-hashed via [`crate::auth::hash_password`]; never the raw password.
    pub password_digest: String,
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct GebietsleiterUpdate {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Create an account and return its public row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails; a duplicate username
/// surfaces as a unique-violation database error.
pub async fn create_gebietsleiter(
    pool: &PgPool,
    new: &NewGebietsleiter,
) -> Result<GebietsleiterRow, DbError> {
    let row = sqlx::query_as::<_, GebietsleiterRow>(
        "INSERT INTO gebietsleiter (username, display_name, email, role, password_digest) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, username, display_name, email, role, is_active, created_at, updated_at",
    )
    .bind(&new.username)
    .bind(&new.display_name)
    .bind(&new.email)
    .bind(new.role.as_str())
    .bind(&new.password_digest)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch a single account by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_gebietsleiter(pool: &PgPool, id: Uuid) -> Result<GebietsleiterRow, DbError> {
    let row = sqlx::query_as::<_, GebietsleiterRow>(
        "SELECT id, username, display_name, email, role, is_active, created_at, updated_at \
         FROM gebietsleiter \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Look up login credentials by username.
///
/// Returns `None` when the username is unknown so the caller can treat
/// unknown-user and wrong-password identically.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_credentials_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<CredentialRow>, DbError> {
    let row = sqlx::query_as::<_, CredentialRow>(
        "SELECT id, username, password_digest, role, is_active \
         FROM gebietsleiter \
         WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List accounts ordered by username.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_gebietsleiter(
    pool: &PgPool,
    include_inactive: bool,
) -> Result<Vec<GebietsleiterRow>, DbError> {
    let rows = sqlx::query_as::<_, GebietsleiterRow>(
        "SELECT id, username, display_name, email, role, is_active, created_at, updated_at \
         FROM gebietsleiter \
         WHERE ($1 OR is_active = TRUE) \
         ORDER BY username ASC",
    )
    .bind(include_inactive)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Apply a partial update and return the resulting row.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_gebietsleiter(
    pool: &PgPool,
    id: Uuid,
    update: &GebietsleiterUpdate,
) -> Result<GebietsleiterRow, DbError> {
    let row = sqlx::query_as::<_, GebietsleiterRow>(
        "UPDATE gebietsleiter SET \
             display_name = COALESCE($2, display_name), \
             email        = COALESCE($3, email), \
             role         = COALESCE($4, role), \
             is_active    = COALESCE($5, is_active), \
             updated_at   = NOW() \
         WHERE id = $1 \
         RETURNING id, username, display_name, email, role, is_active, created_at, updated_at",
    )
    .bind(id)
    .bind(&update.display_name)
    .bind(&update.email)
    .bind(update.role.map(Role::as_str))
    .bind(update.is_active)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Replace the stored password digest for an account.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_password(pool: &PgPool, id: Uuid, password_digest: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE gebietsleiter SET password_digest = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(password_digest)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Delete an account. Markets assigned to it fall back to unassigned and
/// its sessions are removed by the schema's cascade rules.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_gebietsleiter(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM gebietsleiter WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
