//! Database operations for the `bug_reports` inbox.

use chrono::{DateTime, Utc};
use rover_core::BugStatus;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `bug_reports` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BugReportRow {
    pub id: Uuid,
    pub reporter: String,
    pub summary: String,
    pub description: String,
    pub status: String,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for filing a report. Status always starts at `new`.
#[derive(Debug, Clone)]
pub struct NewBugReport {
    pub reporter: String,
    pub summary: String,
    pub description: String,
}

/// File a report and return the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_bug_report(pool: &PgPool, new: &NewBugReport) -> Result<BugReportRow, DbError> {
    let row = sqlx::query_as::<_, BugReportRow>(
        "INSERT INTO bug_reports (reporter, summary, description) \
         VALUES ($1, $2, $3) \
         RETURNING id, reporter, summary, description, status, resolution_note, \
                   created_at, updated_at",
    )
    .bind(&new.reporter)
    .bind(&new.summary)
    .bind(&new.description)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch a single report by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_bug_report(pool: &PgPool, id: Uuid) -> Result<BugReportRow, DbError> {
    let row = sqlx::query_as::<_, BugReportRow>(
        "SELECT id, reporter, summary, description, status, resolution_note, \
                created_at, updated_at \
         FROM bug_reports \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// List reports, newest first, optionally filtered by status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_bug_reports(
    pool: &PgPool,
    status: Option<&str>,
) -> Result<Vec<BugReportRow>, DbError> {
    let rows = sqlx::query_as::<_, BugReportRow>(
        "SELECT id, reporter, summary, description, status, resolution_note, \
                created_at, updated_at \
         FROM bug_reports \
         WHERE ($1::text IS NULL OR status = $1) \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Move a report's status forward along `new -> reviewed -> fixed | wont_fix`.
///
/// Any forward assignment is allowed (e.g. `new` directly to `fixed`);
/// moving sideways or back is rejected. A resolution note, when given,
/// replaces the stored one.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`,
/// [`DbError::InvalidBugTransition`] if the assignment is not forward, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn transition_bug_status(
    pool: &PgPool,
    id: Uuid,
    new_status: BugStatus,
    resolution_note: Option<&str>,
) -> Result<BugReportRow, DbError> {
    // Statuses the report may currently hold for this assignment to be
    // a forward move. `new` is the start state and never a target.
    let allowed_prior: Vec<String> = match new_status {
        BugStatus::New => Vec::new(),
        BugStatus::Reviewed => vec!["new".to_string()],
        BugStatus::Fixed | BugStatus::WontFix => vec!["new".to_string(), "reviewed".to_string()],
    };

    let row = if allowed_prior.is_empty() {
        None
    } else {
        sqlx::query_as::<_, BugReportRow>(
            "UPDATE bug_reports SET \
                 status          = $2, \
                 resolution_note = COALESCE($3, resolution_note), \
                 updated_at      = NOW() \
             WHERE id = $1 AND status = ANY($4) \
             RETURNING id, reporter, summary, description, status, resolution_note, \
                       created_at, updated_at",
        )
        .bind(id)
        .bind(new_status.as_str())
        .bind(resolution_note)
        .bind(&allowed_prior)
        .fetch_optional(pool)
        .await?
    };

    match row {
        Some(row) => Ok(row),
        None => {
            // Distinguish a missing report from a rejected transition.
            let current = get_bug_report(pool, id).await?;
            Err(DbError::InvalidBugTransition {
                id,
                from: current.status,
                to: new_status.as_str().to_string(),
            })
        }
    }
}
