//! Bug reports filed by reps. Status moves forward only
//! (new → reviewed → fixed | wont_fix); the transition check lives in
//! the database layer.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rover_core::BugStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{CurrentUser, RequestId};

use super::{map_db_error, parse_uuid, require_admin, ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct BugReportData {
    id: Uuid,
    reporter: String,
    summary: String,
    description: String,
    status: String,
    resolution_note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<rover_db::BugReportRow> for BugReportData {
    fn from(row: rover_db::BugReportRow) -> Self {
        Self {
            id: row.id,
            reporter: row.reporter,
            summary: row.summary,
            description: row.description,
            status: row.status,
            resolution_note: row.resolution_note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct BugReportQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateBugReportRequest {
    pub summary: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateStatusRequest {
    pub status: String,
    pub resolution_note: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/bug-reports — list reports, optionally by status.
pub(super) async fn list_bug_reports(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<BugReportQuery>,
) -> Result<Json<ApiResponse<Vec<BugReportData>>>, ApiError> {
    let rows = rover_db::list_bug_reports(&state.pool, query.status.as_deref())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(BugReportData::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/bug-reports — file a report. The reporter is the calling
/// session; new reports always start in status `new`.
pub(super) async fn create_bug_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateBugReportRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BugReportData>>), ApiError> {
    let rid = &req_id.0;

    let summary = body.summary.trim().to_owned();
    if summary.is_empty() || summary.len() > 200 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "summary must be 1–200 characters",
        ));
    }

    let new = rover_db::NewBugReport {
        reporter: user.0.username.clone(),
        summary,
        description: body.description.unwrap_or_default(),
    };

    let row = rover_db::create_bug_report(&state.pool, &new)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: BugReportData::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PATCH /api/bug-reports/{id} — advance the status (admin only).
/// Moving backwards is rejected.
pub(super) async fn update_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<BugReportData>>, ApiError> {
    let rid = &req_id.0;
    require_admin(rid, &user)?;
    let id = parse_uuid(rid, &id)?;

    let status: BugStatus = body
        .status
        .trim()
        .parse()
        .map_err(|e: rover_core::ConfigError| ApiError::new(rid, "validation_error", e.to_string()))?;

    let row = rover_db::transition_bug_status(&state.pool, id, status, body.resolution_note.as_deref())
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: BugReportData::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}
