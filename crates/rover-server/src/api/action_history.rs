//! Admin audit trail. Most entries are written as side effects of account
//! and import operations; this module adds listing, manual notes, and
//! cleanup of stray records.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::middleware::{CurrentUser, RequestId};

use super::{map_db_error, parse_uuid, require_admin, ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct HistoryData {
    id: Uuid,
    actor: String,
    action: String,
    target_gl: Option<Uuid>,
    description: String,
    detail: Value,
    created_at: DateTime<Utc>,
}

impl From<rover_db::ActionHistoryRow> for HistoryData {
    fn from(row: rover_db::ActionHistoryRow) -> Self {
        Self {
            id: row.id,
            actor: row.actor,
            action: row.action,
            target_gl: row.target_gl,
            description: row.description,
            detail: row.detail,
            created_at: row.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    pub target_gl: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateEntryRequest {
    pub action: String,
    pub target_gl: Option<Uuid>,
    pub description: Option<String>,
    pub detail: Option<Value>,
}

/// Audit listings default to a deeper page than the rest of the API.
fn normalize_history_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(100).clamp(1, 200)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/action-history — newest first, optionally scoped to one account.
pub(super) async fn list_history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<HistoryData>>>, ApiError> {
    let rid = &req_id.0;
    require_admin(rid, &user)?;

    let rows = rover_db::list_action_history(
        &state.pool,
        rover_db::ActionHistoryFilters {
            target_gl: query.target_gl,
            limit: normalize_history_limit(query.limit),
            offset: query.offset.unwrap_or(0).max(0),
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(HistoryData::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/action-history — record a manual entry. The actor is always
/// the calling session, never taken from the body.
pub(super) async fn create_entry(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<HistoryData>>), ApiError> {
    let rid = &req_id.0;
    require_admin(rid, &user)?;

    let action = body.action.trim().to_owned();
    if action.is_empty() || action.len() > 64 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "action must be 1–64 characters",
        ));
    }

    let entry = rover_db::NewActionEntry {
        actor: user.0.username.clone(),
        action,
        target_gl: body.target_gl,
        description: body.description.unwrap_or_default(),
        detail: body.detail.unwrap_or_else(|| serde_json::json!({})),
    };

    let row = rover_db::record_action(&state.pool, &entry)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: HistoryData::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// DELETE /api/action-history/{id} — drop one entry.
pub(super) async fn delete_entry(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    require_admin(rid, &user)?;
    let id = parse_uuid(rid, &id)?;

    rover_db::delete_action_entry(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(StatusCode::NO_CONTENT)
}
