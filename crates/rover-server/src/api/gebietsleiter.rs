//! Gebietsleiter account administration.
//!
//! Mutations are admin-only and leave an action-history trail. Passwords
//! never appear in responses; only their salted digest is stored.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rover_core::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{CurrentUser, RequestId};

use super::{
    map_db_error, parse_uuid, record_audit, require_admin, ApiError, ApiResponse, AppState,
    ResponseMeta,
};

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct GebietsleiterData {
    id: Uuid,
    username: String,
    display_name: String,
    email: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<rover_db::GebietsleiterRow> for GebietsleiterData {
    fn from(row: rover_db::GebietsleiterRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            display_name: row.display_name,
            email: row.email,
            role: row.role,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct GebietsleiterQuery {
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateGebietsleiterRequest {
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub role: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateGebietsleiterRequest {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    /// When present, the password is reset to this value.
    pub password: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_username(req_id: &str, username: &str) -> Result<(), ApiError> {
    if username.is_empty() || username.len() > 64 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "username must be 1–64 characters",
        ));
    }
    Ok(())
}

fn validate_display_name(req_id: &str, display_name: &str) -> Result<(), ApiError> {
    if display_name.is_empty() || display_name.len() > 200 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "display_name must be 1–200 characters",
        ));
    }
    Ok(())
}

fn validate_password(req_id: &str, password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "password must be at least 8 characters",
        ));
    }
    Ok(())
}

fn parse_role(req_id: &str, role: &str) -> Result<Role, ApiError> {
    role.trim()
        .parse()
        .map_err(|e: rover_core::ConfigError| ApiError::new(req_id, "validation_error", e.to_string()))
}

fn map_unique_violation(req_id: &str, e: &rover_db::DbError, username: &str) -> ApiError {
    if let rover_db::DbError::Sqlx(sqlx::Error::Database(db_err)) = e {
        if db_err.is_unique_violation() {
            return ApiError::new(
                req_id,
                "conflict",
                format!("username '{username}' is already taken"),
            );
        }
    }
    map_db_error(req_id.to_owned(), e)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/gebietsleiter — list accounts; inactive ones only on request.
pub(super) async fn list_gebietsleiter(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<GebietsleiterQuery>,
) -> Result<Json<ApiResponse<Vec<GebietsleiterData>>>, ApiError> {
    let rows = rover_db::list_gebietsleiter(&state.pool, query.include_inactive.unwrap_or(false))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(GebietsleiterData::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/gebietsleiter — create an account (admin only).
pub(super) async fn create_gebietsleiter(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateGebietsleiterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<GebietsleiterData>>), ApiError> {
    let rid = &req_id.0;
    require_admin(rid, &user)?;

    let username = body.username.trim().to_owned();
    validate_username(rid, &username)?;
    let display_name = body.display_name.trim().to_owned();
    validate_display_name(rid, &display_name)?;
    validate_password(rid, &body.password)?;
    let role = match body.role.as_deref() {
        Some(raw) => parse_role(rid, raw)?,
        None => Role::Gl,
    };

    let new = rover_db::NewGebietsleiter {
        username: username.clone(),
        display_name,
        email: body.email.trim().to_owned(),
        role,
        password_digest: rover_db::hash_password(&body.password),
    };

    let row = rover_db::create_gebietsleiter(&state.pool, &new)
        .await
        .map_err(|e| map_unique_violation(rid, &e, &username))?;

    record_audit(
        &state.pool,
        &user.0.username,
        "gl_created",
        Some(row.id),
        format!("created account '{}'", row.username),
        serde_json::json!({ "role": row.role }),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: GebietsleiterData::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/gebietsleiter/{id} — fetch a single account.
pub(super) async fn get_gebietsleiter(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<GebietsleiterData>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_uuid(rid, &id)?;

    let row = rover_db::get_gebietsleiter(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: GebietsleiterData::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PUT /api/gebietsleiter/{id} — update profile fields, role, activity,
/// or reset the password (admin only).
pub(super) async fn update_gebietsleiter(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateGebietsleiterRequest>,
) -> Result<Json<ApiResponse<GebietsleiterData>>, ApiError> {
    let rid = &req_id.0;
    require_admin(rid, &user)?;
    let id = parse_uuid(rid, &id)?;

    let display_name = body.display_name.as_ref().map(|n| n.trim().to_owned());
    if let Some(ref display_name) = display_name {
        validate_display_name(rid, display_name)?;
    }
    if let Some(ref password) = body.password {
        validate_password(rid, password)?;
    }
    let role = match body.role.as_deref() {
        Some(raw) => Some(parse_role(rid, raw)?),
        None => None,
    };

    let mut fields: Vec<&str> = Vec::new();
    if display_name.is_some() {
        fields.push("display_name");
    }
    if body.email.is_some() {
        fields.push("email");
    }
    if role.is_some() {
        fields.push("role");
    }
    if body.is_active.is_some() {
        fields.push("is_active");
    }

    let update = rover_db::GebietsleiterUpdate {
        display_name,
        email: body.email,
        role,
        is_active: body.is_active,
    };

    let row = rover_db::update_gebietsleiter(&state.pool, id, &update)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    if let Some(ref password) = body.password {
        rover_db::update_password(&state.pool, id, &rover_db::hash_password(password))
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;
        record_audit(
            &state.pool,
            &user.0.username,
            "password_reset",
            Some(row.id),
            format!("reset password for '{}'", row.username),
            serde_json::json!({}),
        )
        .await;
    }

    if !fields.is_empty() {
        record_audit(
            &state.pool,
            &user.0.username,
            "gl_updated",
            Some(row.id),
            format!("updated account '{}'", row.username),
            serde_json::json!({ "fields": fields }),
        )
        .await;
    }

    Ok(Json(ApiResponse {
        data: GebietsleiterData::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/gebietsleiter/{id} — remove an account (admin only).
pub(super) async fn delete_gebietsleiter(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    require_admin(rid, &user)?;
    let id = parse_uuid(rid, &id)?;

    if user.0.id == id {
        return Err(ApiError::new(
            rid,
            "bad_request",
            "you cannot delete your own account",
        ));
    }

    let row = rover_db::get_gebietsleiter(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    rover_db::delete_gebietsleiter(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    // target_gl stays NULL: the referenced row is gone, the detail blob
    // keeps the identifying facts instead.
    record_audit(
        &state.pool,
        &user.0.username,
        "gl_deleted",
        None,
        format!("deleted account '{}'", row.username),
        serde_json::json!({ "id": id, "username": row.username }),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
