//! Login, session introspection, and logout.
//!
//! Tokens are opaque UUIDs handed to the client once; only their SHA-256
//! digest is stored. Unknown usernames, wrong passwords, and deactivated
//! accounts all produce the same rejection.

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{extract_bearer_token, CurrentUser, RequestId};

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub(super) struct Profile {
    id: Uuid,
    username: String,
    display_name: String,
    email: String,
    role: String,
}

impl From<rover_db::GebietsleiterRow> for Profile {
    fn from(row: rover_db::GebietsleiterRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            display_name: row.display_name,
            email: row.email,
            role: row.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct LoginData {
    token: String,
    user: Profile,
}

#[derive(Debug, Serialize)]
pub(super) struct LogoutData {
    logged_out: bool,
}

/// POST /api/auth/login — exchange credentials for a session token.
pub(super) async fn login(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginData>>, ApiError> {
    let rid = &req_id.0;

    let Some(credentials) =
        rover_db::get_credentials_by_username(&state.pool, body.username.trim())
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?
    else {
        return Err(reject_login(rid));
    };
    if !credentials.is_active
        || !rover_db::verify_password(&body.password, &credentials.password_digest)
    {
        return Err(reject_login(rid));
    }

    let token = Uuid::new_v4().to_string();
    rover_db::create_session(&state.pool, &rover_db::token_digest(&token), credentials.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    // Stale sessions accumulate until someone logs in; sweep them here.
    if let Err(error) =
        rover_db::delete_expired_sessions(&state.pool, state.config.session_ttl_hours).await
    {
        tracing::warn!(error = %error, "expired session sweep failed");
    }

    let account = rover_db::get_gebietsleiter(&state.pool, credentials.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: LoginData {
            token,
            user: Profile::from(account),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn reject_login(request_id: &str) -> ApiError {
    ApiError::new(request_id, "unauthorized", "invalid username or password")
}

/// GET /api/auth/me — profile of the account behind the token.
pub(super) async fn me(
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
) -> Json<ApiResponse<Profile>> {
    Json(ApiResponse {
        data: Profile::from(user.0),
        meta: ResponseMeta::new(req_id.0),
    })
}

/// POST /api/auth/logout — drop the session behind the presented token.
pub(super) async fn logout(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<LogoutData>>, ApiError> {
    let rid = &req_id.0;

    let Some(token) = extract_bearer_token(headers.get(AUTHORIZATION)) else {
        return Err(ApiError::new(
            rid,
            "unauthorized",
            "missing or invalid bearer token",
        ));
    };

    let logged_out = rover_db::delete_session(&state.pool, &rover_db::token_digest(token))
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: LogoutData { logged_out },
        meta: ResponseMeta::new(req_id.0),
    }))
}
