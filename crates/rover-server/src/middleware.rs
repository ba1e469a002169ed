use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The account behind the request's session token, stored as a request
/// extension by [`require_session`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub rover_db::GebietsleiterRow);

impl CurrentUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.0.role == "admin"
    }
}

/// Pool and idle TTL used by the session-auth middleware.
#[derive(Clone)]
pub struct SessionAuthState {
    pool: PgPool,
    ttl_hours: i64,
}

impl SessionAuthState {
    #[must_use]
    pub fn new(pool: PgPool, ttl_hours: i64) -> Self {
        Self { pool, ttl_hours }
    }
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter for simple API protection.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware resolving the bearer token to a stored session.
///
/// The token is hashed and looked up in one statement that also refreshes
/// the session's idle clock; sessions idle past the TTL and sessions of
/// deactivated accounts fail the lookup. On success the account is
/// attached to the request as [`CurrentUser`].
pub async fn require_session(
    State(auth): State<SessionAuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map_or_else(String::new, |id| id.0.clone());

    let Some(token) = extract_bearer_token(req.headers().get(AUTHORIZATION)) else {
        return ApiError::new(request_id, "unauthorized", "missing or invalid bearer token")
            .into_response();
    };
    let digest = rover_db::token_digest(token);

    match rover_db::resolve_session(&auth.pool, &digest, auth.ttl_hours).await {
        Ok(Some(account)) => {
            req.extensions_mut().insert(CurrentUser(account));
            next.run(req).await
        }
        Ok(None) => {
            ApiError::new(request_id, "unauthorized", "session expired or not found")
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "session lookup failed");
            ApiError::new(request_id, "internal_error", "session lookup failed").into_response()
        }
    }
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        drop(window);
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .map_or_else(String::new, |id| id.0.clone());
        return ApiError::new(request_id, "rate_limited", "rate limit exceeded").into_response();
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

pub(crate) fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn current_user_admin_check_follows_the_role_column() {
        let row = rover_db::GebietsleiterRow {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
            display_name: "Administrator".to_string(),
            email: "admin@example.com".to_string(),
            role: "admin".to_string(),
            is_active: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        assert!(CurrentUser(row.clone()).is_admin());

        let mut rep = row;
        rep.role = "gl".to_string();
        assert!(!CurrentUser(rep).is_admin());
    }
}
