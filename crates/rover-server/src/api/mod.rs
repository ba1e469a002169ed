mod action_history;
mod auth;
mod bug_reports;
mod gebietsleiter;
mod markets;
mod preorders;
mod products;
mod routes;
mod waves;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use rover_core::AppConfig;
use rover_maps::DrivingTimesClient;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::middleware::{
    enforce_rate_limit, request_id, require_session, CurrentUser, RateLimitState, RequestId,
    SessionAuthState,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    /// Absent when `MAPS_API_KEY` is not configured; the driving-time
    /// endpoint then reports itself unavailable.
    pub maps: Option<Arc<DrivingTimesClient>>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Error envelope. On the wire this is `{ "error": <message>, "meta": ... }`;
/// `code` only picks the HTTP status and is never serialized.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub code: String,
    pub error: String,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            error: message.into(),
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn normalize_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// Deserializer for doubled-`Option` update fields: a field present in the
/// body (even as `null`) comes out as `Some(..)`, so handlers can tell
/// "clear this" apart from "not in the request". Serde's stock behavior
/// folds both into `None`.
pub(super) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

fn parse_uuid(request_id: &str, raw: &str) -> Result<Uuid, ApiError> {
    raw.parse().map_err(|_| {
        ApiError::new(
            request_id,
            "validation_error",
            format!("'{raw}' is not a valid id"),
        )
    })
}

/// Translate a storage error into the wire envelope.
///
/// `NotFound` and the typed domain violations keep their message; raw
/// database failures are logged and flattened to an opaque 500.
pub(super) fn map_db_error(request_id: String, error: &rover_db::DbError) -> ApiError {
    match error {
        rover_db::DbError::NotFound => ApiError::new(request_id, "not_found", "record not found"),
        rover_db::DbError::InvalidBugTransition { .. } | rover_db::DbError::NotAPalette(_) => {
            ApiError::new(request_id, "bad_request", error.to_string())
        }
        rover_db::DbError::Sqlx(sqlx::Error::Database(db_err))
            if db_err.is_foreign_key_violation() =>
        {
            ApiError::new(
                request_id,
                "bad_request",
                "a referenced record does not exist",
            )
        }
        _ => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

/// Gate for the management surfaces; only `admin` accounts pass.
pub(super) fn require_admin(request_id: &str, user: &CurrentUser) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::new(
            request_id,
            "forbidden",
            "this operation requires the admin role",
        ))
    }
}

/// Record an audit entry for an admin mutation. Best-effort: a failed
/// write is logged, never surfaced to the caller.
pub(super) async fn record_audit(
    pool: &PgPool,
    actor: &str,
    action: &str,
    target_gl: Option<Uuid>,
    description: String,
    detail: serde_json::Value,
) {
    let entry = rover_db::NewActionEntry {
        actor: actor.to_owned(),
        action: action.to_owned(),
        target_gl,
        description,
        detail,
    };
    if let Err(error) = rover_db::record_action(pool, &entry).await {
        tracing::warn!(error = %error, action, "failed to record audit entry");
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: SessionAuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route(
            "/api/markets",
            get(markets::list_markets).post(markets::create_market),
        )
        .route("/api/markets/import", post(markets::import_markets))
        .route(
            "/api/markets/{id}",
            get(markets::get_market)
                .put(markets::update_market)
                .delete(markets::delete_market),
        )
        .route("/api/markets/{id}/visit", post(markets::record_visit))
        .route(
            "/api/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/api/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/api/gebietsleiter",
            get(gebietsleiter::list_gebietsleiter).post(gebietsleiter::create_gebietsleiter),
        )
        .route(
            "/api/gebietsleiter/{id}",
            get(gebietsleiter::get_gebietsleiter)
                .put(gebietsleiter::update_gebietsleiter)
                .delete(gebietsleiter::delete_gebietsleiter),
        )
        .route(
            "/api/action-history",
            get(action_history::list_history).post(action_history::create_entry),
        )
        .route(
            "/api/action-history/{id}",
            delete(action_history::delete_entry),
        )
        .route(
            "/api/bug-reports",
            get(bug_reports::list_bug_reports).post(bug_reports::create_bug_report),
        )
        .route("/api/bug-reports/{id}", patch(bug_reports::update_status))
        .route(
            "/api/wellen",
            get(waves::list_waves).post(waves::create_wave),
        )
        .route(
            "/api/wellen/dashboard/chain-averages",
            get(waves::chain_averages),
        )
        .route("/api/wellen/dashboard/waves", get(waves::wave_dashboard))
        .route(
            "/api/wellen/{id}",
            get(waves::get_wave)
                .put(waves::update_wave)
                .delete(waves::delete_wave),
        )
        .route("/api/wellen/{id}/entries", post(waves::record_entry))
        .route(
            "/api/preorders",
            get(preorders::list_preorders).post(preorders::create_preorder),
        )
        .route("/api/preorders/{id}", delete(preorders::delete_preorder))
        .route("/api/maps/driving-times", post(routes::driving_times))
        .route("/api/routes/plan", post(routes::plan_route))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(auth, require_session)),
        )
}

pub fn build_app(state: AppState, auth: SessionAuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/login", post(auth::login));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match rover_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    // -------------------------------------------------------------------------
    // Envelope — unit tests (no DB)
    // -------------------------------------------------------------------------

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn normalize_offset_floors_negative_values() {
        assert_eq!(normalize_offset(None), 0);
        assert_eq!(normalize_offset(Some(-5)), 0);
        assert_eq!(normalize_offset(Some(30)), 30);
    }

    #[test]
    fn api_error_serializes_message_as_plain_string() {
        let error = ApiError::new("req-1", "not_found", "record not found");
        let json = serde_json::to_value(&error).expect("serialize");
        assert_eq!(json["error"].as_str(), Some("record not found"));
        assert!(json.get("code").is_none(), "code must stay off the wire");
        assert_eq!(json["meta"]["request_id"].as_str(), Some("req-1"));
    }

    #[test]
    fn api_error_code_picks_the_status() {
        let cases = [
            ("not_found", StatusCode::NOT_FOUND),
            ("unauthorized", StatusCode::UNAUTHORIZED),
            ("forbidden", StatusCode::FORBIDDEN),
            ("validation_error", StatusCode::BAD_REQUEST),
            ("conflict", StatusCode::CONFLICT),
            ("rate_limited", StatusCode::TOO_MANY_REQUESTS),
            ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, expected) in cases {
            let response = ApiError::new("req-1", code, "boom").into_response();
            assert_eq!(response.status(), expected, "code {code}");
        }
    }

    #[derive(Debug, serde::Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "super::double_option")]
        value: Option<Option<i32>>,
    }

    #[test]
    fn double_option_tells_absent_null_and_value_apart() {
        let absent: Patch = serde_json::from_str("{}").expect("absent");
        assert_eq!(absent.value, None);
        let null: Patch = serde_json::from_str(r#"{"value":null}"#).expect("null");
        assert_eq!(null.value, Some(None));
        let set: Patch = serde_json::from_str(r#"{"value":7}"#).expect("set");
        assert_eq!(set.value, Some(Some(7)));
    }

    // -------------------------------------------------------------------------
    // Route test helpers
    // -------------------------------------------------------------------------

    fn test_config() -> Arc<AppConfig> {
        Arc::new(AppConfig {
            database_url: "postgres://unused".to_owned(),
            env: rover_core::Environment::Test,
            bind_addr: "127.0.0.1:0".parse().expect("bind addr"),
            log_level: "warn".to_owned(),
            session_ttl_hours: 24,
            db_max_connections: 5,
            db_min_connections: 0,
            db_acquire_timeout_secs: 5,
            maps_api_key: None,
            maps_base_url: None,
            maps_request_timeout_secs: 5,
            maps_user_agent: "rover-test/0.1".to_owned(),
        })
    }

    fn test_app(pool: sqlx::PgPool) -> Router {
        let auth = SessionAuthState::new(pool.clone(), 24);
        let state = AppState {
            pool,
            config: test_config(),
            maps: None,
        };
        build_app(state, auth, default_rate_limit_state())
    }

    async fn seed_account(
        pool: &sqlx::PgPool,
        username: &str,
        role: &str,
    ) -> rover_db::GebietsleiterRow {
        let role: rover_core::Role = role.parse().expect("role");
        rover_db::create_gebietsleiter(
            pool,
            &rover_db::NewGebietsleiter {
                username: username.to_owned(),
                display_name: format!("Account {username}"),
                email: format!("{username}@example.com"),
                role,
                password_digest: rover_db::hash_password("geheim-1234"),
            },
        )
        .await
        .expect("seed account")
    }

    async fn open_session(pool: &sqlx::PgPool, account: &rover_db::GebietsleiterRow) -> String {
        let token = Uuid::new_v4().to_string();
        rover_db::create_session(pool, &rover_db::token_digest(&token), account.id)
            .await
            .expect("seed session");
        token
    }

    /// Drive one request through the app and parse the JSON body.
    /// 204 responses come back as `Value::Null`.
    async fn send(
        app: Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json parse")
        };
        (status, json)
    }

    // -------------------------------------------------------------------------
    // Health and sessions
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_reports_ok_without_auth(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let (status, json) = send(app, "GET", "/api/health", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"].as_str(), Some("ok"));
        assert_eq!(json["data"]["database"].as_str(), Some("ok"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn protected_routes_reject_missing_tokens(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let (status, json) = send(app, "GET", "/api/markets", None, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            json["error"].as_str(),
            Some("missing or invalid bearer token")
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn login_issues_a_usable_token(pool: sqlx::PgPool) {
        seed_account(&pool, "anna", "gl").await;
        let app = test_app(pool);

        let (status, json) = send(
            app.clone(),
            "POST",
            "/api/auth/login",
            None,
            Some(serde_json::json!({ "username": "anna", "password": "geheim-1234" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["user"]["username"].as_str(), Some("anna"));
        let token = json["data"]["token"].as_str().expect("token").to_owned();

        let (status, _) = send(app, "GET", "/api/markets", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn login_rejects_bad_credentials_uniformly(pool: sqlx::PgPool) {
        seed_account(&pool, "anna", "gl").await;
        let app = test_app(pool);

        // Wrong password and unknown username must be indistinguishable.
        let (status, json) = send(
            app.clone(),
            "POST",
            "/api/auth/login",
            None,
            Some(serde_json::json!({ "username": "anna", "password": "falsch-falsch" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"].as_str(), Some("invalid username or password"));

        let (status, json) = send(
            app,
            "POST",
            "/api/auth/login",
            None,
            Some(serde_json::json!({ "username": "niemand", "password": "geheim-1234" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"].as_str(), Some("invalid username or password"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn login_rejects_deactivated_accounts(pool: sqlx::PgPool) {
        let account = seed_account(&pool, "anna", "gl").await;
        sqlx::query("UPDATE gebietsleiter SET is_active = FALSE WHERE id = $1")
            .bind(account.id)
            .execute(&pool)
            .await
            .expect("deactivate");
        let app = test_app(pool);

        let (status, json) = send(
            app,
            "POST",
            "/api/auth/login",
            None,
            Some(serde_json::json!({ "username": "anna", "password": "geheim-1234" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"].as_str(), Some("invalid username or password"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn me_returns_the_session_profile(pool: sqlx::PgPool) {
        let account = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &account).await;
        let app = test_app(pool);

        let (status, json) = send(app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["username"].as_str(), Some("anna"));
        assert_eq!(json["data"]["role"].as_str(), Some("gl"));
        assert!(
            json["data"].get("password_digest").is_none(),
            "no credential material in profiles"
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn logout_invalidates_the_token(pool: sqlx::PgPool) {
        let account = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &account).await;
        let app = test_app(pool);

        let (status, json) = send(app.clone(), "POST", "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["logged_out"].as_bool(), Some(true));

        let (status, json) = send(app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"].as_str(), Some("session expired or not found"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn rate_limit_rejects_after_the_window_fills(pool: sqlx::PgPool) {
        let account = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &account).await;
        let auth = SessionAuthState::new(pool.clone(), 24);
        let state = AppState {
            pool,
            config: test_config(),
            maps: None,
        };
        let app = build_app(state, auth, RateLimitState::new(2, Duration::from_secs(60)));

        for _ in 0..2 {
            let (status, _) = send(app.clone(), "GET", "/api/markets", Some(&token), None).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, json) = send(app, "GET", "/api/markets", Some(&token), None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json["error"].as_str(), Some("rate limit exceeded"));
    }

    // -------------------------------------------------------------------------
    // Markets
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn market_crud_roundtrip(pool: sqlx::PgPool) {
        let account = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &account).await;
        let app = test_app(pool);

        let (status, json) = send(
            app.clone(),
            "POST",
            "/api/markets",
            Some(&token),
            Some(serde_json::json!({ "id": "M-100", "name": "Billa Graz", "chain": "billa+" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["chain"].as_str(), Some("Billa+"));
        assert_eq!(json["data"]["frequency"].as_i64(), Some(12));
        assert_eq!(json["data"]["current_visits"].as_i64(), Some(0));
        assert_eq!(json["data"]["is_active"].as_bool(), Some(true));

        let (status, json) = send(app.clone(), "GET", "/api/markets/M-100", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["name"].as_str(), Some("Billa Graz"));

        let (status, json) = send(
            app.clone(),
            "PUT",
            "/api/markets/M-100",
            Some(&token),
            Some(serde_json::json!({ "frequency": 24 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["frequency"].as_i64(), Some(24));
        assert_eq!(json["data"]["name"].as_str(), Some("Billa Graz"));

        let (status, _) = send(app.clone(), "DELETE", "/api/markets/M-100", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, json) = send(app, "GET", "/api/markets/M-100", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"].as_str(), Some("record not found"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn market_create_rejects_zero_frequency(pool: sqlx::PgPool) {
        let account = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &account).await;
        let app = test_app(pool);

        let (status, json) = send(
            app,
            "POST",
            "/api/markets",
            Some(&token),
            Some(serde_json::json!({ "id": "M-1", "name": "Nullmarkt", "frequency": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json["error"].as_str(),
            Some("frequency must be at least 1, got 0")
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn market_create_conflicts_on_duplicate_id(pool: sqlx::PgPool) {
        let account = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &account).await;
        let app = test_app(pool);

        let body = serde_json::json!({ "id": "M-1", "name": "Spar Linz" });
        let (status, _) = send(app.clone(), "POST", "/api/markets", Some(&token), Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, json) = send(app, "POST", "/api/markets", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"].as_str(), Some("market 'M-1' already exists"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn market_update_distinguishes_absent_from_null(pool: sqlx::PgPool) {
        let account = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &account).await;
        let app = test_app(pool);

        let (status, _) = send(
            app.clone(),
            "POST",
            "/api/markets",
            Some(&token),
            Some(serde_json::json!({ "id": "M-1", "name": "Spar Linz" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        // Assign a rep.
        let (status, json) = send(
            app.clone(),
            "PUT",
            "/api/markets/M-1",
            Some(&token),
            Some(serde_json::json!({ "gebietsleiter_id": account.id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["data"]["gebietsleiter_id"].as_str(),
            Some(account.id.to_string().as_str())
        );

        // An empty patch keeps the assignment.
        let (status, json) = send(
            app.clone(),
            "PUT",
            "/api/markets/M-1",
            Some(&token),
            Some(serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!json["data"]["gebietsleiter_id"].is_null());

        // An explicit null clears it.
        let (status, json) = send(
            app,
            "PUT",
            "/api/markets/M-1",
            Some(&token),
            Some(serde_json::json!({ "gebietsleiter_id": null })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["data"]["gebietsleiter_id"].is_null());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn visit_counts_once_per_calendar_day(pool: sqlx::PgPool) {
        let account = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &account).await;
        let app = test_app(pool);

        let (status, _) = send(
            app.clone(),
            "POST",
            "/api/markets",
            Some(&token),
            Some(serde_json::json!({ "id": "M-1", "name": "Spar Linz" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, json) = send(app.clone(), "POST", "/api/markets/M-1/visit", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["counted"].as_bool(), Some(true));

        let (status, json) = send(app.clone(), "POST", "/api/markets/M-1/visit", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["counted"].as_bool(), Some(false));

        let (_, json) = send(app.clone(), "GET", "/api/markets/M-1", Some(&token), None).await;
        assert_eq!(json["data"]["current_visits"].as_i64(), Some(1));
        assert_eq!(
            json["data"]["last_visit"].as_str(),
            Some(Utc::now().date_naive().to_string().as_str())
        );

        let (status, _) = send(app, "POST", "/api/markets/M-404/visit", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn import_skips_rows_without_id_or_name(pool: sqlx::PgPool) {
        let admin = seed_account(&pool, "chef", "admin").await;
        let token = open_session(&pool, &admin).await;
        let app = test_app(pool);

        let rows = serde_json::json!([
            { "id": "M-1", "name": "Spar Linz", "chain": "spar" },
            { "id": "M-2", "name": "Billa Wien", "chain": "billa" },
            { "name": "Kein Schlüssel" }
        ]);

        let (status, json) = send(
            app.clone(),
            "POST",
            "/api/markets/import",
            Some(&token),
            Some(rows.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["inserted"].as_u64(), Some(2));
        assert_eq!(json["data"]["updated"].as_u64(), Some(0));
        assert_eq!(json["data"]["failed"].as_u64(), Some(1));

        // Re-importing the same sheet updates instead of inserting.
        let (status, json) = send(app, "POST", "/api/markets/import", Some(&token), Some(rows)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["inserted"].as_u64(), Some(0));
        assert_eq!(json["data"]["updated"].as_u64(), Some(2));
        assert_eq!(json["data"]["failed"].as_u64(), Some(1));
    }

    // -------------------------------------------------------------------------
    // Admin gating and accounts
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn admin_surfaces_reject_the_gl_role(pool: sqlx::PgPool) {
        let account = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &account).await;
        let app = test_app(pool);

        let attempts = [
            ("POST", "/api/gebietsleiter", Some(serde_json::json!({
                "username": "neu",
                "display_name": "Neu",
                "email": "neu@example.com",
                "password": "geheim-1234"
            }))),
            ("GET", "/api/action-history", None),
            ("POST", "/api/markets/import", Some(serde_json::json!([]))),
        ];
        for (method, uri, body) in attempts {
            let (status, json) = send(app.clone(), method, uri, Some(&token), body).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
            assert_eq!(
                json["error"].as_str(),
                Some("this operation requires the admin role")
            );
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn account_create_writes_an_audit_entry(pool: sqlx::PgPool) {
        let admin = seed_account(&pool, "chef", "admin").await;
        let token = open_session(&pool, &admin).await;
        let app = test_app(pool);

        let (status, json) = send(
            app.clone(),
            "POST",
            "/api/gebietsleiter",
            Some(&token),
            Some(serde_json::json!({
                "username": "bernd",
                "display_name": "Bernd Huber",
                "email": "bernd@example.com",
                "password": "geheim-1234"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["role"].as_str(), Some("gl"));
        let new_id = json["data"]["id"].as_str().expect("id").to_owned();

        let (status, json) = send(app, "GET", "/api/action-history", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let entry = json["data"]
            .as_array()
            .expect("data array")
            .iter()
            .find(|e| e["action"] == "gl_created")
            .expect("gl_created entry");
        assert_eq!(entry["actor"].as_str(), Some("chef"));
        assert_eq!(entry["target_gl"].as_str(), Some(new_id.as_str()));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn password_reset_takes_effect_on_login(pool: sqlx::PgPool) {
        let admin = seed_account(&pool, "chef", "admin").await;
        let anna = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &admin).await;
        let app = test_app(pool);

        let (status, _) = send(
            app.clone(),
            "PUT",
            &format!("/api/gebietsleiter/{}", anna.id),
            Some(&token),
            Some(serde_json::json!({ "password": "neues-geheim" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            app.clone(),
            "POST",
            "/api/auth/login",
            None,
            Some(serde_json::json!({ "username": "anna", "password": "geheim-1234" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            app,
            "POST",
            "/api/auth/login",
            None,
            Some(serde_json::json!({ "username": "anna", "password": "neues-geheim" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn admins_cannot_delete_their_own_account(pool: sqlx::PgPool) {
        let admin = seed_account(&pool, "chef", "admin").await;
        let token = open_session(&pool, &admin).await;
        let app = test_app(pool);

        let (status, json) = send(
            app,
            "DELETE",
            &format!("/api/gebietsleiter/{}", admin.id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json["error"].as_str(),
            Some("you cannot delete your own account")
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn manual_audit_entries_use_the_session_actor(pool: sqlx::PgPool) {
        let admin = seed_account(&pool, "chef", "admin").await;
        let token = open_session(&pool, &admin).await;
        let app = test_app(pool);

        let (status, json) = send(
            app.clone(),
            "POST",
            "/api/action-history",
            Some(&token),
            Some(serde_json::json!({ "action": "note", "description": "handgeprüft" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["actor"].as_str(), Some("chef"));
        let id = json["data"]["id"].as_str().expect("id").to_owned();

        let (status, _) = send(
            app,
            "DELETE",
            &format!("/api/action-history/{id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    // -------------------------------------------------------------------------
    // Bug reports
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn bug_status_moves_forward_only(pool: sqlx::PgPool) {
        let admin = seed_account(&pool, "chef", "admin").await;
        let anna = seed_account(&pool, "anna", "gl").await;
        let admin_token = open_session(&pool, &admin).await;
        let anna_token = open_session(&pool, &anna).await;
        let app = test_app(pool);

        let (status, json) = send(
            app.clone(),
            "POST",
            "/api/bug-reports",
            Some(&anna_token),
            Some(serde_json::json!({ "summary": "Karte lädt nicht" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["status"].as_str(), Some("new"));
        assert_eq!(json["data"]["reporter"].as_str(), Some("anna"));
        let id = json["data"]["id"].as_str().expect("id").to_owned();

        // Reps cannot triage.
        let (status, _) = send(
            app.clone(),
            "PATCH",
            &format!("/api/bug-reports/{id}"),
            Some(&anna_token),
            Some(serde_json::json!({ "status": "fixed" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = send(
            app.clone(),
            "PATCH",
            &format!("/api/bug-reports/{id}"),
            Some(&admin_token),
            Some(serde_json::json!({ "status": "fixed", "resolution_note": "Cache geleert" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"].as_str(), Some("fixed"));
        assert_eq!(json["data"]["resolution_note"].as_str(), Some("Cache geleert"));

        let (status, _) = send(
            app,
            "PATCH",
            &format!("/api/bug-reports/{id}"),
            Some(&admin_token),
            Some(serde_json::json!({ "status": "new" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // -------------------------------------------------------------------------
    // Waves
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn wave_flow_tracks_targets_and_progress(pool: sqlx::PgPool) {
        let anna = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &anna).await;
        let app = test_app(pool);

        let (status, _) = send(
            app.clone(),
            "POST",
            "/api/markets",
            Some(&token),
            Some(serde_json::json!({ "id": "M-1", "name": "Billa Graz", "chain": "billa+" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, json) = send(
            app.clone(),
            "POST",
            "/api/wellen",
            Some(&token),
            Some(serde_json::json!({
                "name": "Herbstwelle",
                "start_date": "2026-08-01",
                "end_date": "2026-08-31",
                "item_type": "display",
                "participants": [{ "gebietsleiter_id": anna.id, "display_target": 10 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let wave_id = json["data"]["id"].as_str().expect("id").to_owned();
        assert_eq!(json["data"]["participants"].as_array().map(Vec::len), Some(1));

        // Recording twice for the same market overwrites, not adds.
        let entry = |count: i64| {
            serde_json::json!({ "market_id": "M-1", "display_count": count })
        };
        let (status, _) = send(
            app.clone(),
            "POST",
            &format!("/api/wellen/{wave_id}/entries"),
            Some(&token),
            Some(entry(4)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, json) = send(
            app.clone(),
            "POST",
            &format!("/api/wellen/{wave_id}/entries"),
            Some(&token),
            Some(entry(6)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["display_count"].as_i64(), Some(6));
        assert_eq!(json["data"]["gebietsleiter_id"].as_str(), Some(anna.id.to_string().as_str()));

        let (status, json) = send(app.clone(), "GET", "/api/wellen/dashboard/waves", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let row = json["data"]
            .as_array()
            .expect("data array")
            .iter()
            .find(|r| r["wave_id"] == wave_id.as_str())
            .expect("dashboard row");
        assert_eq!(row["participant_count"].as_i64(), Some(1));
        assert_eq!(row["display_target_total"].as_i64(), Some(10));
        assert_eq!(row["display_recorded"].as_i64(), Some(6));
        assert_eq!(row["markets_recorded"].as_i64(), Some(1));

        let (status, json) = send(
            app,
            "GET",
            "/api/wellen/dashboard/chain-averages",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let row = json["data"]
            .as_array()
            .expect("data array")
            .iter()
            .find(|r| r["chain"] == "Billa+")
            .expect("chain row");
        assert_eq!(row["market_count"].as_i64(), Some(1));
        assert_eq!(row["entry_count"].as_i64(), Some(1));
        let avg: f64 = row["avg_display_count"]
            .as_str()
            .expect("decimal string")
            .parse()
            .expect("parse avg");
        assert!((avg - 6.0).abs() < 1e-9);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn wave_create_rejects_backward_date_ranges(pool: sqlx::PgPool) {
        let anna = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &anna).await;
        let app = test_app(pool);

        let (status, json) = send(
            app,
            "POST",
            "/api/wellen",
            Some(&token),
            Some(serde_json::json!({
                "name": "Rückwärts",
                "start_date": "2026-08-31",
                "end_date": "2026-08-01",
                "item_type": "display"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json["error"].as_str(),
            Some("end_date must not be before start_date")
        );
    }

    // -------------------------------------------------------------------------
    // Products and preorders
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn palette_products_carry_entries_and_zero_price(pool: sqlx::PgPool) {
        let anna = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &anna).await;
        let app = test_app(pool);

        let (status, json) = send(
            app.clone(),
            "POST",
            "/api/products",
            Some(&token),
            Some(serde_json::json!({
                "name": "Herbstpalette",
                "department": "pets",
                "product_type": "palette",
                "price": "99.00",
                "palette_entries": [
                    { "product_name": "Kauknochen", "quantity": 10, "unit_price": "2.50" }
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["price"].as_str(), Some("0.00"));
        let entries = json["data"]["palette_entries"].as_array().expect("entries");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["position"].as_i64(), Some(0));
        let id = json["data"]["id"].as_str().expect("id").to_owned();

        // Replacing the content lines renumbers positions.
        let (status, json) = send(
            app.clone(),
            "PUT",
            &format!("/api/products/{id}"),
            Some(&token),
            Some(serde_json::json!({
                "palette_entries": [
                    { "product_name": "Kauknochen", "quantity": 5, "unit_price": "2.50" },
                    { "product_name": "Futterbeutel", "quantity": 3, "unit_price": "4.00" }
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let entries = json["data"]["palette_entries"].as_array().expect("entries");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["position"].as_i64(), Some(1));

        // Content lines on a standard product are rejected.
        let (status, json) = send(
            app.clone(),
            "POST",
            "/api/products",
            Some(&token),
            Some(serde_json::json!({
                "name": "Smoothie",
                "department": "food",
                "palette_entries": [{ "product_name": "Egal", "quantity": 1 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json["error"].as_str(),
            Some("palette_entries are only valid for palette products")
        );

        let (status, _) = send(app, "GET", "/api/products/nicht-gültig", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn preorders_default_to_the_session_account(pool: sqlx::PgPool) {
        let anna = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &anna).await;
        let app = test_app(pool);

        let (status, _) = send(
            app.clone(),
            "POST",
            "/api/markets",
            Some(&token),
            Some(serde_json::json!({ "id": "M-1", "name": "Spar Linz" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, json) = send(
            app.clone(),
            "POST",
            "/api/products",
            Some(&token),
            Some(serde_json::json!({ "name": "Smoothie", "department": "food", "price": "1.99" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let product_id = json["data"]["id"].as_str().expect("id").to_owned();

        // Name and price come from the catalog when only the id is given.
        let (status, json) = send(
            app.clone(),
            "POST",
            "/api/preorders",
            Some(&token),
            Some(serde_json::json!({ "market_id": "M-1", "product_id": product_id, "quantity": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["product_name"].as_str(), Some("Smoothie"));
        assert_eq!(json["data"]["unit_price"].as_str(), Some("1.99"));
        assert_eq!(
            json["data"]["gebietsleiter_id"].as_str(),
            Some(anna.id.to_string().as_str())
        );
        let preorder_id = json["data"]["id"].as_str().expect("id").to_owned();

        let (status, json) = send(app.clone(), "GET", "/api/preorders?market=M-1", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().map(Vec::len), Some(1));

        let (status, _) = send(
            app,
            "DELETE",
            &format!("/api/preorders/{preorder_id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn preorders_require_some_product_reference(pool: sqlx::PgPool) {
        let anna = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &anna).await;
        let app = test_app(pool);

        let (status, json) = send(
            app,
            "POST",
            "/api/preorders",
            Some(&token),
            Some(serde_json::json!({ "market_id": "M-1", "quantity": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json["error"].as_str(),
            Some("either product_id or product_name is required")
        );
    }

    // -------------------------------------------------------------------------
    // Tour planning
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn route_plan_orders_stops_and_reports_unlocated(pool: sqlx::PgPool) {
        let anna = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &anna).await;
        let app = test_app(pool);

        let (status, json) = send(
            app,
            "POST",
            "/api/routes/plan",
            Some(&token),
            Some(serde_json::json!({ "markets": [
                { "id": "A", "name": "A Markt", "latitude": 0.0, "longitude": 0.0 },
                { "id": "C", "name": "C Markt", "latitude": 0.0, "longitude": 3.0 },
                { "id": "B", "name": "B Markt", "latitude": 0.0, "longitude": 1.0 },
                { "id": "U", "name": "U Markt" }
            ] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let order: Vec<&str> = json["data"]["optimized_order"]
            .as_array()
            .expect("order")
            .iter()
            .filter_map(serde_json::Value::as_str)
            .collect();
        assert_eq!(order, ["A", "B", "C", "U"]);
        assert_eq!(
            json["data"]["unlocated"].as_array().map(Vec::len),
            Some(1)
        );
        assert_eq!(json["data"]["unlocated"][0].as_str(), Some("U"));
        assert_eq!(json["data"]["total_work_time"].as_u64(), Some(180));
        assert_eq!(
            json["data"]["total_time"].as_u64(),
            Some(
                json["data"]["total_driving_time"].as_u64().expect("driving")
                    + json["data"]["total_work_time"].as_u64().expect("work")
            )
        );

        let legs = json["data"]["legs"].as_array().expect("legs");
        assert_eq!(legs.len(), 3);
        assert!(legs[2]["distance_km"].is_null(), "leg into U has no distance");
        assert_eq!(legs[2]["driving_minutes"].as_u64(), Some(0));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn driving_times_report_missing_configuration(pool: sqlx::PgPool) {
        let anna = seed_account(&pool, "anna", "gl").await;
        let token = open_session(&pool, &anna).await;
        let app = test_app(pool);

        let (status, json) = send(
            app,
            "POST",
            "/api/maps/driving-times",
            Some(&token),
            Some(serde_json::json!({ "pairs": [
                { "origin_address": "Linz", "destination_address": "Graz" }
            ] })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json["error"].as_str(),
            Some("driving time lookups are not configured")
        );
    }
}
