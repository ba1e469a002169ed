//! Market CRUD, master-list import, and the daily visit counter.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{CurrentUser, RequestId};

use super::{
    map_db_error, normalize_limit, normalize_offset, record_audit, require_admin, ApiError,
    ApiResponse, AppState, ResponseMeta,
};

/// Visits per year when a request carries no frequency.
const DEFAULT_VISIT_FREQUENCY: i32 = 12;

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct MarketData {
    id: String,
    name: String,
    address: String,
    city: String,
    postal_code: String,
    chain: String,
    frequency: i32,
    current_visits: i32,
    last_visit: Option<NaiveDate>,
    is_active: bool,
    gebietsleiter_id: Option<Uuid>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    channel: Option<String>,
    banner: Option<String>,
    branch: Option<String>,
    customer_type: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    maingroup: Option<String>,
    subgroup: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<rover_db::MarketRow> for MarketData {
    fn from(row: rover_db::MarketRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            address: row.address,
            city: row.city,
            postal_code: row.postal_code,
            chain: row.chain,
            frequency: row.frequency,
            current_visits: row.current_visits,
            last_visit: row.last_visit,
            is_active: row.is_active,
            gebietsleiter_id: row.gebietsleiter_id,
            latitude: row.latitude,
            longitude: row.longitude,
            channel: row.channel,
            banner: row.banner,
            branch: row.branch,
            customer_type: row.customer_type,
            phone: row.phone,
            email: row.email,
            maingroup: row.maingroup,
            subgroup: row.subgroup,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct VisitData {
    /// False when the market was already visited today.
    counted: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct ImportSummary {
    inserted: u64,
    updated: u64,
    failed: usize,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct MarketQuery {
    pub gl: Option<Uuid>,
    pub chain: Option<String>,
    pub q: Option<String>,
    pub active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateMarketRequest {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub chain: Option<String>,
    pub frequency: Option<i32>,
    pub is_active: Option<bool>,
    pub gebietsleiter_id: Option<Uuid>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub channel: Option<String>,
    pub banner: Option<String>,
    pub branch: Option<String>,
    pub customer_type: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub maingroup: Option<String>,
    pub subgroup: Option<String>,
}

// Option<Option<T>> is intentional: outer None = "not in request" (keep current),
// Some(None) = "explicitly cleared", Some(Some(v)) = "set to value".
#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateMarketRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub chain: Option<String>,
    pub frequency: Option<i32>,
    pub is_active: Option<bool>,
    pub channel: Option<String>,
    pub banner: Option<String>,
    pub branch: Option<String>,
    pub customer_type: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub maingroup: Option<String>,
    pub subgroup: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub gebietsleiter_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub latitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub longitude: Option<Option<f64>>,
}

/// One record of a bulk import. Rows without an id or name are counted
/// as failed without aborting the batch.
#[derive(Debug, Deserialize)]
pub(super) struct ImportRow {
    pub id: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub chain: Option<String>,
    pub frequency: Option<i32>,
    pub is_active: Option<bool>,
    pub channel: Option<String>,
    pub banner: Option<String>,
    pub branch: Option<String>,
    pub customer_type: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub maingroup: Option<String>,
    pub subgroup: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_market_id(req_id: &str, id: &str) -> Result<(), ApiError> {
    if id.is_empty() || id.len() > 32 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "id must be 1–32 characters",
        ));
    }
    Ok(())
}

fn validate_name(req_id: &str, name: &str) -> Result<(), ApiError> {
    if name.is_empty() || name.len() > 200 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "name must be 1–200 characters",
        ));
    }
    Ok(())
}

fn validate_frequency(req_id: &str, frequency: i32) -> Result<(), ApiError> {
    if frequency < 1 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("frequency must be at least 1, got {frequency}"),
        ));
    }
    Ok(())
}

fn validate_coordinate(req_id: &str, field: &str, value: f64, bound: f64) -> Result<(), ApiError> {
    if value.is_finite() && (-bound..=bound).contains(&value) {
        Ok(())
    } else {
        Err(ApiError::new(
            req_id,
            "validation_error",
            format!("{field} must be between -{bound} and {bound}, got {value}"),
        ))
    }
}

fn map_unique_violation(req_id: &str, e: &rover_db::DbError, id: &str) -> ApiError {
    if let rover_db::DbError::Sqlx(sqlx::Error::Database(db_err)) = e {
        if db_err.is_unique_violation() {
            return ApiError::new(req_id, "conflict", format!("market '{id}' already exists"));
        }
    }
    map_db_error(req_id.to_owned(), e)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/markets — list markets with optional filters.
pub(super) async fn list_markets(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<MarketQuery>,
) -> Result<Json<ApiResponse<Vec<MarketData>>>, ApiError> {
    let rows = rover_db::list_markets(
        &state.pool,
        rover_db::MarketFilters {
            gebietsleiter_id: query.gl,
            chain: query.chain.as_deref(),
            q: query.q.as_deref(),
            active: query.active,
            limit: normalize_limit(query.limit),
            offset: normalize_offset(query.offset),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(MarketData::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/markets — create a market.
pub(super) async fn create_market(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateMarketRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MarketData>>), ApiError> {
    let rid = &req_id.0;

    let id = body.id.trim().to_owned();
    validate_market_id(rid, &id)?;
    let name = body.name.trim().to_owned();
    validate_name(rid, &name)?;
    let frequency = body.frequency.unwrap_or(DEFAULT_VISIT_FREQUENCY);
    validate_frequency(rid, frequency)?;
    if let Some(latitude) = body.latitude {
        validate_coordinate(rid, "latitude", latitude, 90.0)?;
    }
    if let Some(longitude) = body.longitude {
        validate_coordinate(rid, "longitude", longitude, 180.0)?;
    }

    let new = rover_db::NewMarket {
        id: id.clone(),
        name,
        address: body.address.unwrap_or_default(),
        city: body.city.unwrap_or_default(),
        postal_code: body.postal_code.unwrap_or_default(),
        chain: rover_core::normalize_chain(body.chain.as_deref().unwrap_or("")),
        frequency,
        is_active: body.is_active.unwrap_or(true),
        gebietsleiter_id: body.gebietsleiter_id,
        latitude: body.latitude,
        longitude: body.longitude,
        channel: body.channel,
        banner: body.banner,
        branch: body.branch,
        customer_type: body.customer_type,
        phone: body.phone,
        email: body.email,
        maingroup: body.maingroup,
        subgroup: body.subgroup,
    };

    let row = rover_db::create_market(&state.pool, &new)
        .await
        .map_err(|e| map_unique_violation(rid, &e, &id))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: MarketData::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/markets/{id} — fetch a single market.
pub(super) async fn get_market(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MarketData>>, ApiError> {
    let row = rover_db::get_market(&state.pool, &id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: MarketData::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PUT /api/markets/{id} — sparse update; absent fields keep their value.
pub(super) async fn update_market(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(body): Json<UpdateMarketRequest>,
) -> Result<Json<ApiResponse<MarketData>>, ApiError> {
    let rid = &req_id.0;

    let name = body.name.as_ref().map(|n| n.trim().to_owned());
    if let Some(ref name) = name {
        validate_name(rid, name)?;
    }
    if let Some(frequency) = body.frequency {
        validate_frequency(rid, frequency)?;
    }
    if let Some(Some(latitude)) = body.latitude {
        validate_coordinate(rid, "latitude", latitude, 90.0)?;
    }
    if let Some(Some(longitude)) = body.longitude {
        validate_coordinate(rid, "longitude", longitude, 180.0)?;
    }

    let update = rover_db::MarketUpdate {
        name,
        address: body.address,
        city: body.city,
        postal_code: body.postal_code,
        chain: body.chain.as_deref().map(rover_core::normalize_chain),
        frequency: body.frequency,
        is_active: body.is_active,
        channel: body.channel,
        banner: body.banner,
        branch: body.branch,
        customer_type: body.customer_type,
        phone: body.phone,
        email: body.email,
        maingroup: body.maingroup,
        subgroup: body.subgroup,
        gebietsleiter_id: body.gebietsleiter_id,
        latitude: body.latitude,
        longitude: body.longitude,
    };

    let row = rover_db::update_market(&state.pool, &id, &update)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: MarketData::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/markets/{id} — remove a market and its dependent records.
pub(super) async fn delete_market(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    rover_db::delete_market(&state.pool, &id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/markets/{id}/visit — count a visit, at most once per calendar day.
pub(super) async fn record_visit(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<VisitData>>, ApiError> {
    let counted = rover_db::record_visit(&state.pool, &id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: VisitData { counted },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/markets/import — bulk upsert of the master list.
///
/// The body is a JSON array of records as parsed from the source sheet.
/// Operational fields (visit counters, rep assignment, coordinates) are
/// untouched for markets that already exist.
pub(super) async fn import_markets(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Json(rows): Json<Vec<ImportRow>>,
) -> Result<Json<ApiResponse<ImportSummary>>, ApiError> {
    let rid = &req_id.0;
    require_admin(rid, &user)?;

    let total = rows.len();
    let records: Vec<rover_db::MarketUpsert> = rows.into_iter().filter_map(to_upsert).collect();
    let failed = total - records.len();

    let (inserted, updated) = rover_db::upsert_markets(&state.pool, &records)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    record_audit(
        &state.pool,
        &user.0.username,
        "markets_imported",
        None,
        format!("imported {} market records", records.len()),
        serde_json::json!({ "inserted": inserted, "updated": updated, "failed": failed }),
    )
    .await;

    Ok(Json(ApiResponse {
        data: ImportSummary {
            inserted,
            updated,
            failed,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn to_upsert(row: ImportRow) -> Option<rover_db::MarketUpsert> {
    let id = row.id?.trim().to_owned();
    let name = row.name?.trim().to_owned();
    if id.is_empty() || name.is_empty() {
        return None;
    }

    Some(rover_db::MarketUpsert {
        id,
        name,
        address: row.address.unwrap_or_default(),
        city: row.city.unwrap_or_default(),
        postal_code: row.postal_code.unwrap_or_default(),
        chain: rover_core::normalize_chain(row.chain.as_deref().unwrap_or("")),
        frequency: row.frequency.unwrap_or(DEFAULT_VISIT_FREQUENCY).max(1),
        is_active: row.is_active.unwrap_or(true),
        channel: row.channel,
        banner: row.banner,
        branch: row.branch,
        customer_type: row.customer_type,
        phone: row.phone,
        email: row.email,
        maingroup: row.maingroup,
        subgroup: row.subgroup,
    })
}
