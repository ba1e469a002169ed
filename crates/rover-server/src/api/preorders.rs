//! Preorders logged by reps during market visits. Product name and unit
//! price are snapshotted at order time so later catalog edits do not
//! rewrite history.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{CurrentUser, RequestId};

use super::{
    map_db_error, normalize_limit, normalize_offset, parse_uuid, ApiError, ApiResponse, AppState,
    ResponseMeta,
};

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct PreorderData {
    id: Uuid,
    gebietsleiter_id: Uuid,
    market_id: String,
    wave_id: Option<Uuid>,
    product_id: Option<Uuid>,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
    delivery_date: Option<NaiveDate>,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<rover_db::PreorderRow> for PreorderData {
    fn from(row: rover_db::PreorderRow) -> Self {
        Self {
            id: row.id,
            gebietsleiter_id: row.gebietsleiter_id,
            market_id: row.market_id,
            wave_id: row.wave_id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            delivery_date: row.delivery_date,
            note: row.note,
            created_at: row.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct PreorderQuery {
    pub gl: Option<Uuid>,
    pub wave: Option<Uuid>,
    pub market: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreatePreorderRequest {
    /// Defaults to the calling session's account.
    pub gebietsleiter_id: Option<Uuid>,
    pub market_id: String,
    pub wave_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
    pub delivery_date: Option<NaiveDate>,
    pub note: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/preorders — list preorders, newest first.
pub(super) async fn list_preorders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PreorderQuery>,
) -> Result<Json<ApiResponse<Vec<PreorderData>>>, ApiError> {
    let rows = rover_db::list_preorders(
        &state.pool,
        rover_db::PreorderFilters {
            gebietsleiter_id: query.gl,
            wave_id: query.wave,
            market_id: query.market.as_deref(),
            limit: normalize_limit(query.limit),
            offset: normalize_offset(query.offset),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(PreorderData::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/preorders — log a preorder. Name and price are filled from
/// the catalog when a product id is given without them.
pub(super) async fn create_preorder(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreatePreorderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PreorderData>>), ApiError> {
    let rid = &req_id.0;

    let market_id = body.market_id.trim().to_owned();
    if market_id.is_empty() {
        return Err(ApiError::new(rid, "validation_error", "market_id must not be empty"));
    }
    if body.quantity < 1 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("quantity must be at least 1, got {}", body.quantity),
        ));
    }

    let mut product_name = body
        .product_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_owned);
    let mut unit_price = body.unit_price;

    if let Some(product_id) = body.product_id {
        if product_name.is_none() || unit_price.is_none() {
            let product = rover_db::get_product(&state.pool, product_id)
                .await
                .map_err(|e| map_db_error(rid.clone(), &e))?;
            if product_name.is_none() {
                product_name = Some(product.name);
            }
            if unit_price.is_none() {
                unit_price = Some(product.price);
            }
        }
    }

    let Some(product_name) = product_name else {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "either product_id or product_name is required",
        ));
    };

    let new = rover_db::NewPreorder {
        gebietsleiter_id: body.gebietsleiter_id.unwrap_or(user.0.id),
        market_id,
        wave_id: body.wave_id,
        product_id: body.product_id,
        product_name,
        quantity: body.quantity,
        unit_price: unit_price.unwrap_or(Decimal::ZERO),
        delivery_date: body.delivery_date,
        note: body.note,
    };

    let row = rover_db::create_preorder(&state.pool, &new)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: PreorderData::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// DELETE /api/preorders/{id} — drop a preorder.
pub(super) async fn delete_preorder(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let id = parse_uuid(rid, &id)?;

    rover_db::delete_preorder(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(StatusCode::NO_CONTENT)
}
