//! Product catalog endpoints, including palette composition.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rover_core::{Department, ProductType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, normalize_offset, parse_uuid, ApiError, ApiResponse, AppState,
    ResponseMeta,
};

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct ProductData {
    id: Uuid,
    name: String,
    department: String,
    product_type: String,
    weight: Option<String>,
    content: Option<String>,
    pallet_size: Option<i32>,
    price: Decimal,
    artikel_nr: Option<String>,
    sku: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<rover_db::ProductRow> for ProductData {
    fn from(row: rover_db::ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            department: row.department,
            product_type: row.product_type,
            weight: row.weight,
            content: row.content,
            pallet_size: row.pallet_size,
            price: row.price,
            artikel_nr: row.artikel_nr,
            sku: row.sku,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PaletteEntryData {
    id: Uuid,
    product_id: Option<Uuid>,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
    position: i32,
}

impl From<rover_db::PaletteEntryRow> for PaletteEntryData {
    fn from(row: rover_db::PaletteEntryRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            position: row.position,
        }
    }
}

/// Full product view. `palette_entries` is empty for non-palettes.
#[derive(Debug, Serialize)]
pub(super) struct ProductDetail {
    #[serde(flatten)]
    product: ProductData,
    palette_entries: Vec<PaletteEntryData>,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct ProductQuery {
    pub department: Option<String>,
    pub product_type: Option<String>,
    pub q: Option<String>,
    pub active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PaletteEntryInput {
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateProductRequest {
    pub name: String,
    pub department: String,
    pub product_type: Option<String>,
    pub weight: Option<String>,
    pub content: Option<String>,
    pub pallet_size: Option<i32>,
    pub price: Option<Decimal>,
    pub artikel_nr: Option<String>,
    pub sku: Option<String>,
    #[serde(default)]
    pub palette_entries: Vec<PaletteEntryInput>,
}

// Option<Option<T>> is intentional: outer None = "not in request" (keep current),
// Some(None) = "explicitly cleared", Some(Some(v)) = "set to value".
#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateProductRequest {
    pub name: Option<String>,
    pub weight: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub pallet_size: Option<Option<i32>>,
    pub price: Option<Decimal>,
    pub artikel_nr: Option<String>,
    pub sku: Option<String>,
    pub is_active: Option<bool>,
    /// When present, the palette content is replaced wholesale.
    pub palette_entries: Option<Vec<PaletteEntryInput>>,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

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

fn to_new_entries(
    req_id: &str,
    inputs: &[PaletteEntryInput],
) -> Result<Vec<rover_db::NewPaletteEntry>, ApiError> {
    let mut entries = Vec::with_capacity(inputs.len());
    for input in inputs {
        let product_name = input.product_name.trim().to_owned();
        if product_name.is_empty() {
            return Err(ApiError::new(
                req_id,
                "validation_error",
                "palette entry product_name must not be empty",
            ));
        }
        if input.quantity < 1 {
            return Err(ApiError::new(
                req_id,
                "validation_error",
                format!("palette entry quantity must be at least 1, got {}", input.quantity),
            ));
        }
        entries.push(rover_db::NewPaletteEntry {
            product_id: input.product_id,
            product_name,
            quantity: input.quantity,
            unit_price: input.unit_price.unwrap_or(Decimal::ZERO),
        });
    }
    Ok(entries)
}

async fn load_detail(
    state: &AppState,
    req_id: &str,
    row: rover_db::ProductRow,
) -> Result<ProductDetail, ApiError> {
    let palette_entries = if row.product_type == ProductType::Palette.as_str() {
        rover_db::get_palette_entries(&state.pool, row.id)
            .await
            .map_err(|e| map_db_error(req_id.to_owned(), &e))?
            .into_iter()
            .map(PaletteEntryData::from)
            .collect()
    } else {
        Vec::new()
    };

    Ok(ProductDetail {
        product: ProductData::from(row),
        palette_entries,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/products — list products with optional filters.
pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<Vec<ProductData>>>, ApiError> {
    let rows = rover_db::list_products(
        &state.pool,
        rover_db::ProductFilters {
            department: query.department.as_deref(),
            product_type: query.product_type.as_deref(),
            q: query.q.as_deref(),
            active: query.active,
            limit: normalize_limit(query.limit),
            offset: normalize_offset(query.offset),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ProductData::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/products — create a product; palettes may carry content lines.
pub(super) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductDetail>>), ApiError> {
    let rid = &req_id.0;

    let name = body.name.trim().to_owned();
    validate_name(rid, &name)?;
    let department: Department = body
        .department
        .trim()
        .parse()
        .map_err(|e: rover_core::ConfigError| ApiError::new(rid, "validation_error", e.to_string()))?;
    let product_type: ProductType = body
        .product_type
        .as_deref()
        .unwrap_or("standard")
        .trim()
        .parse()
        .map_err(|e: rover_core::ConfigError| ApiError::new(rid, "validation_error", e.to_string()))?;

    if product_type != ProductType::Palette && !body.palette_entries.is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "palette_entries are only valid for palette products",
        ));
    }
    let entries = to_new_entries(rid, &body.palette_entries)?;

    let new = rover_db::NewProduct {
        name,
        department,
        product_type,
        weight: body.weight,
        content: body.content,
        pallet_size: body.pallet_size,
        price: body.price.unwrap_or(Decimal::ZERO),
        artikel_nr: body.artikel_nr,
        sku: body.sku,
    };

    let row = rover_db::create_product(&state.pool, &new, &entries)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let detail = load_detail(&state, rid, row).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: detail,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/products/{id} — fetch a product with its palette content.
pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProductDetail>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_uuid(rid, &id)?;

    let row = rover_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let detail = load_detail(&state, rid, row).await?;

    Ok(Json(ApiResponse {
        data: detail,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PUT /api/products/{id} — sparse update; palette prices stay at zero.
pub(super) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductDetail>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_uuid(rid, &id)?;

    let name = body.name.as_ref().map(|n| n.trim().to_owned());
    if let Some(ref name) = name {
        validate_name(rid, name)?;
    }

    // Replace content first: the palette check happens inside its own
    // transaction, so an invalid request leaves the row untouched.
    let replaced = match body.palette_entries {
        Some(ref inputs) => {
            let entries = to_new_entries(rid, inputs)?;
            Some(
                rover_db::replace_palette_entries(&state.pool, id, &entries)
                    .await
                    .map_err(|e| map_db_error(rid.clone(), &e))?,
            )
        }
        None => None,
    };

    let update = rover_db::ProductUpdate {
        name,
        weight: body.weight,
        content: body.content,
        pallet_size: body.pallet_size,
        price: body.price,
        artikel_nr: body.artikel_nr,
        sku: body.sku,
        is_active: body.is_active,
    };

    let row = rover_db::update_product(&state.pool, id, &update)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let detail = match replaced {
        Some(rows) => ProductDetail {
            product: ProductData::from(row),
            palette_entries: rows.into_iter().map(PaletteEntryData::from).collect(),
        },
        None => load_detail(&state, rid, row).await?,
    };

    Ok(Json(ApiResponse {
        data: detail,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/products/{id} — remove a product.
pub(super) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let id = parse_uuid(rid, &id)?;

    rover_db::delete_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(StatusCode::NO_CONTENT)
}
