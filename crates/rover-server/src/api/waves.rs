//! Placement waves: campaign windows with per-rep targets, recorded
//! per-market progress, and the two dashboard aggregations.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rover_core::WaveItemType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::middleware::{CurrentUser, RequestId};

use super::{map_db_error, parse_uuid, ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct WaveData {
    id: Uuid,
    name: String,
    image_url: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    week_notes: Value,
    item_type: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<rover_db::WaveRow> for WaveData {
    fn from(row: rover_db::WaveRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            image_url: row.image_url,
            start_date: row.start_date,
            end_date: row.end_date,
            week_notes: row.week_notes,
            item_type: row.item_type,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ParticipantData {
    gebietsleiter_id: Uuid,
    display_target: i32,
    kartonware_target: i32,
}

impl From<rover_db::WaveParticipantRow> for ParticipantData {
    fn from(row: rover_db::WaveParticipantRow) -> Self {
        Self {
            gebietsleiter_id: row.gebietsleiter_id,
            display_target: row.display_target,
            kartonware_target: row.kartonware_target,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct WaveDetail {
    #[serde(flatten)]
    wave: WaveData,
    participants: Vec<ParticipantData>,
}

#[derive(Debug, Serialize)]
pub(super) struct EntryData {
    id: Uuid,
    wave_id: Uuid,
    gebietsleiter_id: Uuid,
    market_id: String,
    display_count: i32,
    kartonware_count: i32,
    recorded_at: DateTime<Utc>,
}

impl From<rover_db::WaveEntryRow> for EntryData {
    fn from(row: rover_db::WaveEntryRow) -> Self {
        Self {
            id: row.id,
            wave_id: row.wave_id,
            gebietsleiter_id: row.gebietsleiter_id,
            market_id: row.market_id,
            display_count: row.display_count,
            kartonware_count: row.kartonware_count,
            recorded_at: row.recorded_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ChainAverageData {
    chain: String,
    market_count: i64,
    entry_count: i64,
    avg_display_count: Decimal,
    avg_kartonware_count: Decimal,
}

impl From<rover_db::ChainAverageRow> for ChainAverageData {
    fn from(row: rover_db::ChainAverageRow) -> Self {
        Self {
            chain: row.chain,
            market_count: row.market_count,
            entry_count: row.entry_count,
            avg_display_count: row.avg_display_count,
            avg_kartonware_count: row.avg_kartonware_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct DashboardData {
    wave_id: Uuid,
    wave_name: String,
    item_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    participant_count: i64,
    display_target_total: i64,
    kartonware_target_total: i64,
    display_recorded: i64,
    kartonware_recorded: i64,
    markets_recorded: i64,
    markets_assigned: i64,
}

impl From<rover_db::WaveDashboardRow> for DashboardData {
    fn from(row: rover_db::WaveDashboardRow) -> Self {
        Self {
            wave_id: row.wave_id,
            wave_name: row.wave_name,
            item_type: row.item_type,
            start_date: row.start_date,
            end_date: row.end_date,
            participant_count: row.participant_count,
            display_target_total: row.display_target_total,
            kartonware_target_total: row.kartonware_target_total,
            display_recorded: row.display_recorded,
            kartonware_recorded: row.kartonware_recorded,
            markets_recorded: row.markets_recorded,
            markets_assigned: row.markets_assigned,
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct WaveQuery {
    pub active: Option<bool>,
    pub item_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChainAverageQuery {
    /// Comma-separated gebietsleiter ids.
    pub gl_ids: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub item_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DashboardQuery {
    pub gl_ids: Option<String>,
    pub item_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ParticipantInput {
    pub gebietsleiter_id: Uuid,
    #[serde(default)]
    pub display_target: i32,
    #[serde(default)]
    pub kartonware_target: i32,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateWaveRequest {
    pub name: String,
    pub image_url: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub week_notes: Option<Value>,
    pub item_type: String,
    #[serde(default)]
    pub participants: Vec<ParticipantInput>,
}

// Option<Option<T>> is intentional: outer None = "not in request" (keep current),
// Some(None) = "explicitly cleared", Some(Some(v)) = "set to value".
#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateWaveRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub image_url: Option<Option<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Replaces the whole notes blob when present.
    pub week_notes: Option<Value>,
    pub item_type: Option<String>,
    pub is_active: Option<bool>,
    /// Replaces the whole participant set when present.
    pub participants: Option<Vec<ParticipantInput>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RecordEntryRequest {
    /// Defaults to the calling session's account.
    pub gebietsleiter_id: Option<Uuid>,
    pub market_id: String,
    #[serde(default)]
    pub display_count: i32,
    #[serde(default)]
    pub kartonware_count: i32,
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

fn validate_dates(req_id: &str, start_date: NaiveDate, end_date: NaiveDate) -> Result<(), ApiError> {
    if end_date < start_date {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "end_date must not be before start_date",
        ));
    }
    Ok(())
}

fn validate_count(req_id: &str, field: &str, value: i32) -> Result<(), ApiError> {
    if value < 0 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("{field} must not be negative, got {value}"),
        ));
    }
    Ok(())
}

fn parse_item_type(req_id: &str, raw: &str) -> Result<WaveItemType, ApiError> {
    raw.trim()
        .parse()
        .map_err(|e: rover_core::ConfigError| ApiError::new(req_id, "validation_error", e.to_string()))
}

fn parse_gl_ids(req_id: &str, raw: &str) -> Result<Vec<Uuid>, ApiError> {
    let mut ids = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id = part.parse().map_err(|_| {
            ApiError::new(req_id, "validation_error", format!("invalid gl id '{part}'"))
        })?;
        ids.push(id);
    }
    Ok(ids)
}

fn to_participants(
    req_id: &str,
    inputs: &[ParticipantInput],
) -> Result<Vec<rover_db::NewWaveParticipant>, ApiError> {
    let mut participants = Vec::with_capacity(inputs.len());
    for input in inputs {
        validate_count(req_id, "display_target", input.display_target)?;
        validate_count(req_id, "kartonware_target", input.kartonware_target)?;
        participants.push(rover_db::NewWaveParticipant {
            gebietsleiter_id: input.gebietsleiter_id,
            display_target: input.display_target,
            kartonware_target: input.kartonware_target,
        });
    }
    Ok(participants)
}

async fn load_detail(
    state: &AppState,
    req_id: &str,
    row: rover_db::WaveRow,
) -> Result<WaveDetail, ApiError> {
    let participants = rover_db::list_wave_participants(&state.pool, row.id)
        .await
        .map_err(|e| map_db_error(req_id.to_owned(), &e))?
        .into_iter()
        .map(ParticipantData::from)
        .collect();

    Ok(WaveDetail {
        wave: WaveData::from(row),
        participants,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/wellen — list waves, newest start date first.
pub(super) async fn list_waves(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<WaveQuery>,
) -> Result<Json<ApiResponse<Vec<WaveData>>>, ApiError> {
    let rid = &req_id.0;
    let item_type = match query.item_type.as_deref() {
        Some(raw) => Some(parse_item_type(rid, raw)?),
        None => None,
    };

    let rows = rover_db::list_waves(
        &state.pool,
        query.active,
        item_type.map(|t| t.as_str()),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(WaveData::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/wellen — create a wave with its participant set.
pub(super) async fn create_wave(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateWaveRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WaveDetail>>), ApiError> {
    let rid = &req_id.0;

    let name = body.name.trim().to_owned();
    validate_name(rid, &name)?;
    validate_dates(rid, body.start_date, body.end_date)?;
    let item_type = parse_item_type(rid, &body.item_type)?;
    let participants = to_participants(rid, &body.participants)?;

    let new = rover_db::NewWave {
        name,
        image_url: body.image_url,
        start_date: body.start_date,
        end_date: body.end_date,
        week_notes: body.week_notes,
        item_type,
        participants,
    };

    let row = rover_db::create_wave(&state.pool, &new)
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

/// GET /api/wellen/{id} — fetch a wave with participants.
pub(super) async fn get_wave(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<WaveDetail>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_uuid(rid, &id)?;

    let row = rover_db::get_wave(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let detail = load_detail(&state, rid, row).await?;

    Ok(Json(ApiResponse {
        data: detail,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PUT /api/wellen/{id} — sparse update; a participant list replaces
/// the existing set wholesale.
pub(super) async fn update_wave(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(body): Json<UpdateWaveRequest>,
) -> Result<Json<ApiResponse<WaveDetail>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_uuid(rid, &id)?;

    let name = body.name.as_ref().map(|n| n.trim().to_owned());
    if let Some(ref name) = name {
        validate_name(rid, name)?;
    }
    if let (Some(start_date), Some(end_date)) = (body.start_date, body.end_date) {
        validate_dates(rid, start_date, end_date)?;
    }
    let item_type = match body.item_type.as_deref() {
        Some(raw) => Some(parse_item_type(rid, raw)?),
        None => None,
    };
    let participants = match body.participants {
        Some(ref inputs) => Some(to_participants(rid, inputs)?),
        None => None,
    };

    let update = rover_db::WaveUpdate {
        name,
        image_url: body.image_url,
        start_date: body.start_date,
        end_date: body.end_date,
        week_notes: body.week_notes,
        item_type,
        is_active: body.is_active,
        participants,
    };

    let row = rover_db::update_wave(&state.pool, id, &update)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let detail = load_detail(&state, rid, row).await?;

    Ok(Json(ApiResponse {
        data: detail,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/wellen/{id} — remove a wave and its entries.
pub(super) async fn delete_wave(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let id = parse_uuid(rid, &id)?;

    rover_db::delete_wave(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/wellen/{id}/entries — record progress for one market.
/// A repeat for the same (wave, rep, market) overwrites the counts.
pub(super) async fn record_entry(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<RecordEntryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<EntryData>>), ApiError> {
    let rid = &req_id.0;
    let wave_id = parse_uuid(rid, &id)?;

    validate_count(rid, "display_count", body.display_count)?;
    validate_count(rid, "kartonware_count", body.kartonware_count)?;
    let market_id = body.market_id.trim().to_owned();
    if market_id.is_empty() {
        return Err(ApiError::new(rid, "validation_error", "market_id must not be empty"));
    }
    let gebietsleiter_id = body.gebietsleiter_id.unwrap_or(user.0.id);

    let row = rover_db::record_wave_entry(
        &state.pool,
        wave_id,
        gebietsleiter_id,
        &market_id,
        body.display_count,
        body.kartonware_count,
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: EntryData::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/wellen/dashboard/chain-averages — average placements per chain.
pub(super) async fn chain_averages(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ChainAverageQuery>,
) -> Result<Json<ApiResponse<Vec<ChainAverageData>>>, ApiError> {
    let rid = &req_id.0;
    let gl_ids = match query.gl_ids.as_deref() {
        Some(raw) => Some(parse_gl_ids(rid, raw)?),
        None => None,
    };
    let item_type = match query.item_type.as_deref() {
        Some(raw) => Some(parse_item_type(rid, raw)?),
        None => None,
    };

    let rows = rover_db::list_chain_averages(
        &state.pool,
        rover_db::ChainAverageFilters {
            gl_ids: gl_ids.as_deref(),
            start_date: query.start_date,
            end_date: query.end_date,
            item_type: item_type.map(|t| t.as_str()),
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ChainAverageData::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/wellen/dashboard/waves — targets versus recorded per wave.
pub(super) async fn wave_dashboard(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<ApiResponse<Vec<DashboardData>>>, ApiError> {
    let rid = &req_id.0;
    let gl_ids = match query.gl_ids.as_deref() {
        Some(raw) => Some(parse_gl_ids(rid, raw)?),
        None => None,
    };
    let item_type = match query.item_type.as_deref() {
        Some(raw) => Some(parse_item_type(rid, raw)?),
        None => None,
    };

    let rows = rover_db::list_wave_dashboard(
        &state.pool,
        rover_db::WaveDashboardFilters {
            gl_ids: gl_ids.as_deref(),
            item_type: item_type.map(|t| t.as_str()),
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(DashboardData::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
