//! Row and input types for wave tracking.

use chrono::{DateTime, NaiveDate, Utc};
use rover_core::WaveItemType;
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

/// A row from the `waves` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WaveRow {
    pub id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Free-form annotations keyed by ISO calendar week.
    pub week_notes: Value,
    pub item_type: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `wave_participants` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WaveParticipantRow {
    pub wave_id: Uuid,
    pub gebietsleiter_id: Uuid,
    pub display_target: i32,
    pub kartonware_target: i32,
}

/// A row from the `wave_entries` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WaveEntryRow {
    pub id: Uuid,
    pub wave_id: Uuid,
    pub gebietsleiter_id: Uuid,
    pub market_id: String,
    pub display_count: i32,
    pub kartonware_count: i32,
    pub recorded_at: DateTime<Utc>,
}

/// Input for one participating rep with targets.
#[derive(Debug, Clone)]
pub struct NewWaveParticipant {
    pub gebietsleiter_id: Uuid,
    pub display_target: i32,
    pub kartonware_target: i32,
}

/// Input for creating a wave together with its participant set.
#[derive(Debug, Clone)]
pub struct NewWave {
    pub name: String,
    pub image_url: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub week_notes: Option<Value>,
    pub item_type: WaveItemType,
    pub participants: Vec<NewWaveParticipant>,
}

/// Partial update for a wave.
///
/// `Some(participants)` replaces the whole participant set; the doubled
/// option on `image_url` distinguishes "leave unchanged" from "clear".
#[derive(Debug, Clone, Default)]
pub struct WaveUpdate {
    pub name: Option<String>,
    pub image_url: Option<Option<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub week_notes: Option<Value>,
    pub item_type: Option<WaveItemType>,
    pub is_active: Option<bool>,
    pub participants: Option<Vec<NewWaveParticipant>>,
}

/// Input filters for the chain-average aggregation.
#[derive(Debug, Clone, Default)]
pub struct ChainAverageFilters<'a> {
    pub gl_ids: Option<&'a [Uuid]>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub item_type: Option<&'a str>,
}

/// Per-chain averages over recorded wave entries.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChainAverageRow {
    pub chain: String,
    pub market_count: i64,
    pub entry_count: i64,
    pub avg_display_count: Decimal,
    pub avg_kartonware_count: Decimal,
}

/// Input filters for the per-wave progress view.
#[derive(Debug, Clone, Default)]
pub struct WaveDashboardFilters<'a> {
    pub gl_ids: Option<&'a [Uuid]>,
    pub item_type: Option<&'a str>,
}

/// Per-wave progress: recorded counts against targets plus coverage of
/// the participating reps' assigned markets.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WaveDashboardRow {
    pub wave_id: Uuid,
    pub wave_name: String,
    pub item_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub participant_count: i64,
    pub display_target_total: i64,
    pub kartonware_target_total: i64,
    pub display_recorded: i64,
    pub kartonware_recorded: i64,
    pub markets_recorded: i64,
    pub markets_assigned: i64,
}
