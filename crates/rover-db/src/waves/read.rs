//! Read operations and dashboard aggregations for wave tracking.

use sqlx::PgPool;
use uuid::Uuid;

use super::types::{
    ChainAverageFilters, ChainAverageRow, WaveDashboardFilters, WaveDashboardRow,
    WaveParticipantRow, WaveRow,
};
use crate::DbError;

/// Fetch a single wave by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_wave(pool: &PgPool, id: Uuid) -> Result<WaveRow, DbError> {
    let row = sqlx::query_as::<_, WaveRow>(
        "SELECT id, name, image_url, start_date, end_date, week_notes, item_type, \
                is_active, created_at, updated_at \
         FROM waves \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// List waves, most recent campaign first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_waves(
    pool: &PgPool,
    active: Option<bool>,
    item_type: Option<&str>,
) -> Result<Vec<WaveRow>, DbError> {
    let rows = sqlx::query_as::<_, WaveRow>(
        "SELECT id, name, image_url, start_date, end_date, week_notes, item_type, \
                is_active, created_at, updated_at \
         FROM waves \
         WHERE ($1::boolean IS NULL OR is_active = $1) \
           AND ($2::text IS NULL OR item_type = $2) \
         ORDER BY start_date DESC, id DESC",
    )
    .bind(active)
    .bind(item_type)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Return a wave's participant set with targets.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_wave_participants(
    pool: &PgPool,
    wave_id: Uuid,
) -> Result<Vec<WaveParticipantRow>, DbError> {
    let rows = sqlx::query_as::<_, WaveParticipantRow>(
        "SELECT wp.wave_id, wp.gebietsleiter_id, wp.display_target, wp.kartonware_target \
         FROM wave_participants wp \
         JOIN gebietsleiter g ON g.id = wp.gebietsleiter_id \
         WHERE wp.wave_id = $1 \
         ORDER BY g.username ASC",
    )
    .bind(wave_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Per-chain average display and kartonware counts over recorded entries.
///
/// The date range applies to `recorded_at` with an inclusive end date;
/// `item_type` filters on the owning wave.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_chain_averages(
    pool: &PgPool,
    filters: ChainAverageFilters<'_>,
) -> Result<Vec<ChainAverageRow>, DbError> {
    let rows = sqlx::query_as::<_, ChainAverageRow>(
        "SELECT m.chain, \
                COUNT(DISTINCT we.market_id) AS market_count, \
                COUNT(*) AS entry_count, \
                AVG(we.display_count) AS avg_display_count, \
                AVG(we.kartonware_count) AS avg_kartonware_count \
         FROM wave_entries we \
         JOIN waves w ON w.id = we.wave_id \
         JOIN markets m ON m.id = we.market_id \
         WHERE ($1::uuid[] IS NULL OR we.gebietsleiter_id = ANY($1)) \
           AND ($2::date IS NULL OR we.recorded_at >= $2) \
           AND ($3::date IS NULL OR we.recorded_at < ($3::date + 1)) \
           AND ($4::text IS NULL OR w.item_type = $4) \
         GROUP BY m.chain \
         ORDER BY m.chain ASC",
    )
    .bind(filters.gl_ids)
    .bind(filters.start_date)
    .bind(filters.end_date)
    .bind(filters.item_type)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Per-wave progress for active waves: targets, recorded counts, and
/// market coverage, optionally narrowed to a set of reps.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_wave_dashboard(
    pool: &PgPool,
    filters: WaveDashboardFilters<'_>,
) -> Result<Vec<WaveDashboardRow>, DbError> {
    let rows = sqlx::query_as::<_, WaveDashboardRow>(
        "WITH targets AS (\
             SELECT wave_id, \
                    COUNT(*) AS participant_count, \
                    SUM(display_target) AS display_target_total, \
                    SUM(kartonware_target) AS kartonware_target_total \
             FROM wave_participants \
             WHERE ($1::uuid[] IS NULL OR gebietsleiter_id = ANY($1)) \
             GROUP BY wave_id\
         ), recorded AS (\
             SELECT wave_id, \
                    SUM(display_count) AS display_recorded, \
                    SUM(kartonware_count) AS kartonware_recorded, \
                    COUNT(DISTINCT market_id) AS markets_recorded \
             FROM wave_entries \
             WHERE ($1::uuid[] IS NULL OR gebietsleiter_id = ANY($1)) \
             GROUP BY wave_id\
         ), assigned AS (\
             SELECT wp.wave_id, COUNT(DISTINCT m.id) AS markets_assigned \
             FROM wave_participants wp \
             JOIN markets m ON m.gebietsleiter_id = wp.gebietsleiter_id \
                           AND m.is_active = TRUE \
             WHERE ($1::uuid[] IS NULL OR wp.gebietsleiter_id = ANY($1)) \
             GROUP BY wp.wave_id\
         ) \
         SELECT w.id AS wave_id, \
                w.name AS wave_name, \
                w.item_type, \
                w.start_date, \
                w.end_date, \
                COALESCE(t.participant_count, 0) AS participant_count, \
                COALESCE(t.display_target_total, 0) AS display_target_total, \
                COALESCE(t.kartonware_target_total, 0) AS kartonware_target_total, \
                COALESCE(r.display_recorded, 0) AS display_recorded, \
                COALESCE(r.kartonware_recorded, 0) AS kartonware_recorded, \
                COALESCE(r.markets_recorded, 0) AS markets_recorded, \
                COALESCE(a.markets_assigned, 0) AS markets_assigned \
         FROM waves w \
         LEFT JOIN targets t ON t.wave_id = w.id \
         LEFT JOIN recorded r ON r.wave_id = w.id \
         LEFT JOIN assigned a ON a.wave_id = w.id \
         WHERE w.is_active = TRUE \
           AND ($2::text IS NULL OR w.item_type = $2) \
         ORDER BY w.start_date DESC, w.id DESC",
    )
    .bind(filters.gl_ids)
    .bind(filters.item_type)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
