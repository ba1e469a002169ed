//! Write operations for wave tracking.

use sqlx::PgPool;
use uuid::Uuid;

use super::types::{NewWave, NewWaveParticipant, WaveEntryRow, WaveRow, WaveUpdate};
use crate::DbError;

async fn insert_participants(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    wave_id: Uuid,
    participants: &[NewWaveParticipant],
) -> Result<(), DbError> {
    for participant in participants {
        sqlx::query(
            "INSERT INTO wave_participants \
                 (wave_id, gebietsleiter_id, display_target, kartonware_target) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (wave_id, gebietsleiter_id) DO UPDATE SET \
                 display_target    = EXCLUDED.display_target, \
                 kartonware_target = EXCLUDED.kartonware_target",
        )
        .bind(wave_id)
        .bind(participant.gebietsleiter_id)
        .bind(participant.display_target)
        .bind(participant.kartonware_target)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Create a wave together with its participant set.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; nothing is written on
/// failure.
pub async fn create_wave(pool: &PgPool, new: &NewWave) -> Result<WaveRow, DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, WaveRow>(
        "INSERT INTO waves (name, image_url, start_date, end_date, week_notes, item_type) \
         VALUES ($1, $2, $3, $4, COALESCE($5, '{}'::jsonb), $6) \
         RETURNING id, name, image_url, start_date, end_date, week_notes, item_type, \
                   is_active, created_at, updated_at",
    )
    .bind(&new.name)
    .bind(&new.image_url)
    .bind(new.start_date)
    .bind(new.end_date)
    .bind(&new.week_notes)
    .bind(new.item_type.as_str())
    .fetch_one(&mut *tx)
    .await?;

    insert_participants(&mut tx, row.id, &new.participants).await?;

    tx.commit().await?;
    Ok(row)
}

/// Apply a partial update; `Some(participants)` replaces the whole
/// participant set.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no wave exists with the given `id`, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn update_wave(pool: &PgPool, id: Uuid, update: &WaveUpdate) -> Result<WaveRow, DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, WaveRow>(
        "UPDATE waves SET \
             name       = COALESCE($2, name), \
             image_url  = CASE WHEN $3 THEN $4 ELSE image_url END, \
             start_date = COALESCE($5, start_date), \
             end_date   = COALESCE($6, end_date), \
             week_notes = COALESCE($7, week_notes), \
             item_type  = COALESCE($8, item_type), \
             is_active  = COALESCE($9, is_active), \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, name, image_url, start_date, end_date, week_notes, item_type, \
                   is_active, created_at, updated_at",
    )
    .bind(id)
    .bind(&update.name)
    .bind(update.image_url.is_some())
    .bind(update.image_url.clone().flatten())
    .bind(update.start_date)
    .bind(update.end_date)
    .bind(&update.week_notes)
    .bind(update.item_type.map(rover_core::WaveItemType::as_str))
    .bind(update.is_active)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    if let Some(participants) = &update.participants {
        sqlx::query("DELETE FROM wave_participants WHERE wave_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_participants(&mut tx, id, participants).await?;
    }

    tx.commit().await?;
    Ok(row)
}

/// Delete a wave; participants and entries cascade, preorders keep a
/// NULL wave reference.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no wave exists with the given `id`, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_wave(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM waves WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Record progress for a (wave, rep, market) triple.
///
/// One row exists per triple; recording again replaces the counts and
/// refreshes `recorded_at`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails; an unknown wave, rep,
/// or market surfaces as a foreign-key database error.
pub async fn record_wave_entry(
    pool: &PgPool,
    wave_id: Uuid,
    gebietsleiter_id: Uuid,
    market_id: &str,
    display_count: i32,
    kartonware_count: i32,
) -> Result<WaveEntryRow, DbError> {
    let row = sqlx::query_as::<_, WaveEntryRow>(
        "INSERT INTO wave_entries \
             (wave_id, gebietsleiter_id, market_id, display_count, kartonware_count) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (wave_id, gebietsleiter_id, market_id) DO UPDATE SET \
             display_count    = EXCLUDED.display_count, \
             kartonware_count = EXCLUDED.kartonware_count, \
             recorded_at      = NOW() \
         RETURNING id, wave_id, gebietsleiter_id, market_id, display_count, \
                   kartonware_count, recorded_at",
    )
    .bind(wave_id)
    .bind(gebietsleiter_id)
    .bind(market_id)
    .bind(display_count)
    .bind(kartonware_count)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
