//! Database operations for the `preorders` table.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `preorders` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PreorderRow {
    pub id: Uuid,
    pub gebietsleiter_id: Uuid,
    pub market_id: String,
    pub wave_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub delivery_date: Option<NaiveDate>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for logging a preorder.
#[derive(Debug, Clone)]
pub struct NewPreorder {
    pub gebietsleiter_id: Uuid,
    pub market_id: String,
    pub wave_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    /// Snapshot of the product name at order time.
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub delivery_date: Option<NaiveDate>,
    pub note: Option<String>,
}

/// Input filters for preorder listing.
#[derive(Debug, Clone, Default)]
pub struct PreorderFilters<'a> {
    pub gebietsleiter_id: Option<Uuid>,
    pub wave_id: Option<Uuid>,
    pub market_id: Option<&'a str>,
    pub limit: i64,
    pub offset: i64,
}

/// Log a preorder and return the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails; an unknown rep, market,
/// wave, or product surfaces as a foreign-key database error.
pub async fn create_preorder(pool: &PgPool, new: &NewPreorder) -> Result<PreorderRow, DbError> {
    let row = sqlx::query_as::<_, PreorderRow>(
        "INSERT INTO preorders \
             (gebietsleiter_id, market_id, wave_id, product_id, product_name, quantity, \
              unit_price, delivery_date, note) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING id, gebietsleiter_id, market_id, wave_id, product_id, product_name, \
                   quantity, unit_price, delivery_date, note, created_at",
    )
    .bind(new.gebietsleiter_id)
    .bind(&new.market_id)
    .bind(new.wave_id)
    .bind(new.product_id)
    .bind(&new.product_name)
    .bind(new.quantity)
    .bind(new.unit_price)
    .bind(new.delivery_date)
    .bind(&new.note)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// List preorders matching the given filters, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_preorders(
    pool: &PgPool,
    filters: PreorderFilters<'_>,
) -> Result<Vec<PreorderRow>, DbError> {
    let rows = sqlx::query_as::<_, PreorderRow>(
        "SELECT id, gebietsleiter_id, market_id, wave_id, product_id, product_name, \
                quantity, unit_price, delivery_date, note, created_at \
         FROM preorders \
         WHERE ($1::uuid IS NULL OR gebietsleiter_id = $1) \
           AND ($2::uuid IS NULL OR wave_id = $2) \
           AND ($3::text IS NULL OR market_id = $3) \
         ORDER BY created_at DESC, id DESC \
         LIMIT $4 OFFSET $5",
    )
    .bind(filters.gebietsleiter_id)
    .bind(filters.wave_id)
    .bind(filters.market_id)
    .bind(filters.limit)
    .bind(filters.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete a preorder.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_preorder(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM preorders WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
