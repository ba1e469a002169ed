//! Read operations for the `markets` table.

use sqlx::PgPool;

use super::types::{MarketFilters, MarketRow};
use crate::DbError;

/// Fetch a single market by its master-list id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_market(pool: &PgPool, id: &str) -> Result<MarketRow, DbError> {
    let row = sqlx::query_as::<_, MarketRow>(
        "SELECT id, name, address, city, postal_code, chain, frequency, current_visits, \
                last_visit, is_active, gebietsleiter_id, latitude, longitude, channel, \
                banner, branch, customer_type, phone, email, maingroup, subgroup, \
                created_at, updated_at \
         FROM markets \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// List markets matching the given filters, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_markets(
    pool: &PgPool,
    filters: MarketFilters<'_>,
) -> Result<Vec<MarketRow>, DbError> {
    let rows = sqlx::query_as::<_, MarketRow>(
        "SELECT id, name, address, city, postal_code, chain, frequency, current_visits, \
                last_visit, is_active, gebietsleiter_id, latitude, longitude, channel, \
                banner, branch, customer_type, phone, email, maingroup, subgroup, \
                created_at, updated_at \
         FROM markets \
         WHERE ($1::uuid IS NULL OR gebietsleiter_id = $1) \
           AND ($2::text IS NULL OR chain = $2) \
           AND ($3::text IS NULL \
                OR id ILIKE '%' || $3 || '%' \
                OR name ILIKE '%' || $3 || '%' \
                OR city ILIKE '%' || $3 || '%') \
           AND ($4::boolean IS NULL OR is_active = $4) \
         ORDER BY name ASC, id ASC \
         LIMIT $5 OFFSET $6",
    )
    .bind(filters.gebietsleiter_id)
    .bind(filters.chain)
    .bind(filters.q)
    .bind(filters.active)
    .bind(filters.limit)
    .bind(filters.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
