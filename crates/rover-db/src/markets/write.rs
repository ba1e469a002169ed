//! Write operations for the `markets` table.

use sqlx::PgPool;

use super::types::{MarketRow, MarketUpdate, MarketUpsert, NewMarket};
use crate::DbError;

/// Create a single market with an operator-supplied id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails; a duplicate id surfaces
/// as a unique-violation database error.
pub async fn create_market(pool: &PgPool, new: &NewMarket) -> Result<MarketRow, DbError> {
    let row = sqlx::query_as::<_, MarketRow>(
        "INSERT INTO markets \
             (id, name, address, city, postal_code, chain, frequency, is_active, \
              gebietsleiter_id, latitude, longitude, channel, banner, branch, \
              customer_type, phone, email, maingroup, subgroup) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
                 $16, $17, $18, $19) \
         RETURNING id, name, address, city, postal_code, chain, frequency, current_visits, \
                   last_visit, is_active, gebietsleiter_id, latitude, longitude, channel, \
                   banner, branch, customer_type, phone, email, maingroup, subgroup, \
                   created_at, updated_at",
    )
    .bind(&new.id)
    .bind(&new.name)
    .bind(&new.address)
    .bind(&new.city)
    .bind(&new.postal_code)
    .bind(&new.chain)
    .bind(new.frequency)
    .bind(new.is_active)
    .bind(new.gebietsleiter_id)
    .bind(new.latitude)
    .bind(new.longitude)
    .bind(&new.channel)
    .bind(&new.banner)
    .bind(&new.branch)
    .bind(&new.customer_type)
    .bind(&new.phone)
    .bind(&new.email)
    .bind(&new.maingroup)
    .bind(&new.subgroup)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Apply a partial update and return the resulting row.
///
/// The rep assignment and geocoordinates only change when the caller
/// explicitly provides the outer `Some`; `Some(None)` clears them.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_market(
    pool: &PgPool,
    id: &str,
    update: &MarketUpdate,
) -> Result<MarketRow, DbError> {
    let row = sqlx::query_as::<_, MarketRow>(
        "UPDATE markets SET \
             name          = COALESCE($2, name), \
             address       = COALESCE($3, address), \
             city          = COALESCE($4, city), \
             postal_code   = COALESCE($5, postal_code), \
             chain         = COALESCE($6, chain), \
             frequency     = COALESCE($7, frequency), \
             is_active     = COALESCE($8, is_active), \
             channel       = COALESCE($9, channel), \
             banner        = COALESCE($10, banner), \
             branch        = COALESCE($11, branch), \
             customer_type = COALESCE($12, customer_type), \
             phone         = COALESCE($13, phone), \
             email         = COALESCE($14, email), \
             maingroup     = COALESCE($15, maingroup), \
             subgroup      = COALESCE($16, subgroup), \
             gebietsleiter_id = CASE WHEN $17 THEN $18 ELSE gebietsleiter_id END, \
             latitude      = CASE WHEN $19 THEN $20 ELSE latitude END, \
             longitude     = CASE WHEN $21 THEN $22 ELSE longitude END, \
             updated_at    = NOW() \
         WHERE id = $1 \
         RETURNING id, name, address, city, postal_code, chain, frequency, current_visits, \
                   last_visit, is_active, gebietsleiter_id, latitude, longitude, channel, \
                   banner, branch, customer_type, phone, email, maingroup, subgroup, \
                   created_at, updated_at",
    )
    .bind(id)
    .bind(&update.name)
    .bind(&update.address)
    .bind(&update.city)
    .bind(&update.postal_code)
    .bind(&update.chain)
    .bind(update.frequency)
    .bind(update.is_active)
    .bind(&update.channel)
    .bind(&update.banner)
    .bind(&update.branch)
    .bind(&update.customer_type)
    .bind(&update.phone)
    .bind(&update.email)
    .bind(&update.maingroup)
    .bind(&update.subgroup)
    .bind(update.gebietsleiter_id.is_some())
    .bind(update.gebietsleiter_id.flatten())
    .bind(update.latitude.is_some())
    .bind(update.latitude.flatten())
    .bind(update.longitude.is_some())
    .bind(update.longitude.flatten())
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Delete a market and, via schema cascades, its wave entries and preorders.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_market(pool: &PgPool, id: &str) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM markets WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Record a visit: bump `current_visits` and stamp `last_visit`.
///
/// The counter moves at most once per calendar day per market; a second
/// call on the same day returns `Ok(false)` without touching the row.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no market exists with the given `id`,
/// or [`DbError::Sqlx`] if a query fails.
pub async fn record_visit(pool: &PgPool, id: &str) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE markets \
         SET current_visits = current_visits + 1, last_visit = CURRENT_DATE, updated_at = NOW() \
         WHERE id = $1 AND (last_visit IS NULL OR last_visit < CURRENT_DATE)",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(true);
    }

    let exists: bool =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM markets WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await?;

    if exists {
        Ok(false)
    } else {
        Err(DbError::NotFound)
    }
}

/// Bulk upsert from a master-list import, keyed by market id.
///
/// Returns `(inserted, updated)` counts. Uses a single
/// `INSERT … SELECT * FROM UNNEST(…) ON CONFLICT` so the entire batch is
/// one round-trip regardless of size. Re-imports refresh master data but
/// never touch visit counters, rep assignment, or geocoordinates.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn upsert_markets(
    pool: &PgPool,
    markets: &[MarketUpsert],
) -> Result<(u64, u64), DbError> {
    if markets.is_empty() {
        return Ok((0, 0));
    }

    // Collect each column into a parallel Vec for UNNEST binding.
    let mut ids: Vec<String> = Vec::with_capacity(markets.len());
    let mut names: Vec<String> = Vec::with_capacity(markets.len());
    let mut addresses: Vec<String> = Vec::with_capacity(markets.len());
    let mut cities: Vec<String> = Vec::with_capacity(markets.len());
    let mut postal_codes: Vec<String> = Vec::with_capacity(markets.len());
    let mut chains: Vec<String> = Vec::with_capacity(markets.len());
    let mut frequencies: Vec<i32> = Vec::with_capacity(markets.len());
    let mut actives: Vec<bool> = Vec::with_capacity(markets.len());
    let mut channels: Vec<Option<String>> = Vec::with_capacity(markets.len());
    let mut banners: Vec<Option<String>> = Vec::with_capacity(markets.len());
    let mut branches: Vec<Option<String>> = Vec::with_capacity(markets.len());
    let mut customer_types: Vec<Option<String>> = Vec::with_capacity(markets.len());
    let mut phones: Vec<Option<String>> = Vec::with_capacity(markets.len());
    let mut emails: Vec<Option<String>> = Vec::with_capacity(markets.len());
    let mut maingroups: Vec<Option<String>> = Vec::with_capacity(markets.len());
    let mut subgroups: Vec<Option<String>> = Vec::with_capacity(markets.len());

    for market in markets {
        ids.push(market.id.clone());
        names.push(market.name.clone());
        addresses.push(market.address.clone());
        cities.push(market.city.clone());
        postal_codes.push(market.postal_code.clone());
        chains.push(market.chain.clone());
        frequencies.push(market.frequency);
        actives.push(market.is_active);
        channels.push(market.channel.clone());
        banners.push(market.banner.clone());
        branches.push(market.branch.clone());
        customer_types.push(market.customer_type.clone());
        phones.push(market.phone.clone());
        emails.push(market.email.clone());
        maingroups.push(market.maingroup.clone());
        subgroups.push(market.subgroup.clone());
    }

    let rows: Vec<bool> = sqlx::query_scalar::<_, bool>(
        "INSERT INTO markets \
             (id, name, address, city, postal_code, chain, frequency, is_active, \
              channel, banner, branch, customer_type, phone, email, maingroup, subgroup) \
         SELECT * FROM UNNEST(\
              $1::text[], $2::text[], $3::text[], $4::text[], $5::text[], $6::text[], \
              $7::int4[], $8::boolean[], $9::text[], $10::text[], $11::text[], \
              $12::text[], $13::text[], $14::text[], $15::text[], $16::text[]) \
         ON CONFLICT (id) DO UPDATE SET \
             name          = EXCLUDED.name, \
             address       = EXCLUDED.address, \
             city          = EXCLUDED.city, \
             postal_code   = EXCLUDED.postal_code, \
             chain         = EXCLUDED.chain, \
             frequency     = EXCLUDED.frequency, \
             is_active     = EXCLUDED.is_active, \
             channel       = EXCLUDED.channel, \
             banner        = EXCLUDED.banner, \
             branch        = EXCLUDED.branch, \
             customer_type = EXCLUDED.customer_type, \
             phone         = EXCLUDED.phone, \
             email         = EXCLUDED.email, \
             maingroup     = EXCLUDED.maingroup, \
             subgroup      = EXCLUDED.subgroup, \
             updated_at    = NOW() \
         RETURNING (xmax = 0) AS is_new",
    )
    .bind(&ids)
    .bind(&names)
    .bind(&addresses)
    .bind(&cities)
    .bind(&postal_codes)
    .bind(&chains)
    .bind(&frequencies)
    .bind(&actives)
    .bind(&channels)
    .bind(&banners)
    .bind(&branches)
    .bind(&customer_types)
    .bind(&phones)
    .bind(&emails)
    .bind(&maingroups)
    .bind(&subgroups)
    .fetch_all(pool)
    .await?;

    let inserted = rows.iter().filter(|&&is_new| is_new).count() as u64;
    let updated = rows.len() as u64 - inserted;

    Ok((inserted, updated))
}
