use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// Counts of rows written by [`seed_reference_data`].
#[derive(Debug, Clone, Copy)]
pub struct SeedSummary {
    pub gebietsleiter: usize,
    pub markets: usize,
    pub products: usize,
}

/// Demo markets around Graz and Vienna, with coordinates so route
/// planning works out of the box.
const SEED_MARKETS: &[(&str, &str, &str, &str, &str, &str, i32, f64, f64)] = &[
    (
        "10010",
        "Billa+ Graz Jakominiplatz",
        "Jakominiplatz 12",
        "Graz",
        "8010",
        "Billa+",
        24,
        47.0664,
        15.4414,
    ),
    (
        "10011",
        "Spar Graz Lendplatz",
        "Lendplatz 21",
        "Graz",
        "8020",
        "Spar",
        12,
        47.0761,
        15.4312,
    ),
    (
        "10012",
        "Eurospar Leibnitz",
        "Bahnhofstrasse 4",
        "Leibnitz",
        "8430",
        "Eurospar",
        12,
        46.7818,
        15.5446,
    ),
    (
        "10013",
        "Interspar Wien Mitte",
        "Landstrasser Hauptstrasse 1",
        "Wien",
        "1030",
        "Interspar",
        24,
        48.2066,
        16.3853,
    ),
    (
        "10014",
        "Adeg Frohnleiten",
        "Hauptplatz 9",
        "Frohnleiten",
        "8130",
        "Adeg",
        6,
        47.2713,
        15.3261,
    ),
];

/// Demo products with pinned ids so re-seeding updates in place.
const SEED_PRODUCTS: &[(&str, &str, &str, &str, i64, &str)] = &[
    (
        "00000000-0000-0000-0000-000000000101",
        "Whiskas Adult Huhn",
        "pets",
        "400g",
        129,
        "WHIS-400",
    ),
    (
        "00000000-0000-0000-0000-000000000102",
        "Kitekat Rind in Sauce",
        "pets",
        "100g",
        45,
        "KITE-100",
    ),
    (
        "00000000-0000-0000-0000-000000000103",
        "Miracoli Spaghetti 5 Portionen",
        "food",
        "616g",
        379,
        "MIRA-616",
    ),
    (
        "00000000-0000-0000-0000-000000000104",
        "Ben's Original Langkornreis",
        "food",
        "500g",
        299,
        "BEN'-500",
    ),
];

/// Seed reference data: the admin account plus a small demo data set.
///
/// Everything runs inside one transaction; if any operation fails the
/// batch is rolled back. Re-running is safe and resets the admin
/// credentials to the given digest.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_reference_data(
    pool: &PgPool,
    admin_username: &str,
    admin_password_digest: &str,
) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO gebietsleiter (username, display_name, email, role, password_digest) \
         VALUES ($1, 'Administrator', $2, 'admin', $3) \
         ON CONFLICT (username) DO UPDATE SET \
             role            = 'admin', \
             is_active       = TRUE, \
             password_digest = EXCLUDED.password_digest, \
             updated_at      = NOW()",
    )
    .bind(admin_username)
    .bind(format!("{admin_username}@example.com"))
    .bind(admin_password_digest)
    .execute(&mut *tx)
    .await?;

    let mut markets = 0usize;
    for (id, name, address, city, postal_code, chain, frequency, latitude, longitude) in
        SEED_MARKETS
    {
        sqlx::query(
            "INSERT INTO markets \
                 (id, name, address, city, postal_code, chain, frequency, latitude, longitude) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (id) DO UPDATE SET \
                 name        = EXCLUDED.name, \
                 address     = EXCLUDED.address, \
                 city        = EXCLUDED.city, \
                 postal_code = EXCLUDED.postal_code, \
                 chain       = EXCLUDED.chain, \
                 frequency   = EXCLUDED.frequency, \
                 latitude    = EXCLUDED.latitude, \
                 longitude   = EXCLUDED.longitude, \
                 updated_at  = NOW()",
        )
        .bind(id)
        .bind(name)
        .bind(address)
        .bind(city)
        .bind(postal_code)
        .bind(chain)
        .bind(frequency)
        .bind(latitude)
        .bind(longitude)
        .execute(&mut *tx)
        .await?;
        markets += 1;
    }

    let mut products = 0usize;
    for (id, name, department, weight, price_cents, sku) in SEED_PRODUCTS {
        sqlx::query(
            "INSERT INTO products (id, name, department, weight, price, sku) \
             VALUES ($1::uuid, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO UPDATE SET \
                 name       = EXCLUDED.name, \
                 department = EXCLUDED.department, \
                 weight     = EXCLUDED.weight, \
                 price      = EXCLUDED.price, \
                 sku        = EXCLUDED.sku, \
                 is_active  = TRUE, \
                 updated_at = NOW()",
        )
        .bind(id)
        .bind(name)
        .bind(department)
        .bind(weight)
        .bind(Decimal::new(*price_cents, 2))
        .bind(sku)
        .execute(&mut *tx)
        .await?;
        products += 1;
    }

    tx.commit().await?;

    Ok(SeedSummary {
        gebietsleiter: 1,
        markets,
        products,
    })
}
