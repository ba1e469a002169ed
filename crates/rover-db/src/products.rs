//! Database operations for the `products` and `palette_entries` tables.

use rover_core::{Department, ProductType};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub department: String,
    pub product_type: String,
    pub weight: Option<String>,
    pub content: Option<String>,
    pub pallet_size: Option<i32>,
    pub price: Decimal,
    pub artikel_nr: Option<String>,
    pub sku: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A row from the `palette_entries` table.
///
/// `product_id` is a soft reference; it goes NULL when the underlying
/// product is deleted while the name snapshot and price stay.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaletteEntryRow {
    pub id: Uuid,
    pub palette_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub position: i32,
}

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub department: Department,
    pub product_type: ProductType,
    pub weight: Option<String>,
    pub content: Option<String>,
    pub pallet_size: Option<i32>,
    /// Ignored for palettes; their stored price is always zero.
    pub price: Decimal,
    pub artikel_nr: Option<String>,
    pub sku: Option<String>,
}

/// Input for one palette content line.
#[derive(Debug, Clone)]
pub struct NewPaletteEntry {
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// One record of a department price-list import.
#[derive(Debug, Clone)]
pub struct ImportedProduct {
    pub name: String,
    pub weight: String,
    pub content: Option<String>,
    pub pallet_size: Option<i32>,
    pub price: Decimal,
    pub artikel_nr: Option<String>,
    pub sku: String,
}

/// Partial update for a product.
///
/// Department and product type are fixed at creation. The doubled option
/// on `pallet_size` distinguishes "leave unchanged" from "clear".
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub weight: Option<String>,
    pub content: Option<String>,
    pub pallet_size: Option<Option<i32>>,
    pub price: Option<Decimal>,
    pub artikel_nr: Option<String>,
    pub sku: Option<String>,
    pub is_active: Option<bool>,
}

/// Input filters for product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductFilters<'a> {
    pub department: Option<&'a str>,
    pub product_type: Option<&'a str>,
    /// Case-insensitive substring match on name, SKU, or article number.
    pub q: Option<&'a str>,
    pub active: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}

// ---------------------------------------------------------------------------
// Product operations
// ---------------------------------------------------------------------------

/// Create a product; for palettes, also write its content entries.
///
/// Palettes are stored with price zero regardless of `new.price`; their
/// value is derived from entries. Callers validate that only palettes
/// carry `entries` — for other product types the slice is not written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; nothing is written on
/// failure.
pub async fn create_product(
    pool: &PgPool,
    new: &NewProduct,
    entries: &[NewPaletteEntry],
) -> Result<ProductRow, DbError> {
    let is_palette = new.product_type == ProductType::Palette;
    let price = if is_palette { Decimal::ZERO } else { new.price };

    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, ProductRow>(
        "INSERT INTO products \
             (name, department, product_type, weight, content, pallet_size, price, \
              artikel_nr, sku) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING id, name, department, product_type, weight, content, pallet_size, \
                   price, artikel_nr, sku, is_active, created_at, updated_at",
    )
    .bind(&new.name)
    .bind(new.department.as_str())
    .bind(new.product_type.as_str())
    .bind(&new.weight)
    .bind(&new.content)
    .bind(new.pallet_size)
    .bind(price)
    .bind(&new.artikel_nr)
    .bind(&new.sku)
    .fetch_one(&mut *tx)
    .await?;

    if is_palette {
        for (position, entry) in entries.iter().enumerate() {
            sqlx::query(
                "INSERT INTO palette_entries \
                     (palette_id, product_id, product_name, quantity, unit_price, position) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(row.id)
            .bind(entry.product_id)
            .bind(&entry.product_name)
            .bind(entry.quantity)
            .bind(entry.unit_price)
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(row)
}

/// Fetch a single product by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: Uuid) -> Result<ProductRow, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT id, name, department, product_type, weight, content, pallet_size, \
                price, artikel_nr, sku, is_active, created_at, updated_at \
         FROM products \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// List products matching the given filters, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(
    pool: &PgPool,
    filters: ProductFilters<'_>,
) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, name, department, product_type, weight, content, pallet_size, \
                price, artikel_nr, sku, is_active, created_at, updated_at \
         FROM products \
         WHERE ($1::text IS NULL OR department = $1) \
           AND ($2::text IS NULL OR product_type = $2) \
           AND ($3::text IS NULL \
                OR name ILIKE '%' || $3 || '%' \
                OR sku ILIKE '%' || $3 || '%' \
                OR artikel_nr ILIKE '%' || $3 || '%') \
           AND ($4::boolean IS NULL OR is_active = $4) \
         ORDER BY name ASC, id ASC \
         LIMIT $5 OFFSET $6",
    )
    .bind(filters.department)
    .bind(filters.product_type)
    .bind(filters.q)
    .bind(filters.active)
    .bind(filters.limit)
    .bind(filters.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Apply a partial update and return the resulting row.
///
/// A palette's price is never updated through this path; it stays zero.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_product(
    pool: &PgPool,
    id: Uuid,
    update: &ProductUpdate,
) -> Result<ProductRow, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "UPDATE products SET \
             name        = COALESCE($2, name), \
             weight      = COALESCE($3, weight), \
             content     = COALESCE($4, content), \
             pallet_size = CASE WHEN $5 THEN $6 ELSE pallet_size END, \
             price       = CASE WHEN product_type = 'palette' THEN price \
                                ELSE COALESCE($7, price) END, \
             artikel_nr  = COALESCE($8, artikel_nr), \
             sku         = COALESCE($9, sku), \
             is_active   = COALESCE($10, is_active), \
             updated_at  = NOW() \
         WHERE id = $1 \
         RETURNING id, name, department, product_type, weight, content, pallet_size, \
                   price, artikel_nr, sku, is_active, created_at, updated_at",
    )
    .bind(id)
    .bind(&update.name)
    .bind(&update.weight)
    .bind(&update.content)
    .bind(update.pallet_size.is_some())
    .bind(update.pallet_size.flatten())
    .bind(update.price)
    .bind(&update.artikel_nr)
    .bind(&update.sku)
    .bind(update.is_active)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Delete a product. A palette takes its entries with it; a contained
/// product leaves its snapshot lines behind with a NULL reference.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_product(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Palette operations
// ---------------------------------------------------------------------------

/// Return a palette's content lines ordered by position.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_palette_entries(
    pool: &PgPool,
    palette_id: Uuid,
) -> Result<Vec<PaletteEntryRow>, DbError> {
    let rows = sqlx::query_as::<_, PaletteEntryRow>(
        "SELECT id, palette_id, product_id, product_name, quantity, unit_price, position \
         FROM palette_entries \
         WHERE palette_id = $1 \
         ORDER BY position ASC",
    )
    .bind(palette_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Replace a palette's content lines with the given set.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no product exists with the given id,
/// [`DbError::NotAPalette`] if it exists but is not a palette, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn replace_palette_entries(
    pool: &PgPool,
    palette_id: Uuid,
    entries: &[NewPaletteEntry],
) -> Result<Vec<PaletteEntryRow>, DbError> {
    let mut tx = pool.begin().await?;

    let product_type: Option<String> =
        sqlx::query_scalar::<_, String>("SELECT product_type FROM products WHERE id = $1")
            .bind(palette_id)
            .fetch_optional(&mut *tx)
            .await?;

    match product_type.as_deref() {
        None => return Err(DbError::NotFound),
        Some("palette") => {}
        Some(_) => return Err(DbError::NotAPalette(palette_id)),
    }

    sqlx::query("DELETE FROM palette_entries WHERE palette_id = $1")
        .bind(palette_id)
        .execute(&mut *tx)
        .await?;

    let mut rows = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        let row = sqlx::query_as::<_, PaletteEntryRow>(
            "INSERT INTO palette_entries \
                 (palette_id, product_id, product_name, quantity, unit_price, position) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, palette_id, product_id, product_name, quantity, unit_price, position",
        )
        .bind(palette_id)
        .bind(entry.product_id)
        .bind(&entry.product_name)
        .bind(entry.quantity)
        .bind(entry.unit_price)
        .bind(i32::try_from(position).unwrap_or(i32::MAX))
        .fetch_one(&mut *tx)
        .await?;
        rows.push(row);
    }

    tx.commit().await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Replace a department's standard assortment with an imported price list.
///
/// Deletes the department's `standard` products and bulk-inserts the new
/// set in one transaction; displays and palettes are untouched. Returns
/// `(deleted, inserted)` counts.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any query fails; nothing is written on
/// failure.
pub async fn replace_department_products(
    pool: &PgPool,
    department: Department,
    items: &[ImportedProduct],
) -> Result<(u64, u64), DbError> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM products WHERE department = $1 AND product_type = 'standard'")
        .bind(department.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if items.is_empty() {
        tx.commit().await?;
        return Ok((deleted, 0));
    }

    // Collect each column into a parallel Vec for UNNEST binding.
    let mut names: Vec<String> = Vec::with_capacity(items.len());
    let mut weights: Vec<String> = Vec::with_capacity(items.len());
    let mut contents: Vec<Option<String>> = Vec::with_capacity(items.len());
    let mut pallet_sizes: Vec<Option<i32>> = Vec::with_capacity(items.len());
    let mut prices: Vec<Decimal> = Vec::with_capacity(items.len());
    let mut artikel_nrs: Vec<Option<String>> = Vec::with_capacity(items.len());
    let mut skus: Vec<String> = Vec::with_capacity(items.len());

    for item in items {
        names.push(item.name.clone());
        weights.push(item.weight.clone());
        contents.push(item.content.clone());
        pallet_sizes.push(item.pallet_size);
        prices.push(item.price);
        artikel_nrs.push(item.artikel_nr.clone());
        skus.push(item.sku.clone());
    }

    let inserted = sqlx::query(
        "INSERT INTO products \
             (department, product_type, name, weight, content, pallet_size, price, \
              artikel_nr, sku) \
         SELECT $1, 'standard', * FROM UNNEST(\
              $2::text[], $3::text[], $4::text[], $5::int4[], $6::numeric[], \
              $7::text[], $8::text[])",
    )
    .bind(department.as_str())
    .bind(&names)
    .bind(&weights)
    .bind(&contents)
    .bind(&pallet_sizes)
    .bind(&prices)
    .bind(&artikel_nrs)
    .bind(&skus)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;
    Ok((deleted, inserted))
}
