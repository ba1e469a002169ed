//! Row and input types for the `markets` table.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// A row from the `markets` table.
///
/// The id is the operator-facing key from the CRM master list, not a
/// generated surrogate.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MarketRow {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub chain: String,
    pub frequency: i32,
    pub current_visits: i32,
    pub last_visit: Option<NaiveDate>,
    pub is_active: bool,
    pub gebietsleiter_id: Option<Uuid>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub channel: Option<String>,
    pub banner: Option<String>,
    pub branch: Option<String>,
    pub customer_type: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub maingroup: Option<String>,
    pub subgroup: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a single market.
#[derive(Debug, Clone)]
pub struct NewMarket {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub chain: String,
    pub frequency: i32,
    pub is_active: bool,
    pub gebietsleiter_id: Option<Uuid>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub channel: Option<String>,
    pub banner: Option<String>,
    pub branch: Option<String>,
    pub customer_type: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub maingroup: Option<String>,
    pub subgroup: Option<String>,
}

/// Partial update for a market.
///
/// Plain `Option` fields are left unchanged when `None`. The doubled
/// options distinguish "leave unchanged" (outer `None`) from "set to
/// NULL" (`Some(None)`), which matters for unassigning a rep or
/// clearing a geocoordinate.
#[derive(Debug, Clone, Default)]
pub struct MarketUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub chain: Option<String>,
    pub frequency: Option<i32>,
    pub is_active: Option<bool>,
    pub channel: Option<String>,
    pub banner: Option<String>,
    pub branch: Option<String>,
    pub customer_type: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub maingroup: Option<String>,
    pub subgroup: Option<String>,
    pub gebietsleiter_id: Option<Option<Uuid>>,
    pub latitude: Option<Option<f64>>,
    pub longitude: Option<Option<f64>>,
}

/// One record of a bulk master-list import.
///
/// Carries no visit counters, rep assignment, or coordinates; those
/// survive re-imports untouched.
#[derive(Debug, Clone)]
pub struct MarketUpsert {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub chain: String,
    pub frequency: i32,
    pub is_active: bool,
    pub channel: Option<String>,
    pub banner: Option<String>,
    pub branch: Option<String>,
    pub customer_type: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub maingroup: Option<String>,
    pub subgroup: Option<String>,
}

/// Input filters for market listing.
#[derive(Debug, Clone, Default)]
pub struct MarketFilters<'a> {
    pub gebietsleiter_id: Option<Uuid>,
    pub chain: Option<&'a str>,
    /// Case-insensitive substring match on id, name, or city.
    pub q: Option<&'a str>,
    pub active: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}
