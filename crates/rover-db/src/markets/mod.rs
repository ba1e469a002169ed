//! Database operations for the `markets` table.

mod read;
mod types;
mod write;

pub use read::{get_market, list_markets};
pub use types::{MarketFilters, MarketRow, MarketUpdate, MarketUpsert, NewMarket};
pub use write::{create_market, delete_market, record_visit, update_market, upsert_markets};
