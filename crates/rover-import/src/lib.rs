//! Spreadsheet intake: market master lists and product price lists arrive as
//! CSV or Excel uploads and come out as typed rows ready for the database.
//!
//! Reading is format-agnostic ([`sheet`]), column addressing follows the
//! letter convention operators know from Excel ([`mapping`]), and the two
//! domain parsers ([`markets`], [`products`]) turn raw grids into records,
//! skipping rows that fail validation rather than aborting the whole file.

pub mod error;
pub mod mapping;
pub mod markets;
pub mod products;
pub mod sheet;

pub use error::ImportError;
pub use mapping::{column_letter_to_index, multi_column_indices, resolve_multi_column, ColumnMapping};
pub use markets::{parse_markets, MarketImport, ParsedMarket};
pub use products::{
    generate_sku, parse_products_fixed, parse_products_mapped, ParsedProduct, ProductLayout,
};
pub use sheet::{preview_rows, read_rows, validate_import_file, MAX_IMPORT_BYTES};
