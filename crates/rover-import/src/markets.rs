//! Market master list parsing. The list is a fixed export from the CRM with
//! a header row; column positions are contractual, including the gaps.

use rover_core::normalize_chain;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ImportError;
use crate::sheet::{cell, float_value};

/// Visits per year when the frequency column is empty or unreadable.
pub const DEFAULT_VISIT_FREQUENCY: u32 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMarket {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub chain: String,
    pub frequency: u32,
    pub active: bool,
    pub channel: Option<String>,
    pub banner: Option<String>,
    pub branch: Option<String>,
    pub customer_type: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub maingroup: Option<String>,
    pub subgroup: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketImport {
    pub markets: Vec<ParsedMarket>,
    /// Rows that had an id but failed validation.
    pub skipped_rows: usize,
}

/// Parse a master list grid. The first row is the header. Rows with an empty
/// id column are treated as blank; rows with an id but no name are counted
/// as skipped.
///
/// Column layout: A id, C channel, D banner, E chain, F name, G postal code,
/// H city, I street, J status, K branch, L visit frequency, O customer type,
/// P phone, Q email, R maingroup, S subgroup.
pub fn parse_markets(rows: &[Vec<String>]) -> Result<MarketImport, ImportError> {
    if rows.len() < 2 {
        return Err(ImportError::EmptyFile);
    }

    let mut markets = Vec::new();
    let mut skipped_rows = 0;

    for (idx, row) in rows.iter().enumerate().skip(1) {
        let id = cell(row, 0);
        if id.is_empty() {
            continue;
        }
        let name = cell(row, 5);
        if name.is_empty() {
            warn!(row = idx + 1, id, "row skipped: market name missing");
            skipped_rows += 1;
            continue;
        }

        let optional = |col: usize| {
            let value = cell(row, col);
            (!value.is_empty()).then(|| value.to_string())
        };

        markets.push(ParsedMarket {
            id: id.to_string(),
            name: name.to_string(),
            address: cell(row, 8).to_string(),
            city: cell(row, 7).to_string(),
            postal_code: cell(row, 6).to_string(),
            chain: normalize_chain(cell(row, 4)),
            frequency: visit_frequency(cell(row, 11)),
            active: cell(row, 9).eq_ignore_ascii_case("aktiv"),
            channel: optional(2),
            banner: optional(3),
            branch: optional(10),
            customer_type: optional(14),
            phone: optional(15),
            email: optional(16),
            maingroup: optional(17),
            subgroup: optional(18),
        });
    }

    Ok(MarketImport {
        markets,
        skipped_rows,
    })
}

/// Rounded to whole visits, floored at one per year.
fn visit_frequency(raw: &str) -> u32 {
    match float_value(raw) {
        Some(value) => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let rounded = value.round().max(1.0) as u32;
            rounded
        }
        None => DEFAULT_VISIT_FREQUENCY,
    }
}
