//! Price list parsing. Two fixed layouts cover the lists the field team gets
//! from the Pets and Food departments; everything else goes through an
//! operator-supplied [`ColumnMapping`].

use std::collections::HashSet;

use rover_core::{Department, ProductType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ImportError;
use crate::mapping::{
    column_letter_to_index, multi_column_indices, resolve_multi_column, ColumnMapping,
};
use crate::sheet::{cell, decimal_value, float_value};

/// Fixed layouts shorter than this are rejected outright.
const MIN_FIXED_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductLayout {
    PetsStandard,
    FoodStandard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedProduct {
    pub name: String,
    pub department: Department,
    pub product_type: ProductType,
    pub weight: String,
    pub content: Option<String>,
    pub pallet_size: Option<u32>,
    pub price: Decimal,
    pub artikel_nr: Option<String>,
    pub sku: String,
}

/// Parse a price list in one of the fixed layouts. Rows missing a name,
/// weight or usable price are skipped, not fatal.
pub fn parse_products_fixed(
    rows: &[Vec<String>],
    layout: ProductLayout,
) -> Result<Vec<ParsedProduct>, ImportError> {
    if rows.len() < MIN_FIXED_ROWS {
        return Err(ImportError::NotEnoughRows);
    }
    Ok(match layout {
        ProductLayout::PetsStandard => parse_pets_standard(rows),
        ProductLayout::FoodStandard => parse_food_standard(rows),
    })
}

// Pets standard layout: A name, C weight, D content, F units per pallet,
// K price. The remaining columns are internal to the source sheet.
fn parse_pets_standard(rows: &[Vec<String>]) -> Vec<ParsedProduct> {
    let mut products = Vec::new();
    let mut seen_names = HashSet::new();

    for (idx, row) in rows.iter().enumerate() {
        let name = cell(row, 0);
        if name.is_empty() {
            continue;
        }
        let weight = cell(row, 2);
        let Some(price) = usable_price(cell(row, 10)) else {
            warn!(row = idx + 1, "row skipped: missing weight or price");
            continue;
        };
        if weight.is_empty() {
            warn!(row = idx + 1, "row skipped: missing weight or price");
            continue;
        }
        if !seen_names.insert(name.to_string()) {
            debug!(row = idx + 1, name, "duplicate product name skipped");
            continue;
        }

        let content = cell(row, 3);
        products.push(ParsedProduct {
            name: name.to_string(),
            department: Department::Pets,
            product_type: ProductType::Standard,
            weight: weight.to_string(),
            content: (!content.is_empty()).then(|| content.to_string()),
            pallet_size: pallet_size(cell(row, 5)),
            price,
            artikel_nr: None,
            sku: generate_sku(name, weight),
        });
    }
    products
}

// Food standard layout: A name, B weight, E units per pallet, J price.
// The same article shows up once per price tier, so dedupe is on the
// name and price pair rather than the name alone.
fn parse_food_standard(rows: &[Vec<String>]) -> Vec<ParsedProduct> {
    let mut products = Vec::new();
    let mut seen: HashSet<(String, Decimal)> = HashSet::new();

    for (idx, row) in rows.iter().enumerate() {
        let name = cell(row, 0);
        if name.is_empty() {
            continue;
        }
        let weight = cell(row, 1);
        let Some(price) = usable_price(cell(row, 9)) else {
            warn!(row = idx + 1, "row skipped: missing weight or price");
            continue;
        };
        if weight.is_empty() {
            warn!(row = idx + 1, "row skipped: missing weight or price");
            continue;
        }
        if !seen.insert((name.to_string(), price)) {
            debug!(row = idx + 1, name, %price, "duplicate name and price skipped");
            continue;
        }

        products.push(ParsedProduct {
            name: name.to_string(),
            department: Department::Food,
            product_type: ProductType::Standard,
            weight: weight.to_string(),
            content: None,
            pallet_size: pallet_size(cell(row, 4)),
            price,
            artikel_nr: None,
            sku: generate_sku(name, weight),
        });
    }
    products
}

/// Parse a price list laid out per an operator-supplied column mapping.
/// Duplicate names keep the first occurrence.
pub fn parse_products_mapped(
    rows: &[Vec<String>],
    department: Department,
    mapping: &ColumnMapping,
) -> Result<Vec<ParsedProduct>, ImportError> {
    let name_indices = multi_column_indices(&mapping.name)?;
    let weight_idx = column_letter_to_index(&mapping.weight)?;
    let price_idx = column_letter_to_index(&mapping.price)?;
    let content_idx = mapping
        .content
        .as_deref()
        .map(column_letter_to_index)
        .transpose()?;
    let artikel_idx = mapping
        .artikel_nr
        .as_deref()
        .map(column_letter_to_index)
        .transpose()?;

    let start = usize::from(mapping.skip_header_row);
    let mut products = Vec::new();
    let mut seen_names = HashSet::new();

    for (idx, row) in rows.iter().enumerate().skip(start) {
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let name = resolve_multi_column(row, &name_indices);
        let weight = cell(row, weight_idx);
        let price = usable_price(cell(row, price_idx));

        let Some(price) = price else {
            continue;
        };
        if name.is_empty() || weight.is_empty() {
            continue;
        }
        if !seen_names.insert(name.clone()) {
            debug!(row = idx + 1, name = %name, "duplicate product name skipped");
            continue;
        }

        let optional = |col: Option<usize>| {
            col.and_then(|i| {
                let value = cell(row, i);
                (!value.is_empty()).then(|| value.to_string())
            })
        };

        products.push(ParsedProduct {
            sku: generate_sku(&name, weight),
            name,
            department,
            product_type: ProductType::Standard,
            weight: weight.to_string(),
            content: optional(content_idx),
            pallet_size: None,
            price,
            artikel_nr: optional(artikel_idx),
        });
    }
    Ok(products)
}

/// Article number shorthand: first word of the name, uppercased and capped at
/// four characters, joined to the digits of the weight.
#[must_use]
pub fn generate_sku(name: &str, weight: &str) -> String {
    let name_part: String = name
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_uppercase()
        .chars()
        .take(4)
        .collect();
    let weight_part: String = weight.chars().filter(char::is_ascii_digit).collect();
    format!("{name_part}-{weight_part}")
}

/// A price of zero means the cell was empty or the article is not orderable;
/// either way the row is unusable.
fn usable_price(raw: &str) -> Option<Decimal> {
    decimal_value(raw).filter(|price| !price.is_zero())
}

fn pallet_size(raw: &str) -> Option<u32> {
    let value = float_value(raw)?;
    if value <= 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = value.round() as u32;
    Some(rounded)
}
