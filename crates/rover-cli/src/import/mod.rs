//! Spreadsheet import area of the CLI: market master lists and
//! department price lists.
//!
//! These read the same file formats the server upload endpoints accept
//! and write the parsed records straight into the database.

mod markets;
mod products;

use std::fs;
use std::path::Path;

use anyhow::Context;
use clap::{Args, Subcommand};

pub(crate) use markets::run_import_markets;
pub(crate) use products::run_import_products;

/// Sub-commands available under `import`.
#[derive(Debug, Subcommand)]
pub enum ImportCommands {
    /// Show the first rows of a sheet with their column letters
    Preview {
        /// Sheet to read (.csv, .xlsx or .xls)
        #[arg(long)]
        file: std::path::PathBuf,
        /// How many rows to show
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
    /// Insert or update markets from a master list sheet
    Markets {
        /// Sheet to read (.csv, .xlsx or .xls)
        #[arg(long)]
        file: std::path::PathBuf,
        /// Parse and report without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Replace a department's standard products from a price list
    Products {
        /// Sheet to read (.csv, .xlsx or .xls)
        #[arg(long)]
        file: std::path::PathBuf,
        /// Department the list belongs to (pets or food)
        #[arg(long)]
        department: String,
        /// Fixed layout to parse with (pets-standard or food-standard);
        /// defaults to the department's own layout
        #[arg(long)]
        layout: Option<String>,
        #[command(flatten)]
        mapping: MappingArgs,
        /// Parse and report without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
}

/// Explicit column mapping for price lists that match neither fixed
/// layout. Name, weight and price columns must be given together.
#[derive(Debug, Args)]
pub struct MappingArgs {
    /// Column letters for the product name; several letters concatenate
    #[arg(long)]
    pub name_column: Option<String>,
    /// Column letter for the weight
    #[arg(long)]
    pub weight_column: Option<String>,
    /// Column letter for the price
    #[arg(long)]
    pub price_column: Option<String>,
    /// Column letter for the content description
    #[arg(long)]
    pub content_column: Option<String>,
    /// Column letter for the Artikel number
    #[arg(long)]
    pub artikel_column: Option<String>,
    /// Skip the first row before applying the mapping
    #[arg(long)]
    pub skip_header: bool,
}

impl MappingArgs {
    /// Turn the mapping flags into a [`rover_import::ColumnMapping`], or
    /// `None` when no mapping flag was given at all.
    ///
    /// # Errors
    ///
    /// Returns an error when only some of the required name, weight and
    /// price columns are present.
    pub(crate) fn resolve(&self) -> anyhow::Result<Option<rover_import::ColumnMapping>> {
        let required = [&self.name_column, &self.weight_column, &self.price_column];
        if required.iter().all(|column| column.is_none()) {
            if self.content_column.is_some() || self.artikel_column.is_some() || self.skip_header {
                anyhow::bail!(
                    "column mapping needs --name-column, --weight-column and --price-column"
                );
            }
            return Ok(None);
        }

        let (Some(name), Some(weight), Some(price)) = (
            self.name_column.clone(),
            self.weight_column.clone(),
            self.price_column.clone(),
        ) else {
            anyhow::bail!("column mapping needs --name-column, --weight-column and --price-column");
        };

        Ok(Some(rover_import::ColumnMapping {
            name,
            weight,
            price,
            content: self.content_column.clone(),
            artikel_nr: self.artikel_column.clone(),
            skip_header_row: self.skip_header,
        }))
    }
}

/// Validate a sheet on disk and hand back its file name plus raw bytes.
fn file_payload(path: &Path) -> anyhow::Result<(&str, Vec<u8>)> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("'{}' has no usable file name", path.display()))?;

    let size = fs::metadata(path)
        .with_context(|| format!("failed to stat '{}'", path.display()))?
        .len();
    rover_import::validate_import_file(file_name, size)?;

    let bytes = fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))?;
    Ok((file_name, bytes))
}

/// Read a sheet into rows of cell strings.
pub(crate) fn load_rows(path: &Path) -> anyhow::Result<Vec<Vec<String>>> {
    let (file_name, bytes) = file_payload(path)?;
    Ok(rover_import::read_rows(file_name, &bytes)?)
}

/// Print the first rows of a sheet, each cell prefixed with its column
/// letter, so an operator can pick mapping flags for `import products`.
///
/// # Errors
///
/// Returns an error when the file cannot be read or parsed.
pub(crate) fn run_import_preview(file: &Path, rows: usize) -> anyhow::Result<()> {
    let (file_name, bytes) = file_payload(file)?;
    let preview = rover_import::preview_rows(file_name, &bytes, rows)?;
    if preview.is_empty() {
        println!("'{}' has no rows", file.display());
        return Ok(());
    }

    for (index, row) in preview.iter().enumerate() {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(column, cell)| format!("{}={cell}", column_letter(column)))
            .collect();
        println!("row {}: {}", index + 1, cells.join("  "));
    }
    Ok(())
}

/// Spreadsheet column letter for a zero-based index (A, B, ..., Z, AA, ...).
fn column_letter(index: usize) -> String {
    const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut index = index;
    let mut letters = Vec::new();
    loop {
        letters.push(ALPHABET[index % 26]);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}
