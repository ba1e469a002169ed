//! Format-agnostic reading of upload bytes into a rectangular grid of
//! strings, anchored at cell A1 so column letters line up regardless of
//! where the sheet's used range starts.

use std::io::Cursor;
use std::str::FromStr;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_decimal::Decimal;

use crate::error::ImportError;

/// Upload size cap.
pub const MAX_IMPORT_BYTES: u64 = 10 * 1024 * 1024;

const VALID_EXTENSIONS: [&str; 3] = [".csv", ".xlsx", ".xls"];

enum FileKind {
    Csv,
    Workbook,
}

fn detect_kind(file_name: &str) -> Result<FileKind, ImportError> {
    let lower = file_name.to_lowercase();
    if lower.ends_with(".csv") {
        Ok(FileKind::Csv)
    } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
        Ok(FileKind::Workbook)
    } else {
        Err(ImportError::UnsupportedExtension(file_name.to_string()))
    }
}

/// Reject files we will not even try to parse: wrong extension or over the
/// size cap.
pub fn validate_import_file(file_name: &str, size: u64) -> Result<(), ImportError> {
    let lower = file_name.to_lowercase();
    if !VALID_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return Err(ImportError::UnsupportedExtension(file_name.to_string()));
    }
    if size > MAX_IMPORT_BYTES {
        return Err(ImportError::FileTooLarge {
            size,
            limit: MAX_IMPORT_BYTES,
        });
    }
    Ok(())
}

/// Read the whole upload into rows of cell strings. Excel workbooks use the
/// first sheet only; CSVs are read without a header convention, one record
/// per row.
pub fn read_rows(file_name: &str, bytes: &[u8]) -> Result<Vec<Vec<String>>, ImportError> {
    match detect_kind(file_name)? {
        FileKind::Csv => read_csv_rows(bytes),
        FileKind::Workbook => read_workbook_rows(bytes),
    }
}

/// First `max_rows` rows, for showing the operator what a column mapping
/// will land on.
pub fn preview_rows(
    file_name: &str,
    bytes: &[u8],
    max_rows: usize,
) -> Result<Vec<Vec<String>>, ImportError> {
    let mut rows = read_rows(file_name, bytes)?;
    rows.truncate(max_rows);
    Ok(rows)
}

fn read_csv_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(ToString::to_string).collect());
    }
    Ok(rows)
}

fn read_workbook_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ImportError::NoSheets)?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let Some((max_row, max_col)) = range.end() else {
        return Ok(Vec::new());
    };

    let mut rows = Vec::with_capacity(max_row as usize + 1);
    for r in 0..=max_row {
        let mut cells = Vec::with_capacity(max_col as usize + 1);
        for c in 0..=max_col {
            let value = range.get_value((r, c)).unwrap_or(&Data::Empty);
            cells.push(cell_to_string(value));
        }
        rows.push(cells);
    }
    Ok(rows)
}

pub(crate) fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => format!("{f}"),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Trimmed cell text with an empty default for short rows.
pub(crate) fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map_or("", |s| s.trim())
}

/// Leading numeric portion of a cell, with German decimal commas accepted.
/// Trailing units like `"96 Stk"` are ignored; a cell with no leading number
/// yields `None`.
pub(crate) fn float_value(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', ".");
    f64::from_str(numeric_prefix(&cleaned)?).ok()
}

/// Same scan as [`float_value`] but parsed exactly, for prices.
pub(crate) fn decimal_value(raw: &str) -> Option<Decimal> {
    let cleaned = raw.trim().replace(',', ".");
    Decimal::from_str(numeric_prefix(&cleaned)?).ok()
}

fn numeric_prefix(cleaned: &str) -> Option<&str> {
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_digit = false;
    for (i, ch) in cleaned.char_indices() {
        match ch {
            '-' if i == 0 => {}
            '.' if !seen_dot => seen_dot = true,
            c if c.is_ascii_digit() => seen_digit = true,
            _ => break,
        }
        end = i + ch.len_utf8();
    }
    if seen_digit {
        Some(&cleaned[..end])
    } else {
        None
    }
}
