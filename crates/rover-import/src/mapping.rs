//! Excel-style column addressing. Operators describe where a field lives by
//! letter (`"A"`, `"AA"`); the name field additionally accepts several
//! letters at once (`"ABD"`), meaning the named columns are concatenated
//! into one value.

use serde::{Deserialize, Serialize};

use crate::error::ImportError;

/// Operator-supplied layout for a price list whose columns do not follow one
/// of the fixed layouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// One or more column letters; multiple letters concatenate.
    pub name: String,
    pub weight: String,
    pub price: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub artikel_nr: Option<String>,
    #[serde(default)]
    pub skip_header_row: bool,
}

/// `"A"` is 0, `"Z"` is 25, `"AA"` is 26.
pub fn column_letter_to_index(letters: &str) -> Result<usize, ImportError> {
    let trimmed = letters.trim();
    if trimmed.is_empty() {
        return Err(ImportError::InvalidColumn(letters.to_string()));
    }
    let mut index: usize = 0;
    for ch in trimmed.chars() {
        let upper = ch.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return Err(ImportError::InvalidColumn(letters.to_string()));
        }
        index = index * 26 + (upper as usize - 'A' as usize + 1);
    }
    Ok(index - 1)
}

/// Each character is its own single-letter column: `"ABD"` names columns
/// A, B and D.
pub fn multi_column_indices(letters: &str) -> Result<Vec<usize>, ImportError> {
    let trimmed = letters.trim();
    if trimmed.is_empty() {
        return Err(ImportError::InvalidColumn(letters.to_string()));
    }
    trimmed
        .chars()
        .map(|ch| {
            let upper = ch.to_ascii_uppercase();
            if upper.is_ascii_uppercase() {
                Ok(upper as usize - 'A' as usize)
            } else {
                Err(ImportError::InvalidColumn(letters.to_string()))
            }
        })
        .collect()
}

/// Concatenate the named cells with single spaces, skipping empty ones.
#[must_use]
pub fn resolve_multi_column(row: &[String], indices: &[usize]) -> String {
    indices
        .iter()
        .filter_map(|&idx| row.get(idx))
        .map(|cell| cell.trim())
        .filter(|cell| !cell.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_letters_map_to_zero_based_indices() {
        assert_eq!(column_letter_to_index("A").unwrap(), 0);
        assert_eq!(column_letter_to_index("K").unwrap(), 10);
        assert_eq!(column_letter_to_index("Z").unwrap(), 25);
    }

    #[test]
    fn double_letters_continue_past_z() {
        assert_eq!(column_letter_to_index("AA").unwrap(), 26);
        assert_eq!(column_letter_to_index("AB").unwrap(), 27);
    }

    #[test]
    fn letters_are_case_insensitive_and_trimmed() {
        assert_eq!(column_letter_to_index(" b ").unwrap(), 1);
        assert_eq!(multi_column_indices("abd").unwrap(), vec![0, 1, 3]);
    }

    #[test]
    fn non_letters_are_rejected() {
        assert!(column_letter_to_index("3").is_err());
        assert!(column_letter_to_index("").is_err());
        assert!(multi_column_indices("A1").is_err());
    }

    #[test]
    fn multi_letters_are_one_column_per_character() {
        assert_eq!(multi_column_indices("ABD").unwrap(), vec![0, 1, 3]);
    }

    #[test]
    fn concatenation_skips_empty_cells() {
        let row: Vec<String> = ["Whiskas", "", " Adult ", "1+"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let indices = multi_column_indices("ABCD").unwrap();
        assert_eq!(resolve_multi_column(&row, &indices), "Whiskas Adult 1+");
    }

    #[test]
    fn indices_past_the_row_end_contribute_nothing() {
        let row = vec!["only".to_string()];
        assert_eq!(resolve_multi_column(&row, &[0, 7]), "only");
    }

    #[test]
    fn mapping_deserializes_with_optional_fields_absent() {
        let mapping: ColumnMapping =
            serde_json::from_str(r#"{"name":"AB","weight":"C","price":"K"}"#).unwrap();
        assert_eq!(mapping.name, "AB");
        assert_eq!(mapping.content, None);
        assert_eq!(mapping.artikel_nr, None);
        assert!(!mapping.skip_header_row);
    }
}
