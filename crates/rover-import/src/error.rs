use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unsupported file extension: {0} (expected .csv, .xlsx or .xls)")]
    UnsupportedExtension(String),

    #[error("file too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("file contains no data rows")]
    EmptyFile,

    #[error("file does not contain enough rows")]
    NotEnoughRows,

    #[error("workbook has no sheets")]
    NoSheets,

    #[error("invalid column letter: {0:?}")]
    InvalidColumn(String),

    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("failed to read csv: {0}")]
    Csv(#[from] csv::Error),
}
