use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort an ETL run.
///
/// Row-level problems (unknown ticker, unparsable date, empty value) never
/// become an `EtlError`; importers count and skip them instead.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Required file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("{file}: missing required column '{column}'")]
    MissingColumn { file: String, column: String },

    #[error("Cannot find year in filename: {0}")]
    FilenameYear(String),

    #[error("{file}: workbook has no worksheets")]
    EmptyWorkbook { file: String },

    #[error("Unsupported spreadsheet format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EtlError>;
