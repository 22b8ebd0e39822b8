//! Error types for the ecoprep library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum EcoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Unknown format '{0}': expected one of csv, tsv, txt, mtx, rds, seurat")]
    UnknownFormat(String),

    #[error("Cannot convert from '{from}' to '{to}'")]
    UnsupportedConversion { from: String, to: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Ambiguous directory contents: {0}")]
    Ambiguous(String),

    #[error("Subprocess '{command}' failed: {reason}")]
    Subprocess { command: String, reason: String },

    #[error("Matrix market error: {0}")]
    MatrixMarket(String),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, EcoError>;
