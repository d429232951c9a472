//! Error types for the admission scoring pipeline

use crate::utils::data_loader::FileFormat;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, AdmitError>;

/// Message returned to callers that upload anything other than CSV or Excel.
pub const UNSUPPORTED_FORMAT_MESSAGE: &str = "Unsupported file type. Please upload CSV or Excel.";

/// Main error type for loading, transforming, scoring and exporting
#[derive(Error, Debug)]
pub enum AdmitError {
    #[error("Unsupported file type. Please upload CSV or Excel.")]
    UnsupportedFormat { file_name: String },

    #[error("Could not parse {format} file: {detail}")]
    Parse { format: FileFormat, detail: String },

    #[error("Missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Invalid column '{column}': {reason}")]
    InvalidColumn { column: String, reason: String },

    #[error("Scoring error: {0}")]
    Scoring(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl AdmitError {
    /// True for failures caused by the uploaded data rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AdmitError::UnsupportedFormat { .. }
                | AdmitError::Parse { .. }
                | AdmitError::MissingColumns(_)
                | AdmitError::InvalidColumn { .. }
                | AdmitError::Scoring(_)
        )
    }
}

impl From<polars::error::PolarsError> for AdmitError {
    fn from(err: polars::error::PolarsError) -> Self {
        AdmitError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for AdmitError {
    fn from(err: serde_json::Error) -> Self {
        AdmitError::SerializationError(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for AdmitError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        AdmitError::Export(err.to_string())
    }
}

impl From<ndarray::ShapeError> for AdmitError {
    fn from(err: ndarray::ShapeError) -> Self {
        AdmitError::Scoring(err.to_string())
    }
}
