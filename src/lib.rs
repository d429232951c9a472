//! Admission risk - batch scoring of hospital admission exports
//!
//! Upload a CSV or Excel export of admissions and get it back as a workbook
//! with per-row class probabilities and a thresholded prediction.
//!
//! # Modules
//!
//! - [`utils`] - Upload parsing (CSV, XLSX, XLS) into polars data frames
//! - [`preprocessing`] - Column contract, label encoding, imputation, min-max scaling
//! - [`inference`] - XGBoost JSON model evaluation and scoring
//! - [`export`] - Score annotation and `.xlsx` serialization
//! - [`service`] - The end-to-end pipeline shared by server and CLI
//! - [`server`] - HTTP server with the `/predict/` upload endpoint
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

pub mod utils;
pub mod preprocessing;
pub mod inference;
pub mod export;
pub mod service;

// Services
pub mod server;
pub mod cli;

pub use error::{AdmitError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{AdmitError, Result};

    pub use crate::utils::{DataLoader, FileFormat};

    pub use crate::preprocessing::{
        FeatureParams, FeatureTransformer, FitMode, LabelEncoder, MinMaxScaler,
    };

    pub use crate::inference::{ScoreBatch, Scorer, XgbModel, DECISION_THRESHOLD};

    pub use crate::export::{annotate, XlsxExporter};

    pub use crate::service::{PredictionOutput, PredictionService};
}
