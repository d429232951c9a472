//! Feature engineering pipeline
//!
//! Maps a raw admission table to the numeric feature table the classifier
//! was trained on:
//!
//! 1. drop identifier, timestamp, free-text, comorbidity-flag and outcome columns
//! 2. label-encode the four categorical columns
//! 3. fill missing comorbidity counts with zero
//! 4. min-max scale `aoa`, `abn` and `comorb_count`
//!
//! Column order of the surviving columns is preserved.
//!
//! By default the encoder and scaler are fit on the batch being transformed,
//! so codes and ranges depend on what the upload contains. A frozen
//! [`FeatureParams`] file replaces that per-batch fit with fixed parameters.

use super::encoder::LabelEncoder;
use super::imputer::ConstantImputer;
use super::scaler::MinMaxScaler;
use super::schema::{self, CATEGORICAL_COLUMNS, COMORBIDITY_COUNT, SCALED_COLUMNS};
use crate::error::{AdmitError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Encoder vocabularies and scaler ranges used for one transform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureParams {
    pub encoder: LabelEncoder,
    pub scaler: MinMaxScaler,
}

impl FeatureParams {
    /// Load frozen parameters from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let params: FeatureParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Every categorical and scaled column must be covered.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = CATEGORICAL_COLUMNS
            .iter()
            .filter(|c| self.encoder.classes(c).is_none())
            .chain(SCALED_COLUMNS.iter().filter(|c| self.scaler.params(c).is_none()))
            .copied()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AdmitError::ConfigError(format!(
                "feature parameters do not cover column(s): {}",
                missing.join(", ")
            )))
        }
    }
}

/// How encoder and scaler parameters are obtained
#[derive(Debug, Clone, PartialEq)]
pub enum FitMode {
    /// Fit on every batch
    PerBatch,
    /// Reuse fixed parameters
    Frozen(FeatureParams),
}

/// Raw admission table -> model-ready feature table
#[derive(Debug, Clone)]
pub struct FeatureTransformer {
    mode: FitMode,
}

impl Default for FeatureTransformer {
    fn default() -> Self {
        Self::per_batch()
    }
}

impl FeatureTransformer {
    pub fn per_batch() -> Self {
        Self {
            mode: FitMode::PerBatch,
        }
    }

    pub fn frozen(params: FeatureParams) -> Self {
        Self {
            mode: FitMode::Frozen(params),
        }
    }

    pub fn mode(&self) -> &FitMode {
        &self.mode
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.mode, FitMode::Frozen(_))
    }

    /// Build the feature table for `df`.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        self.transform_with_params(df).map(|(features, _)| features)
    }

    /// Build the feature table and return the parameters that produced it.
    pub fn transform_with_params(&self, df: &DataFrame) -> Result<(DataFrame, FeatureParams)> {
        let start = Instant::now();

        let present: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let missing = schema::missing_columns(&present);
        if !missing.is_empty() {
            return Err(AdmitError::MissingColumns(missing));
        }

        let kept: Vec<String> = present
            .into_iter()
            .filter(|name| !schema::is_dropped(name))
            .collect();
        let features = df.select(kept)?;

        let encoder = match &self.mode {
            FitMode::Frozen(params) => params.encoder.clone(),
            FitMode::PerBatch => {
                let mut encoder = LabelEncoder::new();
                encoder.fit(&features, &CATEGORICAL_COLUMNS)?;
                encoder
            }
        };
        let features = encoder.transform(&features)?;

        let features = ConstantImputer::zero().transform(&features, &[COMORBIDITY_COUNT])?;

        let scaler = match &self.mode {
            FitMode::Frozen(params) => params.scaler.clone(),
            FitMode::PerBatch => {
                let mut scaler = MinMaxScaler::new();
                scaler.fit(&features, &SCALED_COLUMNS)?;
                scaler
            }
        };
        let features = scaler.transform(&features)?;

        debug!(
            rows = features.height(),
            columns = features.width(),
            frozen = self.is_frozen(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Feature table built"
        );

        Ok((features, FeatureParams { encoder, scaler }))
    }
}
