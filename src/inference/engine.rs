//! Scoring of feature tables

use super::model::XgbModel;
use crate::error::{AdmitError, Result};
use crate::utils::is_numeric_dtype;
use ndarray::Array2;
use polars::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Positive-class probability at or above which a row is labelled 1.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Per-row scores, all vectors the length of the scored table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBatch {
    pub prob_class_0: Vec<f64>,
    pub prob_class_1: Vec<f64>,
    pub prediction: Vec<i64>,
}

impl ScoreBatch {
    pub fn len(&self) -> usize {
        self.prediction.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prediction.is_empty()
    }

    /// Number of rows labelled positive
    pub fn positives(&self) -> usize {
        self.prediction.iter().filter(|&&p| p == 1).count()
    }
}

/// Wraps the shared classifier and turns feature tables into scores
#[derive(Debug, Clone)]
pub struct Scorer {
    model: Arc<XgbModel>,
    threshold: f64,
}

impl Scorer {
    pub fn new(model: Arc<XgbModel>) -> Self {
        Self {
            model,
            threshold: DECISION_THRESHOLD,
        }
    }

    pub fn model(&self) -> &XgbModel {
        &self.model
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score every row of `features`.
    pub fn score(&self, features: &DataFrame) -> Result<ScoreBatch> {
        let start = Instant::now();

        self.check_columns(features)?;
        let x = feature_matrix(features)?;
        let proba = self.model.predict_proba(&x)?;

        let prob_class_0: Vec<f64> = proba.column(0).to_vec();
        let prob_class_1: Vec<f64> = proba.column(1).to_vec();
        let prediction = prob_class_1
            .iter()
            .map(|&p| if p >= self.threshold { 1 } else { 0 })
            .collect();

        debug!(
            rows = x.nrows(),
            features = x.ncols(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Scored feature table"
        );

        Ok(ScoreBatch {
            prob_class_0,
            prob_class_1,
            prediction,
        })
    }

    /// The feature table must match the model's training columns exactly.
    fn check_columns(&self, features: &DataFrame) -> Result<()> {
        let expected = self.model.feature_names();
        if expected.is_empty() {
            if features.width() != self.model.n_features() {
                return Err(AdmitError::Scoring(format!(
                    "feature shape mismatch, expected: {}, got {}",
                    self.model.n_features(),
                    features.width()
                )));
            }
            return Ok(());
        }

        let actual: Vec<String> = features
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        if actual.as_slice() == expected {
            return Ok(());
        }

        let missing: Vec<&str> = expected
            .iter()
            .filter(|name| !actual.contains(name))
            .map(|s| s.as_str())
            .collect();
        let unexpected: Vec<&str> = actual
            .iter()
            .filter(|name| !expected.contains(name))
            .map(|s| s.as_str())
            .collect();

        let detail = if missing.is_empty() && unexpected.is_empty() {
            format!("feature columns are out of order, expected [{}]", expected.join(", "))
        } else {
            let mut parts = Vec::new();
            if !missing.is_empty() {
                parts.push(format!("expected {} in input data", missing.join(", ")));
            }
            if !unexpected.is_empty() {
                parts.push(format!("training data did not have the following fields: {}", unexpected.join(", ")));
            }
            format!("feature_names mismatch: {}", parts.join("; "))
        };
        Err(AdmitError::Scoring(detail))
    }
}

/// Dense row-major matrix of a numeric feature table; nulls become NaN.
pub fn feature_matrix(features: &DataFrame) -> Result<Array2<f64>> {
    let rows = features.height();
    let cols = features.width();
    let mut x = Array2::<f64>::from_elem((rows, cols), f64::NAN);

    for (j, column) in features.get_columns().iter().enumerate() {
        let series = column.as_materialized_series();
        if !is_numeric_dtype(series.dtype()) {
            return Err(AdmitError::Scoring(format!(
                "feature column '{}' has non-numeric type {}",
                series.name(),
                series.dtype()
            )));
        }

        let values = series.cast(&DataType::Float64)?;
        for (i, v) in values.f64()?.into_iter().enumerate() {
            if let Some(v) = v {
                x[[i, j]] = v;
            }
        }
    }

    Ok(x)
}
