//! Min-max feature scaling

use crate::error::{AdmitError, Result};
use crate::utils::column_as_f64;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Observed range of one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxParams {
    pub min: f64,
    pub max: f64,
}

impl MinMaxParams {
    /// Divisor applied after shifting by `min`. A zero range divides by one so
    /// constant columns map to zero.
    pub fn scale(&self) -> f64 {
        let range = self.max - self.min;
        if range == 0.0 {
            1.0
        } else {
            range
        }
    }

    pub fn apply(&self, value: f64) -> f64 {
        (value - self.min) / self.scale()
    }
}

/// Min-max scaler: (x - min) / (max - min)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    params: BTreeMap<String, MinMaxParams>,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_params(params: BTreeMap<String, MinMaxParams>) -> Self {
        Self { params }
    }

    /// Fit the scaler to the data. Nulls and NaNs are ignored.
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let values = column_as_f64(df, col_name)?;
            let params = compute_params(&values);
            self.params.insert(col_name.to_string(), params);
        }
        Ok(self)
    }

    /// Rescale every fitted column. Builds all replacement columns first, then
    /// applies them in a single pass.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let replacements: Vec<Series> = self
            .params
            .iter()
            .map(|(col_name, params)| {
                let values = column_as_f64(df, col_name)?;
                let scaled: Float64Chunked = values
                    .into_iter()
                    .map(|opt| opt.map(|v| params.apply(v)))
                    .collect();
                Ok(scaled.with_name(col_name.as_str().into()).into_series())
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result
                .with_column(scaled)
                .map_err(|e| AdmitError::DataError(e.to_string()))?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    pub fn params(&self, column: &str) -> Option<&MinMaxParams> {
        self.params.get(column)
    }
}

fn compute_params(values: &[Option<f64>]) -> MinMaxParams {
    let observed = values.iter().flatten().copied().filter(|v| !v.is_nan());
    let (min, max) = observed.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if min.is_finite() && max.is_finite() {
        MinMaxParams { min, max }
    } else {
        MinMaxParams { min: 0.0, max: 1.0 }
    }
}
