//! Missing value imputation

use crate::error::{AdmitError, Result};
use crate::utils::column_as_f64;
use polars::prelude::*;

/// Fills missing numeric values (nulls and NaNs) with a constant.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantImputer {
    fill_value: f64,
}

impl ConstantImputer {
    pub fn new(fill_value: f64) -> Self {
        Self { fill_value }
    }

    pub fn zero() -> Self {
        Self::new(0.0)
    }

    /// Fill the given columns, returning them as `Float64`.
    pub fn transform(&self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        let mut result = df.clone();

        for col_name in columns {
            let filled: Float64Chunked = column_as_f64(df, col_name)?
                .into_iter()
                .map(|opt| match opt {
                    Some(v) if !v.is_nan() => Some(v),
                    _ => Some(self.fill_value),
                })
                .collect();

            result
                .with_column(filled.with_name((*col_name).into()).into_series())
                .map_err(|e| AdmitError::DataError(e.to_string()))?;
        }

        Ok(result)
    }
}
