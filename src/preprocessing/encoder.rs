//! Categorical label encoding
//!
//! Values are compared as strings. The vocabulary of a column is the sorted
//! set of distinct strings seen during `fit`, and a value's code is its
//! position in that vocabulary. Nulls take part as the literal [`NULL_TOKEN`].

use crate::error::{AdmitError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// String used for missing categorical values.
pub const NULL_TOKEN: &str = "nan";

/// Label encoder over one or more categorical columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    // column name -> sorted vocabulary
    classes: BTreeMap<String, Vec<String>>,
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an encoder from known vocabularies. Each vocabulary is sorted and
    /// deduplicated so codes stay deterministic.
    pub fn from_classes(classes: BTreeMap<String, Vec<String>>) -> Self {
        let classes = classes
            .into_iter()
            .map(|(col, values)| {
                let set: BTreeSet<String> = values.into_iter().collect();
                (col, set.into_iter().collect())
            })
            .collect();
        Self { classes }
    }

    /// Fit the encoder to the data
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let values = stringify_column(df, col_name)?;
            let vocabulary: BTreeSet<String> = values.into_iter().collect();
            self.classes
                .insert(col_name.to_string(), vocabulary.into_iter().collect());
        }
        Ok(self)
    }

    /// Replace every fitted column with its integer codes. Values outside the
    /// vocabulary become null.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();

        for (col_name, vocabulary) in &self.classes {
            let values = stringify_column(df, col_name)?;
            let codes: Vec<Option<i64>> = values
                .iter()
                .map(|v| {
                    vocabulary
                        .binary_search(v)
                        .ok()
                        .map(|idx| idx as i64)
                })
                .collect();

            result
                .with_column(Series::new(col_name.as_str().into(), codes))
                .map_err(|e| AdmitError::DataError(e.to_string()))?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Fitted vocabulary of a column
    pub fn classes(&self, column: &str) -> Option<&[String]> {
        self.classes.get(column).map(|v| v.as_slice())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(|k| k.as_str())
    }
}

/// Render every value of a column as a string, mapping nulls to [`NULL_TOKEN`].
fn stringify_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df
        .column(name)
        .map_err(|_| AdmitError::MissingColumns(vec![name.to_string()]))?;
    let series = column.as_materialized_series().cast(&DataType::String)?;
    let ca = series.str()?;

    Ok(ca
        .into_iter()
        .map(|v| v.unwrap_or(NULL_TOKEN).to_string())
        .collect())
}
