//! Utility functions and types

pub mod data_loader;

pub use data_loader::{DataLoader, FileFormat};

use polars::prelude::*;

/// Whether a column's dtype can be read as a numeric feature value.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Boolean
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Read a numeric column as `f64` values with nulls mapped to `None`.
pub fn column_as_f64(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| crate::AdmitError::MissingColumns(vec![name.to_string()]))?;
    let series = column.as_materialized_series();

    if !is_numeric_dtype(series.dtype()) {
        return Err(crate::AdmitError::InvalidColumn {
            column: name.to_string(),
            reason: format!("expected a numeric column, found {}", series.dtype()),
        });
    }

    let cast = series.cast(&DataType::Float64)?;
    let values = cast.f64()?.into_iter().collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_dtypes() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float32));
        assert!(is_numeric_dtype(&DataType::Boolean));
        assert!(!is_numeric_dtype(&DataType::String));
    }

    #[test]
    fn test_column_as_f64_rejects_text() {
        let df = df!("gender" => &["M", "F"]).unwrap();
        let err = column_as_f64(&df, "gender").unwrap_err();
        assert!(matches!(err, crate::AdmitError::InvalidColumn { .. }));
    }

    #[test]
    fn test_column_as_f64_keeps_nulls() {
        let df = df!("comorb_count" => &[Some(2i64), None, Some(5)]).unwrap();
        let values = column_as_f64(&df, "comorb_count").unwrap();
        assert_eq!(values, vec![Some(2.0), None, Some(5.0)]);
    }
}
