//! Annotated spreadsheet output
//!
//! The scores are appended to the table as it was uploaded (not the feature
//! table) and written as a single-sheet workbook: header row, no index
//! column, missing values left blank.

use crate::error::{AdmitError, Result};
use crate::inference::ScoreBatch;
use crate::utils::is_numeric_dtype;
use polars::prelude::*;
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook, Worksheet};

pub const PROB_CLASS_0: &str = "prob_class_0";
pub const PROB_CLASS_1: &str = "prob_class_1";
pub const PREDICTION: &str = "prediction";

/// MIME type of the generated workbook
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Append `prob_class_0`, `prob_class_1` and `prediction` to `original`.
///
/// Existing columns with those names are overwritten in place.
pub fn annotate(original: &DataFrame, scores: &ScoreBatch) -> Result<DataFrame> {
    if scores.len() != original.height() {
        return Err(AdmitError::Scoring(format!(
            "{} scores for {} input rows",
            scores.len(),
            original.height()
        )));
    }

    let mut annotated = original.clone();
    annotated.with_column(Series::new(PROB_CLASS_0.into(), scores.prob_class_0.as_slice()))?;
    annotated.with_column(Series::new(PROB_CLASS_1.into(), scores.prob_class_1.as_slice()))?;
    annotated.with_column(Series::new(PREDICTION.into(), scores.prediction.as_slice()))?;
    Ok(annotated)
}

/// Writes data frames as `.xlsx` byte streams
#[derive(Debug, Clone)]
pub struct XlsxExporter {
    sheet_name: String,
}

impl Default for XlsxExporter {
    fn default() -> Self {
        Self {
            sheet_name: "Sheet1".to_string(),
        }
    }
}

impl XlsxExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Serialize `df` to workbook bytes.
    pub fn to_bytes(&self, df: &DataFrame) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();

        // Fixed creation time so identical input yields identical bytes.
        let created = ExcelDateTime::from_ymd(1980, 1, 1)?;
        workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));

        let header_format = Format::new()
            .set_bold()
            .set_border(FormatBorder::Thin)
            .set_align(FormatAlign::Center);

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(self.sheet_name.as_str())?;

        for (idx, column) in df.get_columns().iter().enumerate() {
            let col = u16::try_from(idx)
                .map_err(|_| AdmitError::Export(format!("too many columns: {}", df.width())))?;
            worksheet.write_string_with_format(0, col, column.name().as_str(), &header_format)?;
            write_column(worksheet, col, column.as_materialized_series())?;
        }

        Ok(workbook.save_to_buffer()?)
    }
}

fn sheet_row(idx: usize) -> Result<u32> {
    // row 0 holds the header
    u32::try_from(idx + 1).map_err(|_| AdmitError::Export(format!("too many rows: {}", idx)))
}

fn write_column(worksheet: &mut Worksheet, col: u16, series: &Series) -> Result<()> {
    let dtype = series.dtype();

    if *dtype == DataType::Boolean {
        for (idx, value) in series.bool()?.into_iter().enumerate() {
            if let Some(b) = value {
                worksheet.write_boolean(sheet_row(idx)?, col, b)?;
            }
        }
    } else if is_numeric_dtype(dtype) {
        let values = series.cast(&DataType::Float64)?;
        for (idx, value) in values.f64()?.into_iter().enumerate() {
            match value {
                Some(v) if v.is_finite() => {
                    worksheet.write_number(sheet_row(idx)?, col, v)?;
                }
                Some(v) if v.is_infinite() => {
                    let text = if v > 0.0 { "inf" } else { "-inf" };
                    worksheet.write_string(sheet_row(idx)?, col, text)?;
                }
                _ => {}
            }
        }
    } else {
        let values = series.cast(&DataType::String)?;
        for (idx, value) in values.str()?.into_iter().enumerate() {
            if let Some(s) = value {
                worksheet.write_string(sheet_row(idx)?, col, s)?;
            }
        }
    }

    Ok(())
}
