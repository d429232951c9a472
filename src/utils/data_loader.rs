//! Data loading utilities
//!
//! Turns an uploaded byte stream into a [`DataFrame`], picking the parser from
//! the file name. Headers always come from the first row. No schema checks
//! happen here; the feature transformer reports missing columns.

use crate::error::{AdmitError, Result};
use calamine::{open_workbook_from_rs, Data, Range, Reader, Xls, Xlsx};
use polars::prelude::*;
use serde::Serialize;
use std::fmt;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

/// Cell contents read as missing, in addition to empty cells.
pub const NA_VALUES: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_na_value(text: &str) -> bool {
    NA_VALUES.contains(&text)
}

/// Upload formats understood by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileFormat {
    Csv,
    Xlsx,
    Xls,
}

impl FileFormat {
    /// Detect the format from a file name suffix, ignoring case.
    pub fn from_filename(file_name: &str) -> Result<Self> {
        let lower = file_name.to_lowercase();
        if lower.ends_with(".csv") {
            Ok(FileFormat::Csv)
        } else if lower.ends_with(".xlsx") {
            Ok(FileFormat::Xlsx)
        } else if lower.ends_with(".xls") {
            Ok(FileFormat::Xls)
        } else {
            Err(AdmitError::UnsupportedFormat {
                file_name: file_name.to_string(),
            })
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Xlsx => "xlsx",
            FileFormat::Xls => "xls",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Csv => write!(f, "CSV"),
            FileFormat::Xlsx => write!(f, "XLSX"),
            FileFormat::Xls => write!(f, "XLS"),
        }
    }
}

/// Data loader for uploaded admission exports
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows scanned for CSV schema inference (`None` scans every row)
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: None,
        }
    }

    /// Limit the number of rows used for CSV schema inference
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Parse raw upload bytes, choosing the parser from `file_name`.
    pub fn load_bytes(&self, bytes: &[u8], file_name: &str) -> Result<DataFrame> {
        let format = FileFormat::from_filename(file_name)?;
        self.load_format(bytes, format)
    }

    /// Read and parse a file from disk.
    pub fn load_path(&self, path: &Path) -> Result<DataFrame> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let format = FileFormat::from_filename(&file_name)?;
        let bytes = std::fs::read(path)?;
        self.load_format(&bytes, format)
    }

    pub fn load_format(&self, bytes: &[u8], format: FileFormat) -> Result<DataFrame> {
        match format {
            FileFormat::Csv => self.load_csv(bytes),
            FileFormat::Xlsx => load_excel::<Xlsx<_>>(bytes, format),
            FileFormat::Xls => load_excel::<Xls<_>>(bytes, format),
        }
    }

    fn load_csv(&self, bytes: &[u8]) -> Result<DataFrame> {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(CsvParseOptions::default().with_null_values(Some(
                NullValues::AllColumns(NA_VALUES.iter().map(|v| (*v).into()).collect()),
            )))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(|e| AdmitError::Parse {
                format: FileFormat::Csv,
                detail: e.to_string(),
            })
    }
}

fn load_excel<'a, R>(bytes: &'a [u8], format: FileFormat) -> Result<DataFrame>
where
    R: Reader<Cursor<&'a [u8]>>,
    R::Error: fmt::Display,
{
    let parse_err = |detail: String| AdmitError::Parse { format, detail };

    let range = first_sheet::<_, R>(Cursor::new(bytes)).map_err(parse_err)?;
    range_to_dataframe(&range).map_err(|e| parse_err(e.to_string()))
}

fn first_sheet<RS, R>(reader: RS) -> std::result::Result<Range<Data>, String>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: fmt::Display,
{
    let mut workbook = open_workbook_from_rs::<R, RS>(reader).map_err(|e| e.to_string())?;
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "workbook contains no worksheets".to_string())?
        .map_err(|e| e.to_string())
}

/// Inferred storage type of one spreadsheet column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Empty,
    Int,
    Float,
    Bool,
    Text,
}

impl CellKind {
    fn of(cell: &Data) -> Self {
        match cell {
            Data::Empty | Data::Error(_) => CellKind::Empty,
            Data::String(text) if text.is_empty() || is_na_value(text) => CellKind::Empty,
            Data::Int(_) => CellKind::Int,
            Data::Float(f) if is_integral(*f) => CellKind::Int,
            Data::Float(_) => CellKind::Float,
            Data::Bool(_) => CellKind::Bool,
            _ => CellKind::Text,
        }
    }

    fn merge(self, other: CellKind) -> CellKind {
        use CellKind::*;
        match (self, other) {
            (Empty, k) | (k, Empty) => k,
            (a, b) if a == b => a,
            (Int, Float) | (Float, Int) => Float,
            _ => Text,
        }
    }
}

fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64
}

static EMPTY_CELL: Data = Data::Empty;

fn range_to_dataframe(range: &Range<Data>) -> PolarsResult<DataFrame> {
    // The range begins at the first used cell; blank leading columns still
    // count towards column positions.
    let col_offset = range.start().map(|(_, col)| col as usize).unwrap_or(0);

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let body: Vec<&[Data]> = rows
        .filter(|row| !row.iter().all(|cell| matches!(cell, Data::Empty)))
        .collect();

    let mut columns: Vec<Column> = (0..col_offset)
        .map(|idx| {
            let values: Vec<Option<f64>> = vec![None; body.len()];
            Column::from(Series::new(format!("Unnamed: {}", idx).into(), values))
        })
        .collect();

    columns.extend(header.iter().enumerate().map(|(pos, cell)| {
        let name = header_name(cell, pos + col_offset);
        let cells: Vec<&Data> = body.iter().map(|row| row.get(pos).unwrap_or(&EMPTY_CELL)).collect();
        Column::from(build_series(&name, &cells))
    }));

    DataFrame::new(columns)
}

fn header_name(cell: &Data, idx: usize) -> String {
    match cell {
        Data::Empty => format!("Unnamed: {}", idx),
        Data::Float(f) if is_integral(*f) => format!("{}", *f as i64),
        other => cell_text(other).unwrap_or_else(|| format!("Unnamed: {}", idx)),
    }
}

fn build_series(name: &str, cells: &[&Data]) -> Series {
    let kind = cells
        .iter()
        .fold(CellKind::Empty, |acc, cell| acc.merge(CellKind::of(cell)));

    match kind {
        CellKind::Int => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(i) => Some(*i),
                    Data::Float(f) => Some(*f as i64),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), values)
        }
        CellKind::Float | CellKind::Empty => {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(i) => Some(*i as f64),
                    Data::Float(f) => Some(*f),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), values)
        }
        CellKind::Bool => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), values)
        }
        CellKind::Text => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|cell| match CellKind::of(cell) {
                    CellKind::Empty => None,
                    _ => cell_text(cell),
                })
                .collect();
            Series::new(name.into(), values)
        }
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(format!("{:?}", f)),
        Data::Bool(true) => Some("True".to_string()),
        Data::Bool(false) => Some("False".to_string()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_format_detection_ignores_case() {
        assert_eq!(FileFormat::from_filename("admissions.CSV").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_filename("batch.Xlsx").unwrap(), FileFormat::Xlsx);
        assert_eq!(FileFormat::from_filename("legacy.xls").unwrap(), FileFormat::Xls);
    }

    #[test]
    fn test_unsupported_suffix() {
        let err = FileFormat::from_filename("data.txt").unwrap_err();
        assert!(matches!(err, AdmitError::UnsupportedFormat { .. }));
        assert!(FileFormat::from_filename("csv").is_err());
    }

    #[test]
    fn test_load_csv_bytes() {
        let csv = b"gender,aoa,comorb_count\nM,64,2\nF,71,\n";
        let df = DataLoader::new().load_bytes(csv, "upload.csv").unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
        assert_eq!(df.column("comorb_count").unwrap().null_count(), 1);
    }

    #[test]
    fn test_load_xlsx_bytes() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "gender").unwrap();
        sheet.write_string(0, 1, "aoa").unwrap();
        sheet.write_string(0, 2, "abn").unwrap();
        sheet.write_string(1, 0, "M").unwrap();
        sheet.write_number(1, 1, 64.0).unwrap();
        sheet.write_number(1, 2, 0.5).unwrap();
        sheet.write_string(2, 0, "F").unwrap();
        sheet.write_number(2, 1, 71.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let df = DataLoader::new().load_bytes(&bytes, "upload.xlsx").unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("aoa").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("abn").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("abn").unwrap().null_count(), 1);
        assert_eq!(df.column("gender").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_malformed_excel_is_parse_error() {
        let err = DataLoader::new()
            .load_bytes(b"definitely not a zip archive", "upload.xlsx")
            .unwrap_err();
        assert!(matches!(err, AdmitError::Parse { format: FileFormat::Xlsx, .. }));
    }

    #[test]
    fn test_csv_na_tokens_are_null() {
        let csv = b"gender,comorb_count\nM,2\nNA,NA\nnull,\nF,N/A\n";
        let df = DataLoader::new().load_bytes(csv, "upload.csv").unwrap();
        let comorb = df.column("comorb_count").unwrap();
        assert_eq!(comorb.dtype(), &DataType::Int64);
        assert_eq!(comorb.null_count(), 3);
        assert_eq!(df.column("gender").unwrap().null_count(), 2);
    }

    #[test]
    fn test_excel_na_tokens_are_null() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "gender").unwrap();
        sheet.write_string(0, 1, "comorb_count").unwrap();
        sheet.write_string(1, 0, "M").unwrap();
        sheet.write_number(1, 1, 2.0).unwrap();
        sheet.write_string(2, 0, "NA").unwrap();
        sheet.write_string(2, 1, "#N/A").unwrap();
        sheet.write_string(3, 0, "F").unwrap();
        sheet.write_string(3, 1, "nan").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let df = DataLoader::new().load_bytes(&bytes, "upload.xlsx").unwrap();
        let comorb = df.column("comorb_count").unwrap();
        assert_eq!(comorb.dtype(), &DataType::Int64);
        assert_eq!(comorb.null_count(), 2);
        let gender: Vec<Option<&str>> = df.column("gender").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(gender, vec![Some("M"), None, Some("F")]);
    }

    #[test]
    fn test_excel_blank_leading_column_keeps_position() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 1, "gender").unwrap();
        sheet.write_string(0, 2, "aoa").unwrap();
        sheet.write_string(1, 1, "M").unwrap();
        sheet.write_number(1, 2, 64.0).unwrap();
        sheet.write_string(3, 1, "F").unwrap();
        sheet.write_number(3, 2, 71.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let df = DataLoader::new().load_bytes(&bytes, "upload.xlsx").unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["Unnamed: 0", "gender", "aoa"]);
        // the blank row between the two records is skipped
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("Unnamed: 0").unwrap().null_count(), 2);
    }

    #[test]
    fn test_cell_kind_merge() {
        assert_eq!(CellKind::Int.merge(CellKind::Float), CellKind::Float);
        assert_eq!(CellKind::Empty.merge(CellKind::Bool), CellKind::Bool);
        assert_eq!(CellKind::Int.merge(CellKind::Text), CellKind::Text);
        assert_eq!(CellKind::Bool.merge(CellKind::Int), CellKind::Text);
    }
}
