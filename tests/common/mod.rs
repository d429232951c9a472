//! Shared fixtures for integration tests
#![allow(dead_code)]

use admit_risk::preprocessing::schema::{DROPPED_COLUMNS, TARGET_COLUMNS};
use rust_xlsxwriter::Workbook;
use std::path::PathBuf;

pub const BOUNDARY: &str = "admit-risk-test-boundary";

/// Categorical and numeric inputs of each admission row:
/// admission_type, admission_location, discharge_location, gender, aoa, abn, comorb_count
pub const ROWS: [(&str, &str, &str, &str, f64, f64, Option<f64>); 5] = [
    ("EMERGENCY", "EMERGENCY ROOM ADMIT", "HOME", "M", 72.5, 3.0, Some(4.0)),
    ("ELECTIVE", "PHYS REFERRAL/NORMAL DELI", "HOME HEALTH CARE", "F", 45.0, 0.0, None),
    ("EMERGENCY", "TRANSFER FROM HOSP/EXTRAM", "SNF", "F", 88.25, 7.0, Some(2.0)),
    ("URGENT", "EMERGENCY ROOM ADMIT", "DEAD/EXPIRED", "M", 60.0, 1.0, Some(0.0)),
    ("EMERGENCY", "CLINIC REFERRAL/PREMATURE", "REHAB/DISTINCT PART HOSP", "M", 51.75, 2.0, Some(1.0)),
];

pub fn model_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/model.json")
}

/// Every contract column in export order.
pub fn header() -> Vec<String> {
    DROPPED_COLUMNS
        .iter()
        .chain(TARGET_COLUMNS.iter())
        .chain(
            [
                "admission_type",
                "admission_location",
                "discharge_location",
                "gender",
                "aoa",
                "abn",
                "comorb_count",
            ]
            .iter(),
        )
        .map(|s| s.to_string())
        .collect()
}

fn dropped_value(name: &str, row: usize) -> String {
    match name {
        "subject_id" => format!("{}", 1000 + row),
        "hadm_id" => format!("{}", 20000 + row),
        "admittime" => format!("2130-01-{:02} 08:00:00", row + 1),
        _ => format!("v{}", row),
    }
}

/// CSV export with every column except those in `skip`.
pub fn admissions_csv_without(skip: &[&str]) -> String {
    render_csv(skip, "")
}

/// CSV export writing missing `comorb_count` values as `missing`.
pub fn admissions_csv_with_missing(missing: &str) -> String {
    render_csv(&[], missing)
}

fn render_csv(skip: &[&str], missing: &str) -> String {
    let columns: Vec<String> = header().into_iter().filter(|c| !skip.contains(&c.as_str())).collect();
    let mut out = columns.join(",");
    out.push('\n');

    for (i, row) in ROWS.iter().enumerate() {
        let cells: Vec<String> = columns
            .iter()
            .map(|name| match name.as_str() {
                "admission_type" => row.0.to_string(),
                "admission_location" => row.1.to_string(),
                "discharge_location" => row.2.to_string(),
                "gender" => row.3.to_string(),
                "aoa" => row.4.to_string(),
                "abn" => row.5.to_string(),
                "comorb_count" => row.6.map(|v| v.to_string()).unwrap_or_else(|| missing.to_string()),
                other => dropped_value(other, i),
            })
            .collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

pub fn admissions_csv() -> String {
    admissions_csv_without(&[])
}

/// The same export as [`admissions_csv`], written as a workbook.
pub fn admissions_xlsx() -> Vec<u8> {
    let columns = header();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (c, name) in columns.iter().enumerate() {
        let col = c as u16;
        sheet.write_string(0, col, name.as_str()).unwrap();
        for (i, row) in ROWS.iter().enumerate() {
            let r = (i + 1) as u32;
            match name.as_str() {
                "admission_type" => { sheet.write_string(r, col, row.0).unwrap(); }
                "admission_location" => { sheet.write_string(r, col, row.1).unwrap(); }
                "discharge_location" => { sheet.write_string(r, col, row.2).unwrap(); }
                "gender" => { sheet.write_string(r, col, row.3).unwrap(); }
                "aoa" => { sheet.write_number(r, col, row.4).unwrap(); }
                "abn" => { sheet.write_number(r, col, row.5).unwrap(); }
                "comorb_count" => {
                    if let Some(v) = row.6 {
                        sheet.write_number(r, col, v).unwrap();
                    }
                }
                "subject_id" | "hadm_id" => {
                    let v: f64 = dropped_value(name, i).parse().unwrap();
                    sheet.write_number(r, col, v).unwrap();
                }
                other => { sheet.write_string(r, col, dropped_value(other, i)).unwrap(); }
            }
        }
    }

    workbook.save_to_buffer().unwrap()
}

/// Multipart body with a single file part; returns (content type, body).
pub fn multipart_file(file_name: &str, content: &[u8]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// Multipart body whose only part is a plain form field.
pub fn multipart_text(name: &str, value: &str) -> (String, Vec<u8>) {
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n--{BOUNDARY}--\r\n"
    );
    (format!("multipart/form-data; boundary={BOUNDARY}"), body.into_bytes())
}
