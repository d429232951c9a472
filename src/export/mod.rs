//! Result export module
//!
//! Appends the scores to the uploaded table and serializes it as `.xlsx`.

mod xlsx;

pub use xlsx::{annotate, XlsxExporter, PREDICTION, PROB_CLASS_0, PROB_CLASS_1, XLSX_CONTENT_TYPE};
