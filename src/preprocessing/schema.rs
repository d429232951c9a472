//! Column contract of the admission export
//!
//! These names must match the upstream export exactly. Every column listed
//! here is required: the transformer refuses a table that lacks any of them.

/// Identifier, timestamp, free-text and comorbidity-flag columns removed
/// before scoring.
pub const DROPPED_COLUMNS: [&str; 41] = [
    "row_id_x",
    "row_id_y",
    "subject_id",
    "hadm_id",
    "admittime",
    "dischtime",
    "deathtime",
    "dob",
    "dod",
    "dod_hosp",
    "dod_ssn",
    "edregtime",
    "edouttime",
    "has_chartevents_data",
    "diagnosis",
    "language",
    "religion",
    "ethnicity",
    "fluid_balance",
    "input_amt",
    "output_amt",
    "expire_flag",
    "hospital_expire_flag",
    "insurance",
    "marital_status",
    "blood",
    "circulatory",
    "congenital",
    "digestive",
    "endocrine/metabolic",
    "genitourinary",
    "infectious",
    "injury/poisoning",
    "mental",
    "musculoskeletal",
    "neoplasms",
    "nervous/senses",
    "respiratory",
    "skin",
    "symptoms/signs",
    "unknown",
];

/// Outcome columns; never fed to the classifier.
pub const TARGET_COLUMNS: [&str; 3] = ["dud", "mortality_90d", "los"];

/// Admission metadata columns replaced by integer codes.
pub const CATEGORICAL_COLUMNS: [&str; 4] = [
    "admission_type",
    "admission_location",
    "discharge_location",
    "gender",
];

/// Comorbidity count; missing values become zero before scaling.
pub const COMORBIDITY_COUNT: &str = "comorb_count";

/// Columns rescaled to [0, 1].
pub const SCALED_COLUMNS: [&str; 3] = ["aoa", "abn", COMORBIDITY_COUNT];

/// Whether a column is removed before scoring.
pub fn is_dropped(name: &str) -> bool {
    DROPPED_COLUMNS.contains(&name) || TARGET_COLUMNS.contains(&name)
}

/// Every column the transformer needs, in contract order without duplicates.
pub fn required_columns() -> Vec<&'static str> {
    let mut required: Vec<&'static str> = Vec::new();
    let all = DROPPED_COLUMNS
        .iter()
        .chain(TARGET_COLUMNS.iter())
        .chain(CATEGORICAL_COLUMNS.iter())
        .chain(SCALED_COLUMNS.iter());
    for name in all {
        if !required.contains(name) {
            required.push(*name);
        }
    }
    required
}

/// Required columns absent from `present`, in contract order.
pub fn missing_columns<S: AsRef<str>>(present: &[S]) -> Vec<String> {
    required_columns()
        .into_iter()
        .filter(|name| !present.iter().any(|p| p.as_ref() == *name))
        .map(String::from)
        .collect()
}
