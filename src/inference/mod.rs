//! Inference module
//!
//! - [`XgbModel`]: an exported XGBoost tree ensemble, evaluated in parallel via rayon
//! - [`Scorer`]: checks a feature table against the model and produces
//!   per-row probabilities plus a thresholded label

mod engine;
mod model;

pub use engine::{feature_matrix, ScoreBatch, Scorer, DECISION_THRESHOLD};
pub use model::{Objective, Tree, XgbModel};
