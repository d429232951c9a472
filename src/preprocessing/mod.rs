//! Data preprocessing module
//!
//! Feature engineering for admission exports:
//! - Column contract and drop list ([`schema`])
//! - Categorical label encoding
//! - Missing value imputation
//! - Min-max scaling
//! - The [`FeatureTransformer`] pipeline combining them

mod encoder;
mod imputer;
mod pipeline;
mod scaler;
pub mod schema;

pub use encoder::{LabelEncoder, NULL_TOKEN};
pub use imputer::ConstantImputer;
pub use pipeline::{FeatureParams, FeatureTransformer, FitMode};
pub use scaler::{MinMaxParams, MinMaxScaler};
