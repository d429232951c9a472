//! End-to-end prediction pipeline
//!
//! Upload bytes -> parsed table -> feature table -> scores -> annotated
//! workbook. Shared by the HTTP handler and the offline `predict` command.

use crate::error::Result;
use crate::export::{annotate, XlsxExporter};
use crate::inference::{Scorer, XgbModel};
use crate::preprocessing::{FeatureParams, FeatureTransformer};
use crate::utils::DataLoader;
use polars::prelude::DataFrame;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct PredictionOutput {
    /// Uploaded table with the three score columns appended
    pub table: DataFrame,
    /// `.xlsx` serialization of `table`
    pub workbook: Vec<u8>,
    pub rows: usize,
    pub positives: usize,
}

/// Immutable after construction; safe to share across requests.
#[derive(Debug, Clone)]
pub struct PredictionService {
    loader: DataLoader,
    transformer: FeatureTransformer,
    scorer: Scorer,
    exporter: XlsxExporter,
}

impl PredictionService {
    /// Per-batch fitting unless `params` supplies frozen encoder/scaler state.
    pub fn new(model: Arc<XgbModel>, params: Option<FeatureParams>) -> Self {
        let transformer = match params {
            Some(params) => FeatureTransformer::frozen(params),
            None => FeatureTransformer::per_batch(),
        };

        Self {
            loader: DataLoader::new(),
            transformer,
            scorer: Scorer::new(model),
            exporter: XlsxExporter::new(),
        }
    }

    /// Load the model (and optional frozen parameters) from disk.
    pub fn load(model_path: &Path, params_path: Option<&Path>) -> Result<Self> {
        let model = XgbModel::from_path(model_path)?;
        info!(
            path = %model_path.display(),
            trees = model.n_trees(),
            features = model.n_features(),
            objective = model.objective().as_str(),
            "Loaded classifier"
        );

        let params = match params_path {
            Some(path) => {
                let params = FeatureParams::from_path(path)?;
                info!(path = %path.display(), "Loaded frozen feature parameters");
                Some(params)
            }
            None => None,
        };

        Ok(Self::new(Arc::new(model), params))
    }

    pub fn model(&self) -> &XgbModel {
        self.scorer.model()
    }

    pub fn is_frozen(&self) -> bool {
        self.transformer.is_frozen()
    }

    pub fn loader(&self) -> &DataLoader {
        &self.loader
    }

    /// Score the rows of an uploaded file.
    pub fn run(&self, bytes: &[u8], file_name: &str) -> Result<PredictionOutput> {
        let start = Instant::now();

        let original = self.loader.load_bytes(bytes, file_name)?;
        debug!(file_name, rows = original.height(), columns = original.width(), "Parsed upload");

        self.run_table(original, start)
    }

    /// Score an already-parsed table.
    pub fn run_frame(&self, original: DataFrame) -> Result<PredictionOutput> {
        self.run_table(original, Instant::now())
    }

    fn run_table(&self, original: DataFrame, start: Instant) -> Result<PredictionOutput> {
        let features = self.transformer.transform(&original)?;
        let scores = self.scorer.score(&features)?;
        let table = annotate(&original, &scores)?;
        let workbook = self.exporter.to_bytes(&table)?;

        debug!(
            rows = scores.len(),
            positives = scores.positives(),
            bytes = workbook.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pipeline complete"
        );

        Ok(PredictionOutput {
            rows: scores.len(),
            positives: scores.positives(),
            table,
            workbook,
        })
    }
}
