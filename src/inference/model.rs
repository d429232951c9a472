//! XGBoost tree ensembles loaded from the JSON model format
//!
//! Only evaluation is implemented. The artifact must be written with
//! `Booster.save_model("model.json")` (or the sklearn wrapper equivalent).
//!
//! Evaluation follows XGBoost:
//! - features are compared as `f32`; `x < split_condition` goes left
//! - a missing value (NaN) follows the node's default direction
//! - a leaf's value is stored in its `split_conditions` slot
//! - margin = sum of leaf values + base margin

use crate::error::{AdmitError, Result};
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Learning objectives that yield a single positive-class probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Objective {
    /// `binary:logistic`
    BinaryLogistic,
    /// `reg:logistic`
    RegLogistic,
    /// `binary:logitraw`; probabilities come from a sigmoid of the margin
    BinaryLogitRaw,
}

impl Objective {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "binary:logistic" => Ok(Objective::BinaryLogistic),
            "reg:logistic" => Ok(Objective::RegLogistic),
            "binary:logitraw" => Ok(Objective::BinaryLogitRaw),
            other => Err(AdmitError::Model(format!(
                "unsupported objective '{}', expected a binary logistic model",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Objective::BinaryLogistic => "binary:logistic",
            Objective::RegLogistic => "reg:logistic",
            Objective::BinaryLogitRaw => "binary:logitraw",
        }
    }

    /// Convert the stored `base_score` into margin space.
    fn base_margin(&self, base_score: f64) -> Result<f64> {
        match self {
            Objective::BinaryLogitRaw => Ok(base_score),
            Objective::BinaryLogistic | Objective::RegLogistic => {
                if base_score <= 0.0 || base_score >= 1.0 {
                    return Err(AdmitError::Model(format!(
                        "base_score {} must lie strictly between 0 and 1",
                        base_score
                    )));
                }
                Ok(-(1.0 / base_score - 1.0).ln())
            }
        }
    }
}

// ─── JSON document ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ModelDocument {
    learner: LearnerDocument,
    #[serde(default)]
    version: Vec<u32>,
}

#[derive(Deserialize)]
struct LearnerDocument {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: BoosterDocument,
    learner_model_param: LearnerModelParam,
    objective: ObjectiveDocument,
}

#[derive(Deserialize)]
struct BoosterDocument {
    name: String,
    model: Option<ForestDocument>,
}

#[derive(Deserialize)]
struct ForestDocument {
    trees: Vec<TreeDocument>,
}

#[derive(Deserialize)]
struct TreeDocument {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    default_left: Vec<Flag>,
    // 0 = numerical, 1 = categorical; absent before XGBoost 1.6
    #[serde(default)]
    split_type: Vec<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(i) => *i != 0,
        }
    }
}

#[derive(Deserialize)]
struct LearnerModelParam {
    base_score: Value,
    num_feature: Value,
    #[serde(default)]
    num_class: Option<Value>,
}

#[derive(Deserialize)]
struct ObjectiveDocument {
    name: String,
}

/// Parse a learner parameter. XGBoost writes these as strings such as `"5E-1"`,
/// newer releases wrap vector-valued ones in brackets (`"[5E-1]"`).
fn param_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .trim()
            .parse()
            .ok(),
        _ => None,
    }
}

// ─── Trees ──────────────────────────────────────────────────────────────────

/// A single node in a regression tree
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f32,
    },
    Split {
        feature: usize,
        threshold: f32,
        default_left: bool,
        left: usize,
        right: usize,
    },
}

/// One regression tree stored as a flat node array; node 0 is the root.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_document(doc: TreeDocument, n_features: usize, tree_idx: usize) -> Result<Self> {
        let n = doc.left_children.len();
        let invalid = |reason: String| AdmitError::Model(format!("tree {}: {}", tree_idx, reason));

        if n == 0 {
            return Err(invalid("tree has no nodes".to_string()));
        }
        if doc.right_children.len() != n
            || doc.split_indices.len() != n
            || doc.split_conditions.len() != n
            || doc.default_left.len() != n
        {
            return Err(invalid("node arrays have different lengths".to_string()));
        }
        if let Some(idx) = doc.split_type.iter().position(|&t| t != 0) {
            return Err(invalid(format!(
                "node {} uses a categorical split, only numerical splits are supported",
                idx
            )));
        }

        let mut nodes = Vec::with_capacity(n);
        for idx in 0..n {
            let left = doc.left_children[idx];
            let right = doc.right_children[idx];

            if left == -1 {
                nodes.push(Node::Leaf {
                    value: doc.split_conditions[idx] as f32,
                });
                continue;
            }

            // Children always follow their parent, which rules out cycles.
            let child = |c: i64| -> Result<usize> {
                usize::try_from(c)
                    .ok()
                    .filter(|&c| c > idx && c < n)
                    .ok_or_else(|| invalid(format!("node {} has invalid child {}", idx, c)))
            };
            let feature = usize::try_from(doc.split_indices[idx])
                .ok()
                .filter(|&f| f < n_features)
                .ok_or_else(|| {
                    invalid(format!(
                        "node {} splits on feature {} but the model has {} features",
                        idx, doc.split_indices[idx], n_features
                    ))
                })?;

            nodes.push(Node::Split {
                feature,
                threshold: doc.split_conditions[idx] as f32,
                default_left: doc.default_left[idx].is_set(),
                left: child(left)?,
                right: child(right)?,
            });
        }

        Ok(Self { nodes })
    }

    /// Leaf value reached by `row`.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f32 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    default_left,
                    left,
                    right,
                } => {
                    let x = row[*feature];
                    let go_left = if x.is_nan() {
                        *default_left
                    } else {
                        (x as f32) < *threshold
                    };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

// ─── Model ──────────────────────────────────────────────────────────────────

/// Immutable binary classifier loaded once at startup
#[derive(Debug, Clone)]
pub struct XgbModel {
    trees: Vec<Tree>,
    objective: Objective,
    base_score: f64,
    base_margin: f64,
    feature_names: Vec<String>,
    n_features: usize,
    version: Option<String>,
}

impl XgbModel {
    /// Load a model from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AdmitError::Model(format!("cannot read model file {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    /// Parse a model from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: ModelDocument = serde_json::from_str(json)
            .map_err(|e| AdmitError::Model(format!("invalid XGBoost JSON model: {}", e)))?;
        let learner = doc.learner;

        if learner.gradient_booster.name != "gbtree" {
            return Err(AdmitError::Model(format!(
                "unsupported booster '{}', only gbtree models can be evaluated",
                learner.gradient_booster.name
            )));
        }

        let params = &learner.learner_model_param;
        let num_class = params.num_class.as_ref().and_then(param_f64).unwrap_or(0.0);
        if num_class > 1.0 {
            return Err(AdmitError::Model(format!(
                "model has {} classes, expected a binary classifier",
                num_class
            )));
        }

        let n_features = param_f64(&params.num_feature)
            .filter(|n| *n >= 1.0)
            .map(|n| n as usize)
            .ok_or_else(|| AdmitError::Model("missing or invalid num_feature".to_string()))?;
        let base_score = param_f64(&params.base_score)
            .ok_or_else(|| AdmitError::Model("missing or invalid base_score".to_string()))?;

        if !learner.feature_names.is_empty() && learner.feature_names.len() != n_features {
            return Err(AdmitError::Model(format!(
                "model lists {} feature names but num_feature is {}",
                learner.feature_names.len(),
                n_features
            )));
        }

        let objective = Objective::parse(&learner.objective.name)?;
        let base_margin = objective.base_margin(base_score)?;

        let forest = learner
            .gradient_booster
            .model
            .ok_or_else(|| AdmitError::Model("gbtree model has no trees".to_string()))?;
        let trees = forest
            .trees
            .into_iter()
            .enumerate()
            .map(|(idx, doc)| Tree::from_document(doc, n_features, idx))
            .collect::<Result<Vec<_>>>()?;

        let version = if doc.version.is_empty() {
            None
        } else {
            Some(
                doc.version
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join("."),
            )
        };

        Ok(Self {
            trees,
            objective,
            base_score,
            base_margin,
            feature_names: learner.feature_names,
            n_features,
            version,
        })
    }

    /// Raw margin for one row.
    pub fn predict_margin(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.base_margin
            + self
                .trees
                .iter()
                .map(|tree| tree.predict_row(row) as f64)
                .sum::<f64>()
    }

    /// Positive-class probability for one row.
    pub fn predict_row_proba(&self, row: ArrayView1<'_, f64>) -> f64 {
        sigmoid(self.predict_margin(row))
    }

    /// Class probabilities, one row per sample: column 0 is the negative
    /// class, column 1 the positive class.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features {
            return Err(AdmitError::Scoring(format!(
                "feature shape mismatch, expected: {}, got {}",
                self.n_features,
                x.ncols()
            )));
        }

        let positive: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| self.predict_row_proba(x.row(i)))
            .collect();

        Ok(Array2::from_shape_fn((positive.len(), 2), |(i, j)| {
            if j == 1 {
                positive[i]
            } else {
                1.0 - positive[i]
            }
        }))
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    /// Feature names recorded at training time; empty if the model was
    /// trained without them.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// XGBoost version that wrote the artifact, e.g. `2.0.3`
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
