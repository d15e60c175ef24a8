//! Trained Model Artifacts
//!
//! Inference-only views of the models exported by the training environment:
//! - `tree`: flat-array decision trees shared by the forest models
//! - `classifier`: crop classifiers (`Classifier` / `ProbabilisticClassifier`)
//! - `regressor`: price regressors over named feature rows
//! - `label_decoder`: encoded class index → crop name
//!
//! Artifacts are JSON documents. Loading validates shape (feature counts,
//! node references, leaf widths) once so that prediction only fails on bad
//! input, never on a malformed model.

pub mod tree;
pub mod classifier;
pub mod regressor;
pub mod label_decoder;

pub use classifier::{Classifier, ClassifierArtifact, ProbabilisticClassifier};
pub use label_decoder::LabelDecoder;
pub use regressor::{FeatureRow, FeatureValue, Regressor, RegressorArtifact};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("expected {expected} features, got {got}")]
    FeatureCount { expected: usize, got: usize },
    #[error("missing feature '{0}'")]
    MissingFeature(String),
    #[error("feature '{name}' expects a {expected} value")]
    FeatureType { name: String, expected: &'static str },
    #[error("unknown class index {0}")]
    UnknownClass(usize),
    #[error("malformed model: {0}")]
    Malformed(String),
}

/// Read and deserialize a JSON artifact
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read model artifact: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse model artifact: {}", path.display()))
}
