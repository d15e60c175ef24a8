//! Crop classifier models
//!
//! Two artifact kinds are supported:
//! - `random_forest`: averaged tree class distributions, exposes probabilities
//! - `nearest_centroid`: closest class centroid, label only
//!
//! Callers discover the probability capability through
//! `Classifier::as_probabilistic()` instead of probing the model at runtime.

use super::tree::DecisionTree;
use super::{read_json, ModelError};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A trained classifier returning encoded class labels
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;

    /// Encoded class label for one sample
    fn predict(&self, x: &[f64]) -> Result<usize, ModelError>;

    /// Probability view of this model, when it has one
    fn as_probabilistic(&self) -> Option<&dyn ProbabilisticClassifier> {
        None
    }
}

/// A classifier that also produces per-class probabilities
pub trait ProbabilisticClassifier: Send + Sync {
    /// Encoded class label of each probability column
    fn classes(&self) -> &[usize];

    /// One probability per entry of `classes()`, summing to 1
    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError>;
}

fn check_len(x: &[f64], expected: usize) -> Result<(), ModelError> {
    if x.len() != expected {
        return Err(ModelError::FeatureCount { expected, got: x.len() });
    }
    Ok(())
}

/// Index of the first maximum (earlier columns win ties)
fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, v) in values.iter().enumerate() {
        match best {
            Some(b) if values[b] >= *v => {}
            _ if v.is_nan() => {}
            _ => best = Some(i),
        }
    }
    best
}

// ============================================================================
// Random forest
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestClassifier {
    pub n_features: usize,
    pub classes: Vec<usize>,
    pub trees: Vec<DecisionTree>,
}

impl ForestClassifier {
    fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Malformed("forest has no trees".to_string()));
        }
        if self.classes.is_empty() {
            return Err(ModelError::Malformed("forest has no classes".to_string()));
        }
        for tree in &self.trees {
            tree.validate(self.n_features, self.classes.len())?;
        }
        Ok(())
    }
}

impl Classifier for ForestClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, x: &[f64]) -> Result<usize, ModelError> {
        let proba = self.predict_proba(x)?;
        let col = argmax(&proba)
            .ok_or_else(|| ModelError::Malformed("no finite class probability".to_string()))?;
        Ok(self.classes[col])
    }

    fn as_probabilistic(&self) -> Option<&dyn ProbabilisticClassifier> {
        Some(self)
    }
}

impl ProbabilisticClassifier for ForestClassifier {
    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_len(x, self.n_features)?;

        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let counts = tree.leaf(x)?;
            let total: f64 = counts.iter().sum();
            if total <= 0.0 {
                continue;
            }
            for (p, c) in proba.iter_mut().zip(counts) {
                *p += c / total;
            }
        }

        let n_trees = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        Ok(proba)
    }
}

// ============================================================================
// Nearest centroid
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentroidClassifier {
    pub n_features: usize,
    pub classes: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
}

impl CentroidClassifier {
    fn validate(&self) -> Result<(), ModelError> {
        if self.centroids.is_empty() || self.centroids.len() != self.classes.len() {
            return Err(ModelError::Malformed(format!(
                "{} centroids for {} classes",
                self.centroids.len(),
                self.classes.len()
            )));
        }
        if let Some(bad) = self.centroids.iter().find(|c| c.len() != self.n_features) {
            return Err(ModelError::Malformed(format!(
                "centroid has {} coordinates, expected {}",
                bad.len(),
                self.n_features
            )));
        }
        Ok(())
    }
}

impl Classifier for CentroidClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, x: &[f64]) -> Result<usize, ModelError> {
        check_len(x, self.n_features)?;

        let neg_distances: Vec<f64> = self
            .centroids
            .iter()
            .map(|c| -c.iter().zip(x).map(|(a, b)| (a - b).powi(2)).sum::<f64>())
            .collect();

        let col = argmax(&neg_distances)
            .ok_or_else(|| ModelError::Malformed("no finite centroid distance".to_string()))?;
        Ok(self.classes[col])
    }
}

// ============================================================================
// Artifact
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    RandomForest(ForestClassifier),
    NearestCentroid(CentroidClassifier),
}

impl ClassifierArtifact {
    pub fn load(path: &Path) -> Result<Box<dyn Classifier>> {
        let artifact: ClassifierArtifact = read_json(path)?;
        Ok(artifact.into_model()?)
    }

    pub fn into_model(self) -> Result<Box<dyn Classifier>, ModelError> {
        match self {
            ClassifierArtifact::RandomForest(forest) => {
                forest.validate()?;
                Ok(Box::new(forest))
            }
            ClassifierArtifact::NearestCentroid(centroids) => {
                centroids.validate()?;
                Ok(Box::new(centroids))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn forest() -> Box<dyn Classifier> {
        let json = r#"{
            "kind": "random_forest",
            "n_features": 1,
            "classes": [0, 1],
            "trees": [
                {"nodes": [
                    {"feature": 0, "threshold": 0.5, "left": 1, "right": 2},
                    {"value": [3.0, 1.0]},
                    {"value": [0.0, 4.0]}
                ]},
                {"nodes": [{"value": [1.0, 1.0]}]}
            ]
        }"#;
        serde_json::from_str::<ClassifierArtifact>(json)
            .unwrap()
            .into_model()
            .unwrap()
    }

    #[test]
    fn test_forest_averages_normalised_leaves() {
        let model = forest();
        let proba = model.as_probabilistic().unwrap().predict_proba(&[0.0]).unwrap();
        assert_relative_eq!(proba[0], 0.625);
        assert_relative_eq!(proba[1], 0.375);
        assert_eq!(model.predict(&[0.0]).unwrap(), 0);
        assert_eq!(model.predict(&[1.0]).unwrap(), 1);
    }

    #[test]
    fn test_forest_rejects_wrong_feature_count() {
        let model = forest();
        assert!(matches!(
            model.predict(&[1.0, 2.0]),
            Err(ModelError::FeatureCount { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn test_centroid_has_no_probabilities() {
        let json = r#"{
            "kind": "nearest_centroid",
            "n_features": 2,
            "classes": [4, 7],
            "centroids": [[0.0, 0.0], [10.0, 10.0]]
        }"#;
        let model = serde_json::from_str::<ClassifierArtifact>(json)
            .unwrap()
            .into_model()
            .unwrap();
        assert!(model.as_probabilistic().is_none());
        assert_eq!(model.predict(&[1.0, 2.0]).unwrap(), 4);
        assert_eq!(model.predict(&[8.0, 9.0]).unwrap(), 7);
    }

    #[test]
    fn test_malformed_artifacts_fail_validation() {
        let json = r#"{"kind": "nearest_centroid", "n_features": 2, "classes": [0], "centroids": [[1.0]]}"#;
        let artifact: ClassifierArtifact = serde_json::from_str(json).unwrap();
        assert!(artifact.into_model().is_err());

        let json = r#"{"kind": "random_forest", "n_features": 1, "classes": [0, 1], "trees": []}"#;
        let artifact: ClassifierArtifact = serde_json::from_str(json).unwrap();
        assert!(artifact.into_model().is_err());
    }

    #[test]
    fn test_argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[f64::NAN, 0.1]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
