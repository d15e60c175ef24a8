//! Price regression models
//!
//! Regressors consume a `FeatureRow` of named values rather than a bare
//! vector so that categorical inputs (crop, district) can be encoded the same
//! way the training pipeline did. The artifact's `features` list fixes both
//! the column order and the category vocabulary.

use super::tree::DecisionTree;
use super::{read_json, ModelError};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
}

/// Named feature values for a single prediction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    values: Vec<(String, FeatureValue)>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn number(mut self, name: &str, value: f64) -> Self {
        self.values.push((name.to_string(), FeatureValue::Number(value)));
        self
    }

    pub fn category(mut self, name: &str, value: &str) -> Self {
        self.values.push((name.to_string(), FeatureValue::Category(value.to_string())));
        self
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One input column of a regressor
///
/// A spec with `categories` is categorical; otherwise numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

impl FeatureSpec {
    fn lookup<'r>(&self, row: &'r FeatureRow) -> Result<&'r FeatureValue, ModelError> {
        row.get(&self.name)
            .ok_or_else(|| ModelError::MissingFeature(self.name.clone()))
    }

    fn number(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        match self.lookup(row)? {
            FeatureValue::Number(v) => Ok(*v),
            FeatureValue::Category(_) => Err(ModelError::FeatureType {
                name: self.name.clone(),
                expected: "numeric",
            }),
        }
    }

    /// Position of the row's category, `None` when unseen in training
    fn category_index(&self, categories: &[String], row: &FeatureRow) -> Result<Option<usize>, ModelError> {
        match self.lookup(row)? {
            FeatureValue::Category(c) => Ok(categories.iter().position(|k| k == c)),
            FeatureValue::Number(_) => Err(ModelError::FeatureType {
                name: self.name.clone(),
                expected: "categorical",
            }),
        }
    }

    /// Single-column encoding (unknown categories → -1)
    fn ordinal(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        match &self.categories {
            None => self.number(row),
            Some(categories) => Ok(self
                .category_index(categories, row)?
                .map(|i| i as f64)
                .unwrap_or(-1.0)),
        }
    }

    /// Number of columns this feature expands to under one-hot encoding
    fn one_hot_width(&self) -> usize {
        self.categories.as_ref().map(|c| c.len()).unwrap_or(1)
    }

    /// One-hot encoding (unknown categories → all zeros)
    fn one_hot(&self, row: &FeatureRow, out: &mut Vec<f64>) -> Result<(), ModelError> {
        match &self.categories {
            None => out.push(self.number(row)?),
            Some(categories) => {
                let hit = self.category_index(categories, row)?;
                out.extend((0..categories.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
            }
        }
        Ok(())
    }
}

/// A trained regression model
pub trait Regressor: Send + Sync {
    fn features(&self) -> &[FeatureSpec];

    fn predict(&self, row: &FeatureRow) -> Result<f64, ModelError>;
}

// ============================================================================
// Random forest
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestRegressor {
    pub features: Vec<FeatureSpec>,
    pub trees: Vec<DecisionTree>,
}

impl ForestRegressor {
    fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Malformed("forest has no trees".to_string()));
        }
        for tree in &self.trees {
            tree.validate(self.features.len(), 1)?;
        }
        Ok(())
    }

    fn encode(&self, row: &FeatureRow) -> Result<Vec<f64>, ModelError> {
        self.features.iter().map(|f| f.ordinal(row)).collect()
    }
}

impl Regressor for ForestRegressor {
    fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    fn predict(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        let x = self.encode(row)?;
        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.leaf(&x)?[0];
        }
        Ok(total / self.trees.len() as f64)
    }
}

// ============================================================================
// Linear
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub features: Vec<FeatureSpec>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearRegressor {
    fn validate(&self) -> Result<(), ModelError> {
        let width: usize = self.features.iter().map(FeatureSpec::one_hot_width).sum();
        if width != self.coefficients.len() {
            return Err(ModelError::Malformed(format!(
                "{} coefficients for {} encoded columns",
                self.coefficients.len(),
                width
            )));
        }
        Ok(())
    }
}

impl Regressor for LinearRegressor {
    fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    fn predict(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        let mut x = Vec::with_capacity(self.coefficients.len());
        for feature in &self.features {
            feature.one_hot(row, &mut x)?;
        }
        Ok(self.intercept + x.iter().zip(&self.coefficients).map(|(a, b)| a * b).sum::<f64>())
    }
}

// ============================================================================
// Artifact
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressorArtifact {
    RandomForest(ForestRegressor),
    Linear(LinearRegressor),
}

impl RegressorArtifact {
    pub fn load(path: &Path) -> Result<Box<dyn Regressor>> {
        let artifact: RegressorArtifact = read_json(path)?;
        Ok(artifact.into_model()?)
    }

    pub fn into_model(self) -> Result<Box<dyn Regressor>, ModelError> {
        match self {
            RegressorArtifact::RandomForest(forest) => {
                forest.validate()?;
                Ok(Box::new(forest))
            }
            RegressorArtifact::Linear(linear) => {
                linear.validate()?;
                Ok(Box::new(linear))
            }
        }
    }
}
