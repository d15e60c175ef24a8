//! Decision trees stored as flat node arrays
//!
//! Node 0 is the root. A split sends `x[feature] <= threshold` to `left`,
//! everything else (including NaN) to `right`. Leaves carry a value vector:
//! class counts for classifiers, a single prediction for regressors.

use super::ModelError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Check node references, feature indices and leaf widths
    ///
    /// Children must point strictly forward, which rules out cycles.
    pub fn validate(&self, n_features: usize, leaf_width: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::Malformed("tree has no nodes".to_string()));
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split { feature, left, right, .. } => {
                    if *feature >= n_features {
                        return Err(ModelError::Malformed(format!(
                            "node {} splits on feature {} (model has {})",
                            idx, feature, n_features
                        )));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(ModelError::Malformed(format!(
                                "node {} has invalid child {}",
                                idx, child
                            )));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != leaf_width {
                        return Err(ModelError::Malformed(format!(
                            "leaf {} has {} values, expected {}",
                            idx,
                            value.len(),
                            leaf_width
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Walk from the root to the leaf selected by `x`
    pub fn leaf(&self, x: &[f64]) -> Result<&[f64], ModelError> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(value),
                Some(TreeNode::Split { feature, threshold, left, right }) => {
                    let v = x.get(*feature).copied().ok_or(ModelError::FeatureCount {
                        expected: feature + 1,
                        got: x.len(),
                    })?;
                    let next = if v <= *threshold { *left } else { *right };
                    if next <= idx {
                        return Err(ModelError::Malformed(format!("node {} loops back", idx)));
                    }
                    idx = next;
                }
                None => {
                    return Err(ModelError::Malformed(format!("node {} out of range", idx)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> DecisionTree {
        serde_json::from_str(
            r#"{"nodes": [
                {"feature": 0, "threshold": 5.0, "left": 1, "right": 2},
                {"value": [1.0]},
                {"value": [2.0]}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_split_direction() {
        let tree = stump();
        assert_eq!(tree.leaf(&[5.0]).unwrap(), &[1.0]);
        assert_eq!(tree.leaf(&[5.1]).unwrap(), &[2.0]);
        assert_eq!(tree.leaf(&[f64::NAN]).unwrap(), &[2.0]);
    }

    #[test]
    fn test_validate_rejects_bad_trees() {
        let tree = stump();
        assert!(tree.validate(1, 1).is_ok());
        assert!(tree.validate(0, 1).is_err());
        assert!(tree.validate(1, 2).is_err());

        let backwards = DecisionTree {
            nodes: vec![
                TreeNode::Split { feature: 0, threshold: 0.0, left: 0, right: 1 },
                TreeNode::Leaf { value: vec![0.0] },
            ],
        };
        assert!(backwards.validate(1, 1).is_err());
        assert!(DecisionTree { nodes: vec![] }.validate(1, 1).is_err());
    }

    #[test]
    fn test_short_input() {
        let tree = stump();
        assert!(matches!(tree.leaf(&[]), Err(ModelError::FeatureCount { .. })));
    }
}
