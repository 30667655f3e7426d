//! Gradient-boosted decision tree classifier
//!
//! Deserializes a trained binary classifier from a JSON artifact and
//! evaluates it on ordered feature vectors. Trees are stored as
//! index-linked node arrays; the ensemble margin is squashed through a
//! sigmoid so the output is always a probability in [0, 1].

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// One node of a decision tree.
///
/// Interior nodes carry a feature index, a split threshold, and child
/// indices; leaves carry `value` and no children.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeNode {
    #[serde(default)]
    pub feature: usize,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub left: Option<usize>,
    #[serde(default)]
    pub right: Option<usize>,
    #[serde(default)]
    pub value: Option<f64>,
}

impl TreeNode {
    fn is_leaf(&self) -> bool {
        self.value.is_some() && self.left.is_none() && self.right.is_none()
    }
}

/// One decision tree as an index-linked node array, rooted at node 0
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

/// Trained binary classifier over named features.
///
/// The artifact declares its required feature names in evaluation order;
/// callers must supply vectors in exactly that order. The schema contract
/// against the feature aggregator is validated once at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradientBoostedModel {
    pub feature_names: Vec<String>,
    pub trees: Vec<DecisionTree>,
    pub learning_rate: f64,
    #[serde(default)]
    pub base_score: f64,
}

impl GradientBoostedModel {
    /// Load and validate a model artifact from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::MissingCollaborator(format!("model {}: {}", path.display(), e))
        })?;
        let model: Self = serde_json::from_str(&content)?;
        model.validate()?;
        Ok(model)
    }

    /// Structural validation: non-empty schema and trees, in-range feature
    /// and child indices, children strictly forward-linked (termination
    /// guarantee), interior nodes fully split, leaves valued.
    pub fn validate(&self) -> Result<()> {
        if self.feature_names.is_empty() {
            return Err(Error::SchemaMismatch(
                "model declares no feature names".to_string(),
            ));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(Error::Computation(format!("tree {} has no nodes", t)));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                if node.is_leaf() {
                    continue;
                }
                if node.feature >= self.feature_names.len() {
                    return Err(Error::Computation(format!(
                        "tree {} node {} references feature {} outside the schema",
                        t, i, node.feature
                    )));
                }
                let (left, right) = match (node.left, node.right) {
                    (Some(l), Some(r)) => (l, r),
                    _ => {
                        return Err(Error::Computation(format!(
                            "tree {} node {} is neither a leaf nor a full split",
                            t, i
                        )));
                    }
                };
                for child in [left, right] {
                    if child >= tree.nodes.len() || child <= i {
                        return Err(Error::Computation(format!(
                            "tree {} node {} has invalid child reference {}",
                            t, i, child
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Evaluate the classifier on one ordered feature vector, returning the
    /// positive-class probability in [0, 1].
    pub fn predict_probability(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.feature_names.len() {
            return Err(Error::SchemaMismatch(format!(
                "expected {} features, got {}",
                self.feature_names.len(),
                features.len()
            )));
        }

        let mut margin = self.base_score;
        for tree in &self.trees {
            margin += self.learning_rate * self.tree_output(tree, features)?;
        }
        Ok(sigmoid(margin))
    }

    fn tree_output(&self, tree: &DecisionTree, features: &[f64]) -> Result<f64> {
        let mut index = 0usize;
        loop {
            let node = tree
                .nodes
                .get(index)
                .ok_or_else(|| Error::Computation(format!("node index {} out of range", index)))?;
            if let Some(value) = node.value {
                if node.left.is_none() && node.right.is_none() {
                    return Ok(value);
                }
            }
            let next = if features[node.feature] <= node.threshold {
                node.left
            } else {
                node.right
            };
            index = next
                .ok_or_else(|| Error::Computation(format!("node {} has no matching child", index)))?;
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
