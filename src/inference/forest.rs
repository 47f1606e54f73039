use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{load_ron, save_ron, ArtifactError, Classifier, InferenceError};

/// One node of a [`DecisionTree`]. Children are indices into the tree's
/// node list and always point further down the list, so every walk ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Go `left` when `input[feature] <= threshold`, `right` otherwise.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class sample counts (or weights) that reached this leaf.
    Leaf { distribution: Vec<f64> },
}

/// A binary threshold tree. The root is `nodes[0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    fn leaf_for(&self, input: &[f64]) -> &[f64] {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => at = if input[*feature] <= *threshold { *left } else { *right },
                Node::Leaf { distribution } => return distribution,
            }
        }
    }

    fn validate(&self, n: usize, features: usize, classes: usize) -> Result<(), ArtifactError> {
        if self.nodes.is_empty() {
            return Err(ArtifactError::Shape(format!("tree {} has no nodes", n)));
        }
        for (at, node) in self.nodes.iter().enumerate() {
            let bad = match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    *feature >= features
                        || !threshold.is_finite()
                        || [left, right]
                            .iter()
                            .any(|&&child| child <= at || child >= self.nodes.len())
                }
                Node::Leaf { distribution } => {
                    distribution.len() != classes
                        || distribution.iter().any(|w| !w.is_finite() || *w < 0.0)
                        || distribution.iter().sum::<f64>() <= 0.0
                }
            };
            if bad {
                return Err(ArtifactError::Shape(format!(
                    "tree {}, node {}: {:?}",
                    n, at, node
                )));
            }
        }
        Ok(())
    }
}

/// An ensemble of [`DecisionTree`]s. Each tree's leaf is normalized to a
/// probability distribution and the forest reports their mean, so ties and
/// vote counts behave like a soft-voting random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(
        n_features: usize,
        n_classes: usize,
        trees: Vec<DecisionTree>,
    ) -> Result<Self, ArtifactError> {
        let forest = Self {
            n_features,
            n_classes,
            trees,
        };
        forest.validate()?;
        Ok(forest)
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        if self.trees.is_empty() {
            return Err(ArtifactError::Shape("forest has no trees".into()));
        }
        if self.n_classes == 0 {
            return Err(ArtifactError::Shape("forest has no classes".into()));
        }
        self.trees
            .iter()
            .enumerate()
            .try_for_each(|(n, tree)| tree.validate(n, self.n_features, self.n_classes))
    }

    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        save_ron(self, path.as_ref())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let forest: Self = load_ron(path.as_ref())?;
        forest.validate()?;
        Ok(forest)
    }
}

impl Classifier for RandomForest {
    fn predict_proba(&self, input: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if input.len() != self.n_features {
            return Err(InferenceError::InputWidth {
                expected: self.n_features,
                actual: input.len(),
            });
        }
        let mut scores = vec![0.0; self.n_classes];
        for tree in &self.trees {
            let leaf = tree.leaf_for(input);
            let total: f64 = leaf.iter().sum();
            scores.iter_mut().zip(leaf).for_each(|(s, w)| *s += w / total);
        }
        let n = self.trees.len() as f64;
        scores.iter_mut().for_each(|s| *s /= n);
        Ok(scores)
    }
}
