//! Everything needed to turn a baselined reading into a press location:
//! the persisted [`StandardScaler`], a [`Classifier`], and the gated
//! [`InferenceOverlay`] that the live monitor runs every tick.
//!
//! Model artifacts are stored as [ron] so they can be produced by whatever
//! trained them and inspected by hand. Two model families are understood,
//! see [`ModelKind`].

mod classifier;
mod forest;
mod metrics;
mod overlay;
mod scaler;

pub use classifier::{accuracy, argmax, Activation, Classifier, DenseLayer, DenseNetwork};
pub use forest::{DecisionTree, Node, RandomForest};
pub use metrics::{classification_report, ClassificationReport, LabelScore};
pub use overlay::{InferenceOverlay, DEFAULT_GATE_THRESHOLD};
pub use scaler::StandardScaler;

use std::{borrow::Cow, fmt, fs, io, path::Path};

use serde::{de::DeserializeOwned, Serialize};

/// Failures while loading or saving a model artifact.
#[derive(Debug)]
pub enum ArtifactError {
    /// Returned when io fails when reading or writing files.
    IoError(io::Error),
    /// Returned when serialization fails.
    RonError(ron::Error),
    /// Returned when deserialization fails.
    RonSpannedError(ron::de::SpannedError),
    /// The artifact parsed but its dimensions do not line up.
    Shape(String),
}

impl fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ArtifactError as AE;
        let msg = match self {
            AE::IoError(error) => Cow::from(format!("io error: {}", error)),
            AE::RonError(error) => Cow::from(format!("ron error: {}", error)),
            AE::RonSpannedError(error) => Cow::from(format!("ron spanning error: {}", error)),
            AE::Shape(msg) => Cow::from(format!("malformed artifact: {}", msg)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for ArtifactError {}

/// Failures while classifying a single vector.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// The input does not have as many values as the model expects.
    InputWidth { expected: usize, actual: usize },
    /// The model produced no scores at all.
    EmptyOutput,
    /// The winning class index is not a known label.
    UnknownClass(usize),
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceError::InputWidth { expected, actual } => {
                write!(f, "expected {} inputs, got {}", expected, actual)
            }
            InferenceError::EmptyOutput => write!(f, "classifier produced no output"),
            InferenceError::UnknownClass(i) => write!(f, "class index {} has no label", i),
        }
    }
}

impl std::error::Error for InferenceError {}

/// Which kind of classifier a model file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ModelKind {
    /// A [`DenseNetwork`].
    #[default]
    Network,
    /// A [`RandomForest`].
    Forest,
}

/// Loads the model at `path` as the given kind.
pub fn load_classifier(
    kind: ModelKind,
    path: impl AsRef<Path>,
) -> Result<Box<dyn Classifier>, ArtifactError> {
    Ok(match kind {
        ModelKind::Network => Box::new(DenseNetwork::from_path(path)?),
        ModelKind::Forest => Box::new(RandomForest::from_path(path)?),
    })
}

pub(crate) fn save_ron<T: Serialize>(value: &T, path: &Path) -> Result<(), ArtifactError> {
    let text = ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
        .map_err(ArtifactError::RonError)?;
    fs::write(path, text).map_err(ArtifactError::IoError)
}

pub(crate) fn load_ron<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let text = fs::read_to_string(path).map_err(ArtifactError::IoError)?;
    ron::from_str(&text).map_err(ArtifactError::RonSpannedError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_WIDTH;
    use tempfile::NamedTempFile;

    #[test]
    fn model_kind_picks_the_loader() {
        let forest = RandomForest::new(
            FEATURE_WIDTH,
            4,
            vec![DecisionTree {
                nodes: vec![Node::Leaf {
                    distribution: vec![0.0, 0.0, 1.0, 0.0],
                }],
            }],
        )
        .unwrap();
        let file = NamedTempFile::new().unwrap();
        forest.to_path(file.path()).unwrap();

        let loaded = load_classifier(ModelKind::Forest, file.path()).unwrap();
        let scores = loaded.predict_proba(&[0.0; FEATURE_WIDTH]).unwrap();
        assert_eq!(argmax(&scores), Some(2));

        // The same file is not a network.
        assert!(matches!(
            load_classifier(ModelKind::Network, file.path()),
            Err(ArtifactError::RonSpannedError(_))
        ));
    }
}
