use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{load_ron, save_ron, ArtifactError, InferenceError, StandardScaler};
use crate::dataset::Dataset;

/// Anything that scores a normalized feature vector, one score per class.
/// Class `i` is [`Label::from_index(i)`](crate::features::Label::from_index).
pub trait Classifier {
    fn predict_proba(&self, input: &[f64]) -> Result<Vec<f64>, InferenceError>;
}

/// Index of the highest score. Ties go to the lowest index.
pub fn argmax(scores: &[f64]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((i, s)),
        })
        .map(|(i, _)| i)
}

/// Fraction of rows in `dataset` whose arg-max class matches their label,
/// with no magnitude gate in front of the classifier.
pub fn accuracy(
    dataset: &Dataset,
    scaler: &StandardScaler,
    classifier: &dyn Classifier,
) -> Result<f64, InferenceError> {
    if dataset.is_empty() {
        return Ok(0.0);
    }
    let mut correct = 0;
    for row in dataset.rows() {
        let scaled = scaler.transform(row.features.values())?;
        let scores = classifier.predict_proba(&scaled)?;
        if argmax(&scores).ok_or(InferenceError::EmptyOutput)? == row.label.index() {
            correct += 1;
        }
    }
    Ok(correct as f64 / dataset.len() as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Linear,
    Relu,
    Tanh,
    Softmax,
}

impl Activation {
    fn apply(self, values: &mut [f64]) {
        match self {
            Activation::Linear => {}
            Activation::Relu => values.iter_mut().for_each(|v| *v = v.max(0.0)),
            Activation::Tanh => values.iter_mut().for_each(|v| *v = v.tanh()),
            Activation::Softmax => {
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                values.iter_mut().for_each(|v| *v = (*v - max).exp());
                let sum: f64 = values.iter().sum();
                values.iter_mut().for_each(|v| *v /= sum);
            }
        }
    }
}

/// A fully connected layer. `weights[o][i]` connects input `i` to output `o`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

impl DenseLayer {
    fn inputs(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut out: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect();
        self.activation.apply(&mut out);
        out
    }
}

/// A stack of [`DenseLayer`]s, the shape of the press-location networks
/// (15 inputs, a couple of hidden layers, 4 softmax outputs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseNetwork {
    layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self, ArtifactError> {
        let network = Self { layers };
        network.validate()?;
        Ok(network)
    }

    pub fn input_width(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::inputs)
    }

    pub fn output_width(&self) -> usize {
        self.layers.last().map_or(0, |l| l.bias.len())
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        if self.layers.is_empty() {
            return Err(ArtifactError::Shape("network has no layers".into()));
        }
        let mut expected = self.input_width();
        for (n, layer) in self.layers.iter().enumerate() {
            if layer.weights.is_empty() || layer.weights.len() != layer.bias.len() {
                return Err(ArtifactError::Shape(format!(
                    "layer {}: {} weight rows for {} biases",
                    n,
                    layer.weights.len(),
                    layer.bias.len()
                )));
            }
            if let Some(row) = layer.weights.iter().find(|r| r.len() != expected) {
                return Err(ArtifactError::Shape(format!(
                    "layer {}: expected {} inputs, found a row of {}",
                    n,
                    expected,
                    row.len()
                )));
            }
            expected = layer.bias.len();
        }
        Ok(())
    }

    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        save_ron(self, path.as_ref())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let network: Self = load_ron(path.as_ref())?;
        network.validate()?;
        Ok(network)
    }
}

impl Classifier for DenseNetwork {
    fn predict_proba(&self, input: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if input.len() != self.input_width() {
            return Err(InferenceError::InputWidth {
                expected: self.input_width(),
                actual: input.len(),
            });
        }
        Ok(self
            .layers
            .iter()
            .fold(input.to_vec(), |x, layer| layer.forward(&x)))
    }
}
