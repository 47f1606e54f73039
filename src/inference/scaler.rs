use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{load_ron, save_ron, ArtifactError, InferenceError};
use crate::dataset::Dataset;
use crate::features::FEATURE_WIDTH;
use crate::TransposableIter;

/// Centers every column on its training mean and divides by its training
/// standard deviation. Columns that never varied keep a scale of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ArtifactError> {
        let scaler = Self { mean, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Learns the per-column mean and population standard deviation of the
    /// features in `dataset`. Returns `None` for an empty dataset.
    pub fn fit(dataset: &Dataset) -> Option<Self> {
        if dataset.is_empty() {
            return None;
        }
        let n = dataset.len() as f64;
        let (mean, scale) = dataset
            .rows()
            .iter()
            .map(|r| r.features.values())
            .transpose()
            .map(|column| {
                let mean = column.iter().copied().sum::<f64>() / n;
                let var = column.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                (mean, if std == 0.0 { 1.0 } else { std })
            })
            .unzip();
        Some(Self { mean, scale })
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if values.len() != self.width() {
            return Err(InferenceError::InputWidth {
                expected: self.width(),
                actual: values.len(),
            });
        }
        Ok(values
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        if self.mean.len() != self.scale.len() {
            return Err(ArtifactError::Shape(format!(
                "{} means but {} scales",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.width() != FEATURE_WIDTH {
            return Err(ArtifactError::Shape(format!(
                "scaler covers {} columns, readings have {}",
                self.width(),
                FEATURE_WIDTH
            )));
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(ArtifactError::Shape("scale must be finite and non-zero".into()));
        }
        Ok(())
    }

    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        save_ron(self, path.as_ref())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let scaler: Self = load_ron(path.as_ref())?;
        scaler.validate()?;
        Ok(scaler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureRow, FeatureVector, Label};
    use tempfile::NamedTempFile;

    fn dataset(rows: &[[f64; FEATURE_WIDTH]]) -> Dataset {
        rows.iter()
            .map(|&v| FeatureRow::new(FeatureVector::new(v), Label::NoPress))
            .collect()
    }

    #[test]
    fn fit_uses_population_statistics() {
        let mut a = [5.0; FEATURE_WIDTH];
        let mut b = [5.0; FEATURE_WIDTH];
        a[0] = 2.0;
        b[0] = 6.0;
        let scaler = StandardScaler::fit(&dataset(&[a, b])).unwrap();

        assert_eq!(scaler.mean[0], 4.0);
        assert_eq!(scaler.scale[0], 2.0);
        // A column that never moves keeps unit scale.
        assert_eq!(scaler.mean[1], 5.0);
        assert_eq!(scaler.scale[1], 1.0);

        let t = scaler.transform(&a).unwrap();
        assert_eq!(t[0], -1.0);
        assert_eq!(t[1], 0.0);
    }

    #[test]
    fn empty_dataset_cannot_be_fit() {
        assert!(StandardScaler::fit(&Dataset::new()).is_none());
    }

    #[test]
    fn transform_checks_width() {
        let scaler =
            StandardScaler::new(vec![0.0; FEATURE_WIDTH], vec![1.0; FEATURE_WIDTH]).unwrap();
        assert_eq!(
            scaler.transform(&[1.0, 2.0]),
            Err(InferenceError::InputWidth {
                expected: FEATURE_WIDTH,
                actual: 2
            })
        );
    }

    #[test]
    fn malformed_scalers_are_rejected() {
        assert!(StandardScaler::new(vec![0.0; 3], vec![1.0; 3]).is_err());
        assert!(StandardScaler::new(vec![0.0; FEATURE_WIDTH], vec![1.0; 14]).is_err());
        assert!(StandardScaler::new(vec![0.0; FEATURE_WIDTH], vec![0.0; FEATURE_WIDTH]).is_err());
    }

    #[test]
    fn scaler_survives_a_round_trip() {
        let scaler = StandardScaler::new(
            (0..FEATURE_WIDTH).map(|i| i as f64 * 1.5).collect(),
            (0..FEATURE_WIDTH).map(|i| i as f64 + 0.25).collect(),
        )
        .unwrap();
        let file = NamedTempFile::new().unwrap();
        scaler.to_path(file.path()).unwrap();
        assert_eq!(StandardScaler::from_path(file.path()).unwrap(), scaler);
    }
}
