use std::fmt;

use super::{argmax, Classifier, InferenceError, StandardScaler};
use crate::dataset::Dataset;
use crate::features::Label;

/// Scores for one label. Precision and recall are zero when nothing was
/// predicted as, or labeled as, this label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelScore {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Rows in the dataset carrying this label.
    pub support: usize,
}

/// Per-label precision and recall plus overall accuracy for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub scores: Vec<LabelScore>,
    pub total: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Classifies every row of `dataset`, with no magnitude gate, and tallies
/// the results per label. A winning class with no label counts as wrong.
pub fn classification_report(
    dataset: &Dataset,
    scaler: &StandardScaler,
    classifier: &dyn Classifier,
) -> Result<ClassificationReport, InferenceError> {
    let n = Label::ALL.len();
    let mut true_pos = vec![0; n];
    let mut predicted = vec![0; n];
    let mut support = vec![0; n];

    for row in dataset.rows() {
        let scaled = scaler.transform(row.features.values())?;
        let scores = classifier.predict_proba(&scaled)?;
        let class = argmax(&scores).ok_or(InferenceError::EmptyOutput)?;
        support[row.label.index()] += 1;
        if class < n {
            predicted[class] += 1;
            if class == row.label.index() {
                true_pos[class] += 1;
            }
        }
    }

    let scores = Label::ALL
        .iter()
        .map(|&label| {
            let i = label.index();
            let precision = ratio(true_pos[i], predicted[i]);
            let recall = ratio(true_pos[i], support[i]);
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            LabelScore {
                label,
                precision,
                recall,
                f1,
                support: support[i],
            }
        })
        .collect();

    Ok(ClassificationReport {
        accuracy: ratio(true_pos.iter().sum(), dataset.len()),
        scores,
        total: dataset.len(),
    })
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>10} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for s in &self.scores {
            writeln!(
                f,
                "{:>10} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                s.label.to_string(),
                s.precision,
                s.recall,
                s.f1,
                s.support
            )?;
        }
        write!(
            f,
            "{:>10} {:>29.2} {:>9}",
            "accuracy", self.accuracy, self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureRow, FeatureVector, FEATURE_WIDTH};

    /// Votes for the class whose index is stored in the first input.
    struct Echo;

    impl Classifier for Echo {
        fn predict_proba(&self, input: &[f64]) -> Result<Vec<f64>, InferenceError> {
            let mut scores = vec![0.0; 5];
            scores[input[0] as usize] = 1.0;
            Ok(scores)
        }
    }

    fn row(predict: usize, label: Label) -> FeatureRow {
        let mut v = [0.0; FEATURE_WIDTH];
        v[0] = predict as f64;
        FeatureRow::new(FeatureVector::new(v), label)
    }

    fn identity() -> StandardScaler {
        StandardScaler::new(vec![0.0; FEATURE_WIDTH], vec![1.0; FEATURE_WIDTH]).unwrap()
    }

    #[test]
    fn precision_and_recall_per_label() {
        let dataset: Dataset = vec![
            row(1, Label::Top),
            row(1, Label::Top),
            row(2, Label::Top),
            row(2, Label::Left),
            row(1, Label::Right),
            row(4, Label::Right),
        ]
        .into_iter()
        .collect();
        let report = classification_report(&dataset, &identity(), &Echo).unwrap();

        assert_eq!(report.accuracy, 0.5);
        assert_eq!(report.total, 6);
        let top = report.scores[Label::Top.index()];
        assert_eq!((top.precision, top.support), (2.0 / 3.0, 3));
        assert_eq!(top.recall, 2.0 / 3.0);
        let left = report.scores[Label::Left.index()];
        assert_eq!((left.precision, left.recall), (0.5, 1.0));
        let right = report.scores[Label::Right.index()];
        assert_eq!((right.precision, right.recall, right.f1), (0.0, 0.0, 0.0));
        let none = report.scores[Label::NoPress.index()];
        assert_eq!(none.support, 0);

        let text = report.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("No press"));
        assert!(text.contains("accuracy"));
    }

    #[test]
    fn empty_dataset_reports_zeros() {
        let report = classification_report(&Dataset::new(), &identity(), &Echo).unwrap();
        assert_eq!(report.accuracy, 0.0);
        assert!(report.scores.iter().all(|s| s.support == 0));
    }
}
