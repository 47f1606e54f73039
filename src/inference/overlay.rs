use log::debug;

use super::{argmax, ArtifactError, Classifier, InferenceError, StandardScaler};
use crate::features::{FeatureVector, Label};

/// Readings whose largest channel stays under this many sensor units are
/// treated as untouched.
pub const DEFAULT_GATE_THRESHOLD: f64 = 150.0;

/// Per-tick press classification with a cheap magnitude gate in front of
/// the model. Holds no state between calls, so predictions near the gate
/// can flicker from one tick to the next.
pub struct InferenceOverlay {
    scaler: StandardScaler,
    classifier: Box<dyn Classifier>,
    threshold: f64,
}

impl InferenceOverlay {
    pub fn new(
        scaler: StandardScaler,
        classifier: Box<dyn Classifier>,
        threshold: f64,
    ) -> Result<Self, ArtifactError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ArtifactError::Shape(format!(
                "gate threshold {} is not a non-negative number",
                threshold
            )));
        }
        Ok(Self {
            scaler,
            classifier,
            threshold,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Below the gate this is always [`Label::NoPress`] and the classifier
    /// is not consulted.
    pub fn classify(&self, features: &FeatureVector) -> Result<Label, InferenceError> {
        if features.max_abs() < self.threshold {
            return Ok(Label::NoPress);
        }
        let scaled = self.scaler.transform(features.values())?;
        let scores = self.classifier.predict_proba(&scaled)?;
        let class = argmax(&scores).ok_or(InferenceError::EmptyOutput)?;
        let label = Label::from_index(class).ok_or(InferenceError::UnknownClass(class))?;
        debug!("Classified {:?} from scores {:?}", label, scores);
        Ok(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_WIDTH;
    use std::{cell::Cell, rc::Rc};

    /// Always votes for one class and counts how often it was asked.
    struct Fixed {
        scores: Vec<f64>,
        calls: Rc<Cell<usize>>,
    }

    impl Classifier for Fixed {
        fn predict_proba(&self, _input: &[f64]) -> Result<Vec<f64>, InferenceError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.scores.clone())
        }
    }

    fn gated(scores: Vec<f64>) -> (InferenceOverlay, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let scaler =
            StandardScaler::new(vec![0.0; FEATURE_WIDTH], vec![1.0; FEATURE_WIDTH]).unwrap();
        let classifier = Fixed {
            scores,
            calls: calls.clone(),
        };
        let overlay =
            InferenceOverlay::new(scaler, Box::new(classifier), DEFAULT_GATE_THRESHOLD).unwrap();
        (overlay, calls)
    }

    fn peak(value: f64) -> FeatureVector {
        let mut v = [3.0; FEATURE_WIDTH];
        v[7] = value;
        FeatureVector::new(v)
    }

    #[test]
    fn below_the_gate_skips_the_model() {
        let (overlay, calls) = gated(vec![0.0, 0.0, 1.0, 0.0]);
        assert_eq!(overlay.classify(&peak(149.0)), Ok(Label::NoPress));
        assert_eq!(overlay.classify(&peak(-149.0)), Ok(Label::NoPress));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn at_the_gate_runs_the_model() {
        let (overlay, calls) = gated(vec![0.0, 0.0, 1.0, 0.0]);
        assert_eq!(overlay.classify(&peak(150.0)), Ok(Label::Left));
        assert_eq!(overlay.classify(&peak(-900.0)), Ok(Label::Left));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn model_can_still_say_no_press() {
        let (overlay, _) = gated(vec![0.9, 0.05, 0.03, 0.02]);
        assert_eq!(overlay.classify(&peak(500.0)), Ok(Label::NoPress));
    }

    #[test]
    fn out_of_range_classes_are_errors() {
        let (overlay, _) = gated(vec![0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(
            overlay.classify(&peak(500.0)),
            Err(InferenceError::UnknownClass(4))
        );
        let (overlay, _) = gated(vec![]);
        assert_eq!(overlay.classify(&peak(500.0)), Err(InferenceError::EmptyOutput));
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let scaler =
            StandardScaler::new(vec![0.0; FEATURE_WIDTH], vec![1.0; FEATURE_WIDTH]).unwrap();
        let classifier = Fixed {
            scores: vec![],
            calls: Rc::new(Cell::new(0)),
        };
        assert!(InferenceOverlay::new(scaler, Box::new(classifier), -1.0).is_err());
    }
}
