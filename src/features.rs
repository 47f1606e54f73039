//! Fixed-shape views of a reading as it moves through the pipeline: raw,
//! baselined, and reduced to the 15 magnetic channels used for training.
//!
//! A raw reading is 5 groups of `(T, Bx, By, Bz)`, one per magnetometer. The
//! feature layout is group-major, every `Bx` first, then every `By`, then
//! every `Bz`:
//!
//! ```text
//! raw:      T0 Bx0 By0 Bz0 | T1 Bx1 By1 Bz1 | ... | T4 Bx4 By4 Bz4
//! features: Bx0..Bx4 | By0..By4 | Bz0..Bz4
//! ```
//!
//! Trained models consume columns by position, so this order never changes.

use std::{fmt, str::FromStr};

use crate::{NUM_MAGS, RAW_WIDTH, VALUES_PER_MAG};

/// Number of magnetic channels kept per reading.
pub const FEATURE_WIDTH: usize = NUM_MAGS * 3;

/// Axis names in the order they appear inside each raw group, after `T`.
pub const AXES: [&str; 3] = ["Bx", "By", "Bz"];

/// A reading that has exactly [`RAW_WIDTH`] values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample([f64; RAW_WIDTH]);

/// The error returned when a reading has the wrong number of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthMismatch {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for WidthMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {} values, got {}", self.expected, self.actual)
    }
}

impl std::error::Error for WidthMismatch {}

impl TryFrom<&[f64]> for RawSample {
    type Error = WidthMismatch;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        <[f64; RAW_WIDTH]>::try_from(values)
            .map(RawSample)
            .map_err(|_| WidthMismatch {
                expected: RAW_WIDTH,
                actual: values.len(),
            })
    }
}

impl RawSample {
    pub fn new(values: [f64; RAW_WIDTH]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64; RAW_WIDTH] {
        &self.0
    }

    /// Subtracts the per-channel baseline from every value.
    pub fn adjust(&self, baseline: &BaselineVector) -> AdjustedSample {
        let mut out = self.0;
        out.iter_mut()
            .zip(baseline.values())
            .for_each(|(v, b)| *v -= b);
        AdjustedSample(out)
    }
}

/// Per-channel resting values, computed once at startup and never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineVector([f64; RAW_WIDTH]);

impl BaselineVector {
    pub fn new(values: [f64; RAW_WIDTH]) -> Self {
        Self(values)
    }

    pub fn zero() -> Self {
        Self([0.0; RAW_WIDTH])
    }

    pub fn values(&self) -> &[f64; RAW_WIDTH] {
        &self.0
    }
}

/// A raw reading with the baseline taken out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedSample([f64; RAW_WIDTH]);

impl AdjustedSample {
    pub fn values(&self) -> &[f64; RAW_WIDTH] {
        &self.0
    }

    fn axis(&self, mag: usize, axis: usize) -> f64 {
        self.0[mag * VALUES_PER_MAG + 1 + axis]
    }

    /// The 15 magnetic channels in group-major order.
    pub fn features(&self) -> FeatureVector {
        let mut out = [0.0; FEATURE_WIDTH];
        for axis in 0..AXES.len() {
            for mag in 0..NUM_MAGS {
                out[axis * NUM_MAGS + mag] = self.axis(mag, axis);
            }
        }
        FeatureVector(out)
    }

    /// The 15 magnetic channels sensor by sensor, `Bx0 By0 Bz0 Bx1 ...`,
    /// which is how the live plot lays out its grid.
    pub fn interleaved(&self) -> [f64; FEATURE_WIDTH] {
        let mut out = [0.0; FEATURE_WIDTH];
        for mag in 0..NUM_MAGS {
            for axis in 0..AXES.len() {
                out[mag * AXES.len() + axis] = self.axis(mag, axis);
            }
        }
        out
    }
}

/// The unlabeled input to a classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_WIDTH]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_WIDTH]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64; FEATURE_WIDTH] {
        &self.0
    }

    /// Largest magnitude over every channel.
    pub fn max_abs(&self) -> f64 {
        self.0.iter().fold(0.0, |acc, v| acc.max(v.abs()))
    }
}

/// Where the skin is being pressed. The discriminants are the integer
/// labels stored in datasets and the class indices models predict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    NoPress = 0,
    Top = 1,
    Left = 2,
    Right = 3,
}

impl Label {
    pub const ALL: [Label; 4] = [Label::NoPress, Label::Top, Label::Left, Label::Right];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Label::NoPress => "No press",
            Label::Top => "Top",
            Label::Left => "Left",
            Label::Right => "Right",
        };
        write!(f, "{}", name)
    }
}

/// Returned when a string or integer is not one of the four labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLabel(pub String);

impl fmt::Display for InvalidLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid label {:?}", self.0)
    }
}

impl std::error::Error for InvalidLabel {}

impl FromStr for Label {
    type Err = InvalidLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<usize>()
            .ok()
            .and_then(Label::from_index)
            .ok_or_else(|| InvalidLabel(s.to_owned()))
    }
}

/// One line of a dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow {
    pub features: FeatureVector,
    pub label: Label,
}

impl FeatureRow {
    pub fn new(features: FeatureVector, label: Label) -> Self {
        Self { features, label }
    }
}

/// Column names of a dataset file, in file order.
pub fn dataset_header() -> Vec<String> {
    (0..NUM_MAGS)
        .flat_map(|mag| AXES.iter().map(move |axis| format!("{}{}", axis, mag)))
        .chain(std::iter::once("label".to_owned()))
        .collect()
}

/// Names for the interleaved plot channels, `Bx0 By0 Bz0 Bx1 ...`.
pub fn channel_names() -> Vec<String> {
    let mut names = dataset_header();
    names.pop();
    names
}
