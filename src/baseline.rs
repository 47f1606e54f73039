//! Estimates the resting value of every channel before any touching starts.

use std::fmt;

use log::info;

use crate::acquisition::{poll_valid_samples, AcquisitionConfig, AcquisitionError};
use crate::features::BaselineVector;
use crate::sample_source::SampleSource;
use crate::{TransposableIter, RAW_WIDTH};

/// Length of the smoothing window, in samples.
pub const DEFAULT_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum BaselineError {
    Acquisition(AcquisitionError),
    /// A zero-length window.
    InvalidWindow,
    /// Not enough valid samples arrived to fill one window. Usually the
    /// sensor is unplugged or streaming the wrong layout.
    TooFewSamples { collected: usize, window: usize },
}

impl fmt::Display for BaselineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaselineError::Acquisition(e) => write!(f, "acquisition error: {}", e),
            BaselineError::InvalidWindow => write!(f, "moving average window must be non-zero"),
            BaselineError::TooFewSamples { collected, window } => write!(
                f,
                "collected {} valid samples, need at least {} to estimate a baseline",
                collected, window
            ),
        }
    }
}

impl std::error::Error for BaselineError {}

impl From<AcquisitionError> for BaselineError {
    fn from(value: AcquisitionError) -> Self {
        Self::Acquisition(value)
    }
}

/// Sliding-window mean over `series`, only where the window fits entirely,
/// so the output is `window - 1` shorter than the input.
pub fn moving_average(series: &[f64], window: usize) -> Result<Vec<f64>, BaselineError> {
    if window == 0 {
        return Err(BaselineError::InvalidWindow);
    }
    if series.len() < window {
        return Err(BaselineError::TooFewSamples {
            collected: series.len(),
            window,
        });
    }
    Ok(series
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect())
}

fn mean(series: &[f64]) -> f64 {
    series.iter().sum::<f64>() / series.len() as f64
}

/// Smooths each channel of `readings` and averages what is left.
pub fn baseline_from_readings(
    readings: &[[f64; RAW_WIDTH]],
    window: usize,
) -> Result<BaselineVector, BaselineError> {
    if window == 0 {
        return Err(BaselineError::InvalidWindow);
    }
    // Transposing nothing yields nothing, so bail before that.
    if readings.len() < window {
        return Err(BaselineError::TooFewSamples {
            collected: readings.len(),
            window,
        });
    }

    let mut values = [0.0; RAW_WIDTH];
    for (slot, channel) in values.iter_mut().zip(readings.iter().transpose()) {
        let channel: Vec<f64> = channel.into_iter().copied().collect();
        *slot = mean(&moving_average(&channel, window)?);
    }
    Ok(BaselineVector::new(values))
}

/// Polls `source` for `config.duration_secs` at `config.rate_hz` and turns
/// what arrived into a [`BaselineVector`]. Blocks for roughly the whole
/// duration.
pub fn estimate_baseline(
    source: &mut dyn SampleSource,
    config: &AcquisitionConfig,
    window: usize,
) -> Result<BaselineVector, BaselineError> {
    info!(
        "Estimating baseline over {} s at {} Hz",
        config.duration_secs, config.rate_hz
    );
    let mut readings = Vec::with_capacity(config.poll_count()?);
    poll_valid_samples(source, config, |raw| readings.push(*raw.values()))?;

    let baseline = baseline_from_readings(&readings, window)?;
    info!(
        "Baseline from {} samples: {:?}",
        readings.len(),
        baseline.values()
    );
    Ok(baseline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_source::ScriptedSource;

    #[test]
    fn moving_average_drops_window_minus_one() {
        let series: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let smoothed = moving_average(&series, 5).unwrap();
        assert_eq!(smoothed.len(), series.len() - 4);
        assert_eq!(smoothed[0], 2.0);
        assert_eq!(smoothed[7], 9.0);

        assert_eq!(moving_average(&series[..5], 5).unwrap(), vec![2.0]);
    }

    #[test]
    fn moving_average_needs_a_full_window() {
        assert_eq!(
            moving_average(&[1.0, 2.0, 3.0, 4.0], 5),
            Err(BaselineError::TooFewSamples {
                collected: 4,
                window: 5
            })
        );
        assert_eq!(moving_average(&[], 5).unwrap_err(), BaselineError::TooFewSamples {
            collected: 0,
            window: 5
        });
        assert_eq!(moving_average(&[1.0], 0), Err(BaselineError::InvalidWindow));
    }

    #[test]
    fn constant_channels_give_their_constant() {
        let mut reading = [0.0; RAW_WIDTH];
        reading
            .iter_mut()
            .enumerate()
            .for_each(|(i, v)| *v = 100.0 * i as f64 - 750.0);
        let readings = vec![reading; 9];
        let baseline = baseline_from_readings(&readings, 5).unwrap();
        assert_eq!(baseline.values(), &reading);
    }

    #[test]
    fn baseline_smooths_then_averages() {
        // Channel 0 ramps 0..7, smoothed to 2,3,4,5 which averages to 3.5.
        let readings: Vec<[f64; RAW_WIDTH]> = (0..8)
            .map(|i| {
                let mut r = [1.0; RAW_WIDTH];
                r[0] = i as f64;
                r
            })
            .collect();
        let baseline = baseline_from_readings(&readings, 5).unwrap();
        assert_eq!(baseline.values()[0], 3.5);
        assert_eq!(baseline.values()[19], 1.0);
    }

    #[test]
    fn estimate_skips_bad_samples() {
        let mut script = vec![vec![7.0; 20]; 6];
        script.insert(2, vec![1000.0; 12]);
        script.insert(4, vec![-1000.0; 24]);
        let mut src = ScriptedSource::new(script);

        let baseline =
            estimate_baseline(&mut src, &AcquisitionConfig::new(0.008, 1000.0), 5).unwrap();
        assert_eq!(baseline.values(), &[7.0; RAW_WIDTH]);
    }

    #[test]
    fn dead_source_is_a_fatal_error() {
        let mut src = ScriptedSource::dead();
        let err = estimate_baseline(&mut src, &AcquisitionConfig::new(0.01, 1000.0), 5);
        assert_eq!(
            err,
            Err(BaselineError::TooFewSamples {
                collected: 0,
                window: 5
            })
        );
    }

    #[test]
    fn four_samples_are_not_enough() {
        let mut src = ScriptedSource::new(vec![vec![1.0; 20]; 4]);
        let err = estimate_baseline(&mut src, &AcquisitionConfig::new(0.01, 1000.0), 5);
        assert!(matches!(
            err,
            Err(BaselineError::TooFewSamples { collected: 4, .. })
        ));
    }
}
