//! The fixed-count poll loop shared by baseline estimation and labeled
//! collection.

use std::{fmt, time::Duration};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::features::RawSample;
use crate::sample_source::SampleSource;

/// How long to poll, and how often.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    pub duration_secs: f64,
    pub rate_hz: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AcquisitionError {
    /// The rate is zero, negative or not a number.
    InvalidRate(f64),
    /// The duration is negative or not a number.
    InvalidDuration(f64),
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionError::InvalidRate(r) => write!(f, "invalid sampling rate {} Hz", r),
            AcquisitionError::InvalidDuration(d) => write!(f, "invalid duration {} s", d),
        }
    }
}

impl std::error::Error for AcquisitionError {}

impl AcquisitionConfig {
    pub fn new(duration_secs: f64, rate_hz: f64) -> Self {
        Self {
            duration_secs,
            rate_hz,
        }
    }

    fn validate(&self) -> Result<(), AcquisitionError> {
        if !(self.rate_hz.is_finite() && self.rate_hz > 0.0) {
            return Err(AcquisitionError::InvalidRate(self.rate_hz));
        }
        if !(self.duration_secs.is_finite() && self.duration_secs >= 0.0) {
            return Err(AcquisitionError::InvalidDuration(self.duration_secs));
        }
        Ok(())
    }

    /// Number of polls, `duration × rate`.
    pub fn poll_count(&self) -> Result<usize, AcquisitionError> {
        self.validate()?;
        Ok((self.duration_secs * self.rate_hz).round() as usize)
    }

    /// Delay between two polls, `1 / rate`.
    pub fn interval(&self) -> Result<Duration, AcquisitionError> {
        self.validate()?;
        Ok(Duration::from_secs_f64(1.0 / self.rate_hz))
    }
}

/// Polls `source` exactly [`AcquisitionConfig::poll_count`] times, sleeping
/// one interval after each poll, and hands every well-formed reading to `f`.
///
/// Ticks where the source is dead or has nothing are skipped, and so are
/// readings of the wrong width. Neither counts toward anything. Returns how
/// many readings reached `f`.
pub fn poll_valid_samples<F>(
    source: &mut dyn SampleSource,
    config: &AcquisitionConfig,
    mut f: F,
) -> Result<usize, AcquisitionError>
where
    F: FnMut(RawSample),
{
    let polls = config.poll_count()?;
    let interval = config.interval()?;
    let mut accepted = 0;

    for _ in 0..polls {
        if source.is_alive() {
            if let Some(sample) = source.poll() {
                match RawSample::try_from(sample.data.as_slice()) {
                    Ok(raw) => {
                        f(raw);
                        accepted += 1;
                    }
                    Err(e) => debug!("Dropping sample from device {}: {}", sample.dev_id, e),
                }
            }
        }
        spin_sleep::sleep(interval);
    }

    debug!("Accepted {} of {} polls", accepted, polls);
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_source::ScriptedSource;

    #[test]
    fn poll_count_is_duration_times_rate() {
        assert_eq!(AcquisitionConfig::new(20.0, 100.0).poll_count(), Ok(2000));
        assert_eq!(AcquisitionConfig::new(0.001, 5000.0).poll_count(), Ok(5));
        assert_eq!(
            AcquisitionConfig::new(0.5, 4.0).interval(),
            Ok(Duration::from_millis(250))
        );
    }

    #[test]
    fn bad_rates_are_rejected() {
        assert_eq!(
            AcquisitionConfig::new(1.0, 0.0).poll_count(),
            Err(AcquisitionError::InvalidRate(0.0))
        );
        assert!(AcquisitionConfig::new(1.0, f64::NAN).interval().is_err());
        assert_eq!(
            AcquisitionConfig::new(-1.0, 10.0).poll_count(),
            Err(AcquisitionError::InvalidDuration(-1.0))
        );
    }

    #[test]
    fn wrong_width_samples_do_not_count() {
        let mut src = ScriptedSource::new(vec![
            vec![1.0; 20],
            vec![1.0; 15],
            vec![2.0; 20],
            vec![],
            vec![3.0; 21],
        ]);
        let mut seen = vec![];
        let n = poll_valid_samples(&mut src, &AcquisitionConfig::new(0.001, 5000.0), |raw| {
            seen.push(raw.values()[0])
        })
        .unwrap();
        assert_eq!(n, 2);
        assert_eq!(seen, vec![1.0, 2.0]);
        assert_eq!(src.polls(), 5);
    }

    #[test]
    fn dead_source_is_never_polled() {
        let mut src = ScriptedSource::dead();
        let n = poll_valid_samples(&mut src, &AcquisitionConfig::new(0.001, 5000.0), |_| {
            panic!("nothing should come out of a dead source")
        })
        .unwrap();
        assert_eq!(n, 0);
        assert_eq!(src.polls(), 0);
    }
}
