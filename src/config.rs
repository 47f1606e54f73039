//! Tunables shared by the binaries, optionally read from a RON file such as
//!
//! ```text
//! (
//!     baseline: (duration_secs: 20.0, rate_hz: 100.0),
//!     collection: (duration_secs: 10.0, rate_hz: 500.0),
//!     gate_threshold: 150.0,
//! )
//! ```
//!
//! Any field left out keeps its default.

use std::{borrow::Cow, fmt, fs, io, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::acquisition::AcquisitionConfig;
use crate::baseline::DEFAULT_WINDOW;
use crate::inference::DEFAULT_GATE_THRESHOLD;
use crate::visual_feed::DEFAULT_CAPACITY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReskinConfig {
    /// Polling for the startup baseline of the monitor and `baseline`.
    pub baseline: AcquisitionConfig,
    /// Polling for the startup baseline of `collect`, which samples at the
    /// same rate it collects.
    pub collection_baseline: AcquisitionConfig,
    /// Polling for each labeled collection.
    pub collection: AcquisitionConfig,
    /// Pause between choosing a label and collecting it.
    pub settle_secs: f64,
    pub moving_average_window: usize,
    pub gate_threshold: f64,
    /// Samples of history per plotted channel.
    pub display_capacity: usize,
    /// How often the live monitor polls and redraws.
    pub tick_ms: u64,
}

impl Default for ReskinConfig {
    fn default() -> Self {
        Self {
            baseline: AcquisitionConfig::new(20.0, 100.0),
            collection_baseline: AcquisitionConfig::new(20.0, 500.0),
            collection: AcquisitionConfig::new(10.0, 500.0),
            settle_secs: 1.0,
            moving_average_window: DEFAULT_WINDOW,
            gate_threshold: DEFAULT_GATE_THRESHOLD,
            display_capacity: DEFAULT_CAPACITY,
            tick_ms: 10,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    IoError(io::Error),
    RonSpannedError(ron::de::SpannedError),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            ConfigError::IoError(error) => Cow::from(format!("io error: {}", error)),
            ConfigError::RonSpannedError(error) => Cow::from(format!("ron error: {}", error)),
            ConfigError::Invalid(why) => Cow::from(*why),
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for ConfigError {}

impl ReskinConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::IoError)?;
        Self::from_ron(&text)
    }

    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text).map_err(ConfigError::RonSpannedError)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if there is one, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.moving_average_window == 0 {
            return Err(ConfigError::Invalid("moving_average_window must be non-zero"));
        }
        if self.display_capacity == 0 {
            return Err(ConfigError::Invalid("display_capacity must be non-zero"));
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid("tick_ms must be non-zero"));
        }
        if !(self.settle_secs.is_finite() && self.settle_secs >= 0.0) {
            return Err(ConfigError::Invalid("settle_secs must be a non-negative number"));
        }
        Ok(())
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs_f64(self.settle_secs)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
