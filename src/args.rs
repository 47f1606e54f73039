// Commandline argument parser using clap for the ReSkin tools

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::dummy_source::DummySource;
use crate::inference::ModelKind;
use crate::sample_source::SampleSource;
use crate::serial_source::{available_ports, SensorConfig, SerialSource, SourceError};
use crate::NUM_MAGS;

/// How to reach the board. Shared by every binary.
#[derive(Debug, Args, Clone)]
pub struct SensorArgs {
    /// Serial port the board is attached to, e.g. /dev/ttyACM0
    #[arg(short, long)]
    pub port: Option<PathBuf>,

    /// Serial baud rate
    #[arg(short, long, default_value_t = 115200)]
    pub baudrate: u32,

    /// Number of magnetometers on the board
    #[arg(short, long = "num_mags", default_value_t = NUM_MAGS)]
    pub num_mags: usize,

    /// The board firmware drops the temperature value of each magnetometer
    #[arg(long = "temp_filtered", visible_alias = "tf")]
    pub temp_filtered: bool,

    /// Use a simulated board instead of a serial port
    #[arg(long)]
    pub dummy: bool,

    /// RON file overriding the default durations, rates and thresholds
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl SensorArgs {
    /// Starts streaming from whichever source the arguments name.
    pub fn open_source(&self) -> Result<Box<dyn SampleSource>, SourceError> {
        if self.dummy {
            return Ok(Box::new(DummySource::builder().build()));
        }
        match &self.port {
            Some(port) => {
                let source = SerialSource::open(SensorConfig {
                    num_mags: self.num_mags,
                    port: port.clone(),
                    baudrate: self.baudrate,
                    burst_mode: true,
                    device_id: 1,
                    temp_filtered: self.temp_filtered,
                })?;
                Ok(Box::new(source))
            }
            None => Err(SourceError::NoPort {
                available: available_ports().unwrap_or_default(),
            }),
        }
    }
}

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct ReskinArgs {
    #[command(subcommand, long_about)]
    /// Which task to perform
    pub command: ReskinCommand,

    #[command(flatten)]
    pub sensor: SensorArgs,
}

#[derive(Debug, Subcommand, Clone)]
pub enum ReskinCommand {
    /// Estimate and print the resting baseline of the board
    #[command(about)]
    Baseline,

    /// Interactively record a labeled dataset
    #[command(about)]
    Collect(CollectCommand),

    /// Fit a feature scaler to one or more datasets
    #[command(about)]
    FitScaler(FitScalerCommand),

    /// Report accuracy and per-label precision and recall of a model
    #[command(about)]
    Evaluate(EvaluateCommand),
}

#[derive(Debug, Args, Clone)]
pub struct CollectCommand {
    /// CSV file the labeled dataset is written to
    #[arg(short, long = "output_file")]
    pub output_file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct FitScalerCommand {
    /// Where to write the fitted scaler
    #[arg(short, long, default_value = "scaler.ron")]
    pub output_file: PathBuf,

    /// Datasets to fit on, concatenated in order
    #[clap(num_args = 1.., required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct EvaluateCommand {
    /// Scaler produced by fit-scaler
    #[arg(long)]
    pub scaler: PathBuf,

    /// Model file in RON
    #[arg(long)]
    pub model: PathBuf,

    /// What kind of model --model holds
    #[arg(long = "model_kind", value_enum, default_value_t = ModelKind::Network)]
    pub model_kind: ModelKind,

    /// Labeled dataset to score against
    pub file: PathBuf,
}

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub sensor: SensorArgs,

    /// Scaler for the press overlay, needs --model
    #[arg(long, requires = "model")]
    pub scaler: Option<PathBuf>,

    /// Model for the press overlay, needs --scaler
    #[arg(long, requires = "scaler")]
    pub model: Option<PathBuf>,

    /// What kind of model --model holds
    #[arg(long = "model_kind", value_enum, default_value_t = ModelKind::Network)]
    pub model_kind: ModelKind,
}
