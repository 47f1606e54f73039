//! Command line entry point for recording and checking ReSkin datasets.

use clap::Parser;
use log::info;
use reskin::{
    acquisition::AcquisitionConfig,
    args::{ReskinArgs, ReskinCommand, SensorArgs},
    baseline::estimate_baseline,
    config::ReskinConfig,
    dataset::Dataset,
    features::BaselineVector,
    inference::{classification_report, load_classifier, StandardScaler},
    sample_source::SampleSource,
    session::LabelingSession,
};
use std::{
    error::Error,
    io::{self, BufReader},
};

// Example:
// cargo run --bin reskin -- --port /dev/ttyACM0 collect --output_file presses.csv
// cargo run --bin reskin -- fit-scaler -o scaler.ron presses.csv more_presses.csv
// cargo run --bin reskin -- evaluate --scaler scaler.ron --model forest.ron --model_kind forest presses.csv

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = ReskinArgs::parse();
    let config = ReskinConfig::load(args.sensor.config.as_deref())?;

    match args.command {
        ReskinCommand::Baseline => {
            let (mut source, baseline) = start(&args.sensor, &config.baseline, &config)?;
            source.stop();
            let values: Vec<String> = baseline.values().iter().map(f64::to_string).collect();
            println!("{}", values.join(","));
        }
        ReskinCommand::Collect(cmd) => {
            let (mut source, baseline) =
                start(&args.sensor, &config.collection_baseline, &config)?;
            let mut session = LabelingSession::new(
                source.as_mut(),
                baseline,
                config.collection,
                config.settle(),
            );
            // Whatever was collected is saved even if the prompt loop fails.
            let outcome = session.run(BufReader::new(io::stdin()), io::stdout());
            let dataset = session.finish(&cmd.output_file)?;
            println!(
                "Saved {} rows to {}",
                dataset.len(),
                cmd.output_file.display()
            );
            outcome?;
        }
        ReskinCommand::FitScaler(cmd) => {
            let dataset = Dataset::concat(&cmd.files)?;
            let scaler = StandardScaler::fit(&dataset).ok_or("no rows to fit a scaler on")?;
            scaler.to_path(&cmd.output_file)?;
            info!(
                "Fit scaler on {} rows, wrote {}",
                dataset.len(),
                cmd.output_file.display()
            );
        }
        ReskinCommand::Evaluate(cmd) => {
            let scaler = StandardScaler::from_path(&cmd.scaler)?;
            let model = load_classifier(cmd.model_kind, &cmd.model)?;
            let dataset = Dataset::from_path(&cmd.file)?;
            let report = classification_report(&dataset, &scaler, model.as_ref())?;
            println!("Test accuracy: {:.2}%", report.accuracy * 100.0);
            println!("Classification Report:");
            println!("{}", report);
        }
    }

    Ok(())
}

/// Opens the configured source and waits out the baseline estimate.
fn start(
    sensor: &SensorArgs,
    polling: &AcquisitionConfig,
    config: &ReskinConfig,
) -> Result<(Box<dyn SampleSource>, BaselineVector), Box<dyn Error>> {
    let mut source = sensor.open_source()?;
    let baseline = estimate_baseline(source.as_mut(), polling, config.moving_average_window)?;
    Ok((source, baseline))
}
