//! Live plot of all fifteen field channels, with an optional press-location
//! overlay when a scaler and model are given.

use clap::Parser;
use reskin::{
    args::MonitorArgs,
    baseline::estimate_baseline,
    config::ReskinConfig,
    gui::live_plot,
    inference::{load_classifier, InferenceOverlay, StandardScaler},
    visual_feed::VisualFeed,
};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = MonitorArgs::parse();
    let config = ReskinConfig::load(args.sensor.config.as_deref())?;

    // Load the artifacts before the baseline so a bad path fails fast.
    let overlay = match (&args.scaler, &args.model) {
        (Some(scaler), Some(model)) => Some(InferenceOverlay::new(
            StandardScaler::from_path(scaler)?,
            load_classifier(args.model_kind, model)?,
            config.gate_threshold,
        )?),
        _ => None,
    };

    let mut source = args.sensor.open_source()?;
    let baseline = estimate_baseline(
        source.as_mut(),
        &config.baseline,
        config.moving_average_window,
    )?;

    let mut feed = VisualFeed::new(baseline, config.display_capacity);
    if let Some(overlay) = overlay {
        feed = feed.with_overlay(overlay);
    }

    let res = live_plot(&mut feed, source.as_mut(), config.tick_rate());
    source.stop();
    res?;
    Ok(())
}
