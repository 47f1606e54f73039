//! Turns a stretch of baselined readings into labeled dataset rows.

use log::info;

use crate::acquisition::{poll_valid_samples, AcquisitionConfig, AcquisitionError};
use crate::features::{BaselineVector, FeatureRow, Label};
use crate::sample_source::SampleSource;

/// Polls `source` for `config.duration_secs` at `config.rate_hz`, and for
/// every valid reading emits its baselined features tagged with `label`.
/// Rows come back in arrival order. No smoothing happens here.
pub fn collect_labeled(
    source: &mut dyn SampleSource,
    baseline: &BaselineVector,
    label: Label,
    config: &AcquisitionConfig,
) -> Result<Vec<FeatureRow>, AcquisitionError> {
    let mut rows = Vec::with_capacity(config.poll_count()?);
    poll_valid_samples(source, config, |raw| {
        rows.push(FeatureRow::new(raw.adjust(baseline).features(), label))
    })?;
    info!("Collected {} rows labeled {:?}", rows.len(), label);
    Ok(rows)
}
