//! The live side of the pipeline: one bounded history per magnetic channel,
//! refreshed from the source on every tick and handed to a renderer.

use log::warn;

use crate::features::{BaselineVector, Label, RawSample, FEATURE_WIDTH};
use crate::inference::InferenceOverlay;
use crate::ring_buffer::RingBuffer;
use crate::sample_source::SampleSource;

/// Samples of history kept per channel.
pub const DEFAULT_CAPACITY: usize = 100;

/// What a renderer gets to see each tick.
pub struct FeedFrame<'a> {
    /// One buffer per channel, sensor by sensor: `Bx0 By0 Bz0 Bx1 ...`.
    pub channels: &'a [RingBuffer<f64>],
    /// The latest overlay verdict, if an overlay is attached and has run.
    pub prediction: Option<Label>,
}

/// Somewhere to draw a [`FeedFrame`].
pub trait RenderSink {
    fn render(&mut self, frame: FeedFrame<'_>);
}

/// Owns the display buffers and the optional inference overlay for one
/// visualization session.
pub struct VisualFeed {
    baseline: BaselineVector,
    channels: Vec<RingBuffer<f64>>,
    overlay: Option<InferenceOverlay>,
    prediction: Option<Label>,
}

impl VisualFeed {
    pub fn new(baseline: BaselineVector, capacity: usize) -> Self {
        Self {
            baseline,
            channels: (0..FEATURE_WIDTH).map(|_| RingBuffer::new(capacity)).collect(),
            overlay: None,
            prediction: None,
        }
    }

    pub fn with_overlay(mut self, overlay: InferenceOverlay) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn channels(&self) -> &[RingBuffer<f64>] {
        &self.channels
    }

    pub fn prediction(&self) -> Option<Label> {
        self.prediction
    }

    /// Takes at most one reading from `source`. A well-formed reading is
    /// baselined, pushed onto every channel and, with an overlay attached,
    /// classified. The current buffers go to `sink` whether or not anything
    /// new arrived. Returns whether a reading was accepted.
    pub fn tick(&mut self, source: &mut dyn SampleSource, sink: &mut dyn RenderSink) -> bool {
        let accepted = self.ingest(source);
        sink.render(FeedFrame {
            channels: &self.channels,
            prediction: self.prediction,
        });
        accepted
    }

    fn ingest(&mut self, source: &mut dyn SampleSource) -> bool {
        if !source.is_alive() {
            return false;
        }
        let Some(sample) = source.poll() else {
            return false;
        };
        let Ok(raw) = RawSample::try_from(sample.data.as_slice()) else {
            return false;
        };

        let adjusted = raw.adjust(&self.baseline);
        for (buffer, value) in self.channels.iter_mut().zip(adjusted.interleaved()) {
            buffer.push(value);
        }

        if let Some(overlay) = &self.overlay {
            self.prediction = match overlay.classify(&adjusted.features()) {
                Ok(label) => Some(label),
                Err(e) => {
                    warn!("Inference failed: {}", e);
                    None
                }
            };
        }
        true
    }
}
