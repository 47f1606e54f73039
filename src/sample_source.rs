//! The capability every acquisition loop polls for raw sensor readings.

use std::collections::VecDeque;

/// Seconds since the source started streaming.
pub type Timestamp = f64;
pub type DeviceId = u32;

/// One reading as handed over by a source. `data` is not validated here;
/// anything that is not exactly [`RAW_WIDTH`](crate::RAW_WIDTH) long gets
/// dropped by the consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub dev_id: DeviceId,
    pub time: Timestamp,
    pub data: Vec<f64>,
}

/// `SampleSource`
///
/// A pollable stream of [`Sample`]s. Designed so that the serial reader, the
/// synthetic generator and test doubles can all stand behind the same loops.
pub trait SampleSource {
    /// Whether the source is still producing data. Must not block.
    fn is_alive(&self) -> bool;

    /// The most recent sample, if there is one. May hand back a sample that
    /// was already seen on a previous poll.
    fn poll(&mut self) -> Option<Sample>;

    /// Shuts the source down. Sources without a worker have nothing to do.
    fn stop(&mut self) {}
}

/// A deterministic [`SampleSource`] that replays a fixed queue of readings,
/// one per poll, and reports itself dead once `alive` is cleared.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    queue: VecDeque<Vec<f64>>,
    alive: bool,
    polls: usize,
    stopped: bool,
}

impl ScriptedSource {
    pub fn new(readings: impl IntoIterator<Item = Vec<f64>>) -> Self {
        Self {
            queue: readings.into_iter().collect(),
            alive: true,
            polls: 0,
            stopped: false,
        }
    }

    /// A source that never comes alive.
    pub fn dead() -> Self {
        Self {
            alive: false,
            ..Self::default()
        }
    }

    pub fn set_alive(&mut self, alive: bool) {
        self.alive = alive;
    }

    /// How many times [`SampleSource::poll`] was called.
    pub fn polls(&self) -> usize {
        self.polls
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl SampleSource for ScriptedSource {
    fn is_alive(&self) -> bool {
        self.alive && !self.stopped
    }

    fn poll(&mut self) -> Option<Sample> {
        self.polls += 1;
        self.queue.pop_front().map(|data| Sample {
            dev_id: 0,
            time: self.polls as Timestamp,
            data,
        })
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
