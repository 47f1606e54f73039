use crate::features::Label;
use crate::sample_source::{Sample, SampleSource};
use crate::{NUM_MAGS, RAW_WIDTH, VALUES_PER_MAG};

use rand::prelude::*;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// A fake board for running the tools without hardware. A worker thread
/// writes a fresh reading every `1 / rate_hz` seconds: a fixed resting
/// field, plus noise, plus a press deflection while a press is active.
pub struct DummySource {
    handle: Option<thread::JoinHandle<()>>,
    tx: mpsc::Sender<Signal>,
    latest: Arc<Mutex<Option<Sample>>>,
}

enum Signal {
    Press(Option<Label>),
    Noise(f64),
    Stop,
}

/// Configures a [`DummySource`] before its thread starts.
pub struct DummySourceBuilder {
    rate_hz: f64,
    noise: f64,
}

impl DummySourceBuilder {
    pub fn rate_hz(mut self, rate_hz: f64) -> Self {
        self.rate_hz = rate_hz;
        self
    }

    pub fn noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    pub fn build(self) -> DummySource {
        let (tx, rx) = mpsc::channel::<Signal>();
        let latest = Arc::new(Mutex::new(None));
        let th_latest = Arc::clone(&latest);
        let period = Duration::from_secs_f64(1.0 / self.rate_hz.max(1.0));

        let handle = thread::spawn(move || {
            let start = Instant::now();
            let mut rng = thread_rng();
            let mut noise = self.noise;
            let mut press = None;
            loop {
                match rx.try_recv() {
                    Ok(Signal::Press(new_press)) => press = new_press,
                    Ok(Signal::Noise(new_noise)) => noise = new_noise,
                    Ok(Signal::Stop) | Err(mpsc::TryRecvError::Disconnected) => break,
                    Err(mpsc::TryRecvError::Empty) => {}
                }
                let elapsed = start.elapsed();
                *th_latest.lock().unwrap() = Some(Sample {
                    dev_id: 0,
                    time: elapsed.as_secs_f64(),
                    data: generate_reading(press, noise, &mut rng),
                });
                spin_sleep::sleep(period);
            }
        });

        DummySource {
            handle: Some(handle),
            tx,
            latest,
        }
    }
}

impl DummySource {
    pub fn builder() -> DummySourceBuilder {
        DummySourceBuilder {
            rate_hz: 500.0,
            noise: 2.0,
        }
    }

    // The worker only goes away after `stop`, so a failed send just means
    // there is nobody left to tell.
    pub fn set_press(&self, press: Option<Label>) {
        let _ = self.tx.send(Signal::Press(press));
    }

    pub fn set_noise(&self, noise: f64) {
        let _ = self.tx.send(Signal::Noise(noise));
    }
}

impl SampleSource for DummySource {
    fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn poll(&mut self) -> Option<Sample> {
        self.latest.lock().unwrap().clone()
    }

    fn stop(&mut self) {
        let _ = self.tx.send(Signal::Stop);
        // We have to do this `Option` and `.take()` dance because calling
        // `.join()` on a `JoinHandle` moves it out of the struct.
        if let Some(thread) = self.handle.take() {
            thread.join().unwrap();
        }
    }
}

impl Drop for DummySource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Resting field of magnetometer `mag`, loosely what an untouched board
/// reads: a warm temperature and a few hundred units per axis.
fn resting(mag: usize) -> [f64; VALUES_PER_MAG] {
    let m = mag as f64;
    [30.0 + 0.1 * m, -120.0 + 40.0 * m, 60.0 - 25.0 * m, -1000.0 + 15.0 * m]
}

/// How far a press at `label` pushes each magnetometer's Bx, By, Bz. The
/// board is laid out as a plus: 0 in the middle, 1 at the top, 2 left,
/// 3 right, 4 bottom.
fn deflection(label: Label, mag: usize) -> [f64; 3] {
    let near = match (label, mag) {
        (Label::NoPress, _) => return [0.0; 3],
        (Label::Top, 1) | (Label::Left, 2) | (Label::Right, 3) => 1.0,
        (_, 0) => 0.5,
        _ => 0.1,
    };
    let (dx, dy) = match label {
        Label::Top => (0.0, 1.0),
        Label::Left => (-1.0, 0.0),
        Label::Right => (1.0, 0.0),
        Label::NoPress => (0.0, 0.0),
    };
    [near * 300.0 * dx, near * 300.0 * dy, near * 600.0]
}

fn generate_reading(press: Option<Label>, noise: f64, rng: &mut impl Rng) -> Vec<f64> {
    let mut data = Vec::with_capacity(RAW_WIDTH);
    for mag in 0..NUM_MAGS {
        let base = resting(mag);
        let push = press.map_or([0.0; 3], |label| deflection(label, mag));
        data.push(base[0]);
        for axis in 0..3 {
            let jitter = if noise > 0.0 {
                rng.gen_range(-noise..noise)
            } else {
                0.0
            };
            data.push(base[axis + 1] + push[axis] + jitter);
        }
    }
    data
}
