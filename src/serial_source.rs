//! The [`SampleSource`] backed by a real ReSkin board on a serial port.

use crate::sample_decoder::decode_reading;
use crate::sample_source::{DeviceId, Sample, SampleSource};

use log::{debug, info, warn};
use serial2::SerialPort;
use std::{
    fmt, io,
    path::PathBuf,
    str,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// How long a read may block before the reader checks whether it should
/// shut down.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Longest line kept while waiting for a newline. A full reading is well
/// under 300 bytes; anything this long is noise from a wrong baud rate.
const MAX_LINE: usize = 4096;

/// Everything needed to talk to one board.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    pub num_mags: usize,
    pub port: PathBuf,
    pub baudrate: u32,
    /// The board streams readings continuously instead of on request.
    pub burst_mode: bool,
    pub device_id: DeviceId,
    pub temp_filtered: bool,
}

#[derive(Debug)]
pub enum SourceError {
    /// The port could not be opened or configured.
    Open { port: PathBuf, error: io::Error },
    /// Only streaming boards are supported.
    BurstModeRequired,
    /// Neither a port nor the simulated board was asked for. Carries the
    /// ports the operating system reported, to suggest one.
    NoPort { available: Vec<PathBuf> },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Open { port, error } => {
                write!(f, "could not open {}: {}", port.display(), error)
            }
            SourceError::BurstModeRequired => {
                write!(f, "the serial source only supports boards in burst mode")
            }
            SourceError::NoPort { available } => {
                write!(f, "no serial port given, pass --port or --dummy")?;
                if available.is_empty() {
                    return write!(f, " (no serial ports found)");
                }
                write!(f, ". Available ports:")?;
                for port in available {
                    write!(f, "\n\t{}", port.display())?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for SourceError {}

/// Reads the board on a worker thread and keeps only the newest reading,
/// so a poll never waits on the port and may see the same reading twice.
#[derive(Debug)]
pub struct SerialSource {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    latest: Arc<Mutex<Option<Sample>>>,
}

impl SerialSource {
    /// Opens the port and starts streaming.
    pub fn open(config: SensorConfig) -> Result<Self, SourceError> {
        if !config.burst_mode {
            return Err(SourceError::BurstModeRequired);
        }
        let open_err = |error| SourceError::Open {
            port: config.port.clone(),
            error,
        };
        let mut port = SerialPort::open(&config.port, config.baudrate).map_err(open_err)?;
        port.set_read_timeout(READ_TIMEOUT).map_err(open_err)?;
        info!(
            "Opened {} at {} baud, device {}",
            config.port.display(),
            config.baudrate,
            config.device_id
        );

        let running = Arc::new(AtomicBool::new(true));
        let alive = Arc::new(AtomicBool::new(true));
        let latest = Arc::new(Mutex::new(None));

        let handle = {
            let running = Arc::clone(&running);
            let alive = Arc::clone(&alive);
            let latest = Arc::clone(&latest);
            thread::spawn(move || {
                read_port(&port, &config, &running, &latest);
                alive.store(false, Ordering::SeqCst);
            })
        };

        Ok(Self {
            handle: Some(handle),
            running,
            alive,
            latest,
        })
    }
}

/// Reads newline-terminated readings until told to stop or the port fails.
fn read_port(
    port: &SerialPort,
    config: &SensorConfig,
    running: &AtomicBool,
    latest: &Mutex<Option<Sample>>,
) {
    let start = Instant::now();
    let mut buffer = [0; 256];
    let mut lines = LineBuffer::default();

    while running.load(Ordering::SeqCst) {
        let read_len = match port.read(&mut buffer) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) => {
                warn!("Device disconnected: {}", e);
                return;
            }
        };

        lines.feed(&buffer[..read_len], |line| match str::from_utf8(line) {
            Ok(s) => match decode_reading(s, config.num_mags, config.temp_filtered) {
                Ok(data) => {
                    *latest.lock().unwrap() = Some(Sample {
                        dev_id: config.device_id,
                        time: start.elapsed().as_secs_f64(),
                        data,
                    });
                }
                Err(e) => debug!("{}", e),
            },
            // Often happens at the beginning of transmission when
            // there is still garbage in the hardware buffer
            Err(e) => {
                warn!("Failed to decode utf-8: {:?}", e);
            }
        });
    }
}

/// Splits a byte stream on `\n`. A line that grows past [`MAX_LINE`] is
/// thrown away up to and including its eventual newline.
#[derive(Debug, Default)]
struct LineBuffer {
    buf: Vec<u8>,
    overflowed: bool,
}

impl LineBuffer {
    fn feed(&mut self, bytes: &[u8], mut on_line: impl FnMut(&[u8])) {
        for &c in bytes {
            if c == b'\n' {
                if !self.overflowed {
                    on_line(&self.buf);
                }
                self.buf.clear();
                self.overflowed = false;
                continue;
            }
            if self.overflowed {
                continue;
            }
            if self.buf.len() >= MAX_LINE {
                warn!("Dropping {} bytes without a newline, check the baud rate", self.buf.len());
                self.buf = Vec::new();
                self.overflowed = true;
                continue;
            }
            self.buf.push(c);
        }
    }
}

impl SampleSource for SerialSource {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn poll(&mut self) -> Option<Sample> {
        self.latest.lock().unwrap().clone()
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.handle.take() {
            if thread.join().is_err() {
                warn!("Serial reader panicked");
            }
        }
    }
}

impl Drop for SerialSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ports the operating system knows about.
pub fn available_ports() -> io::Result<Vec<PathBuf>> {
    SerialPort::available_ports()
}
