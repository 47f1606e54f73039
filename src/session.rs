//! The interactive labeling loop: ask for a label, collect it, repeat, then
//! save everything when the operator is done.

use std::{
    fmt,
    io::{self, BufRead, Write},
    path::Path,
    str::{self, FromStr},
    time::Duration,
};

use log::info;

use crate::acquisition::{AcquisitionConfig, AcquisitionError};
use crate::collector::collect_labeled;
use crate::dataset::{Dataset, DatasetError};
use crate::features::{BaselineVector, InvalidLabel, Label};
use crate::sample_source::SampleSource;

const PROMPT: &str =
    "Enter the label for the sample (0: No press, 1: Top, 2: Left, 3: Right, 4: End collection): ";

/// What the operator typed at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Collect(Label),
    End,
}

impl FromStr for Command {
    type Err = InvalidLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "4" => Ok(Command::End),
            other => other.parse().map(Command::Collect),
        }
    }
}

#[derive(Debug)]
pub enum SessionError {
    Io(io::Error),
    Acquisition(AcquisitionError),
    Dataset(DatasetError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Io(e) => write!(f, "io error: {}", e),
            SessionError::Acquisition(e) => write!(f, "acquisition error: {}", e),
            SessionError::Dataset(e) => write!(f, "could not save dataset: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<io::Error> for SessionError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<AcquisitionError> for SessionError {
    fn from(value: AcquisitionError) -> Self {
        Self::Acquisition(value)
    }
}

impl From<DatasetError> for SessionError {
    fn from(value: DatasetError) -> Self {
        Self::Dataset(value)
    }
}

/// A labeling session over one source and one baseline. Labels are
/// collected strictly one after the other, so rows of different labels
/// never interleave.
pub struct LabelingSession<'a> {
    source: &'a mut dyn SampleSource,
    baseline: BaselineVector,
    collection: AcquisitionConfig,
    settle: Duration,
    dataset: Dataset,
}

impl<'a> LabelingSession<'a> {
    pub fn new(
        source: &'a mut dyn SampleSource,
        baseline: BaselineVector,
        collection: AcquisitionConfig,
        settle: Duration,
    ) -> Self {
        Self {
            source,
            baseline,
            collection,
            settle,
            dataset: Dataset::new(),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Waits out the settle delay, collects one label and appends it.
    /// Returns how many rows were added.
    pub fn collect(&mut self, label: Label, out: &mut impl Write) -> Result<usize, SessionError> {
        writeln!(out, "Waiting for {} seconds...", self.settle.as_secs_f64())?;
        spin_sleep::sleep(self.settle);
        writeln!(out, "Starting data collection...")?;
        let rows = collect_labeled(&mut *self.source, &self.baseline, label, &self.collection)?;
        let added = rows.len();
        self.dataset.extend(rows);
        writeln!(out, "Data collection for label {} completed.", label.index())?;
        Ok(added)
    }

    /// Prompts on `out` and reads commands from `input` until the operator
    /// enters 4 or the input runs dry. Anything that is not 0 to 4 gets a
    /// complaint and another prompt.
    ///
    /// Lines that are not UTF-8 count as invalid input like any other typo.
    /// If reading or collecting fails part way, the rows gathered so far stay
    /// in the session and can still be saved with [`finish`](Self::finish).
    pub fn run(&mut self, mut input: impl BufRead, mut out: impl Write) -> Result<(), SessionError> {
        let mut line = Vec::new();
        loop {
            write!(out, "{}", PROMPT)?;
            out.flush()?;
            line.clear();
            if input.read_until(b'\n', &mut line)? == 0 {
                info!("Input closed, ending collection");
                break;
            }
            let command = str::from_utf8(&line)
                .ok()
                .and_then(|text| text.parse::<Command>().ok());
            match command {
                Some(Command::End) => break,
                Some(Command::Collect(label)) => {
                    self.collect(label, &mut out)?;
                }
                None => writeln!(out, "Invalid input, please enter again.")?,
            }
        }
        Ok(())
    }

    /// Writes the collected rows to `path` and stops the source. The source
    /// is stopped even if writing fails.
    pub fn finish(self, path: impl AsRef<Path>) -> Result<Dataset, SessionError> {
        info!("Data collection ended, saving {} rows", self.dataset.len());
        let saved = self.dataset.to_path(path);
        self.source.stop();
        saved?;
        Ok(self.dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_source::ScriptedSource;
    use crate::RAW_WIDTH;
    use tempfile::NamedTempFile;

    fn quick() -> AcquisitionConfig {
        AcquisitionConfig::new(0.003, 1000.0)
    }

    #[test]
    fn commands_parse() {
        assert_eq!("4".parse::<Command>(), Ok(Command::End));
        assert_eq!(" 1\r".parse::<Command>(), Ok(Command::Collect(Label::Top)));
        assert!("5".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
        assert!("-1".parse::<Command>().is_err());
    }

    #[test]
    fn labels_are_collected_in_order() {
        let mut src = ScriptedSource::new((0..9).map(|i| vec![i as f64; RAW_WIDTH]));
        let mut session =
            LabelingSession::new(&mut src, BaselineVector::zero(), quick(), Duration::ZERO);
        let mut out = Vec::new();

        session.run("1\nbanana\n3\n7\n0\n4\n2\n".as_bytes(), &mut out).unwrap();

        let labels: Vec<Label> = session.dataset().rows().iter().map(|r| r.label).collect();
        assert_eq!(
            labels,
            [[Label::Top; 3], [Label::Right; 3], [Label::NoPress; 3]].concat()
        );
        let firsts: Vec<f64> = session
            .dataset()
            .rows()
            .iter()
            .map(|r| r.features.values()[0])
            .collect();
        assert_eq!(firsts, (0..9).map(|i| i as f64).collect::<Vec<_>>());

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Invalid input, please enter again.").count(), 2);
        assert_eq!(text.matches(PROMPT).count(), 6);
    }

    #[test]
    fn garbled_bytes_are_rejected_not_fatal() {
        let mut src = ScriptedSource::new((0..9).map(|i| vec![i as f64; RAW_WIDTH]));
        let mut session =
            LabelingSession::new(&mut src, BaselineVector::zero(), quick(), Duration::ZERO);
        let mut out = Vec::new();

        session
            .run(&b"1\n\xff\xfe\n0\n4\n"[..], &mut out)
            .unwrap();

        assert_eq!(session.dataset().len(), 6);
        assert_eq!(session.dataset().count(Label::Top), 3);
        assert_eq!(session.dataset().count(Label::NoPress), 3);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Invalid input, please enter again.").count(), 1);
    }

    #[test]
    fn rows_survive_a_failed_read() {
        struct Broken<'a>(&'a [u8]);

        impl io::Read for Broken<'_> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.0.is_empty() {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
                }
                let n = self.0.len().min(buf.len());
                buf[..n].copy_from_slice(&self.0[..n]);
                self.0 = &self.0[n..];
                Ok(n)
            }
        }

        let mut src = ScriptedSource::new(vec![vec![1.0; RAW_WIDTH]; 3]);
        let file = NamedTempFile::new().unwrap();
        let mut session =
            LabelingSession::new(&mut src, BaselineVector::zero(), quick(), Duration::ZERO);
        let res = session.run(io::BufReader::new(Broken(b"3\n")), io::sink());
        assert!(matches!(res, Err(SessionError::Io(_))));
        assert_eq!(session.finish(file.path()).unwrap().count(Label::Right), 3);
        assert_eq!(Dataset::from_path(file.path()).unwrap().len(), 3);
    }

    #[test]
    fn row_count_is_the_sum_of_each_collection() {
        let mut src = ScriptedSource::new(vec![vec![0.0; RAW_WIDTH]; 5]);
        let mut session =
            LabelingSession::new(&mut src, BaselineVector::zero(), quick(), Duration::ZERO);
        let mut sink = io::sink();
        let a = session.collect(Label::Left, &mut sink).unwrap();
        let b = session.collect(Label::Right, &mut sink).unwrap();
        let c = session.collect(Label::Top, &mut sink).unwrap();
        assert_eq!((a, b, c), (3, 2, 0));
        assert_eq!(session.dataset().len(), a + b + c);
    }

    #[test]
    fn finish_saves_and_stops() {
        let mut src = ScriptedSource::new(vec![vec![2.0; RAW_WIDTH]; 3]);
        let file = NamedTempFile::new().unwrap();
        {
            let mut session =
                LabelingSession::new(&mut src, BaselineVector::zero(), quick(), Duration::ZERO);
            session.run("2\n".as_bytes(), io::sink()).unwrap();
            let saved = session.finish(file.path()).unwrap();
            assert_eq!(saved.count(Label::Left), 3);
        }
        assert!(src.is_stopped());
        assert_eq!(Dataset::from_path(file.path()).unwrap().len(), 3);
    }

    #[test]
    fn failed_export_is_fatal_but_still_stops() {
        let mut src = ScriptedSource::new(vec![]);
        let dir = tempfile::tempdir().unwrap();
        let session =
            LabelingSession::new(&mut src, BaselineVector::zero(), quick(), Duration::ZERO);
        // A directory cannot be opened as a file.
        assert!(matches!(
            session.finish(dir.path()),
            Err(SessionError::Dataset(DatasetError::Io(_)))
        ));
        assert!(src.is_stopped());
    }
}
