//! Reading and writing labeled datasets as CSV.
//!
//! A dataset file starts with the header
//!
//! ```text
//! Bx0,By0,Bz0,Bx1,By1,Bz1,Bx2,By2,Bz2,Bx3,By3,Bz3,Bx4,By4,Bz4,label
//! ```
//!
//! followed by one [`FeatureRow`] per line. The header names are positional:
//! the 15 value columns hold the features in the group-major order produced
//! by [`AdjustedSample::features`](crate::features::AdjustedSample::features),
//! and downstream models read them by position.

use std::{borrow::Cow, fmt, fs::File, io, path::Path};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use log::info;

use crate::features::{dataset_header, FeatureRow, FeatureVector, Label, FEATURE_WIDTH};

/// Ways loading or saving a [`Dataset`] can fail.
#[derive(Debug)]
pub enum DatasetError {
    /// Opening or writing the file failed.
    Io(io::Error),
    /// The CSV layer failed, including malformed quoting and ragged rows.
    Csv(csv::Error),
    /// The header line is not the dataset header.
    BadHeader(Vec<String>),
    /// A row does not have 16 fields.
    BadWidth { line: u64, width: usize },
    /// A value does not parse as a number.
    BadValue { line: u64, column: usize, value: String },
    /// The label column is not 0, 1, 2 or 3.
    BadLabel { line: u64, value: String },
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use DatasetError as DE;
        let msg = match self {
            DE::Io(error) => Cow::from(format!("io error: {}", error)),
            DE::Csv(error) => Cow::from(format!("csv error: {}", error)),
            DE::BadHeader(found) => Cow::from(format!("unexpected header {:?}", found)),
            DE::BadWidth { line, width } => {
                Cow::from(format!("line {}: expected {} fields, got {}", line, FEATURE_WIDTH + 1, width))
            }
            DE::BadValue {
                line,
                column,
                value,
            } => Cow::from(format!("line {}, column {}: {:?} is not a number", line, column, value)),
            DE::BadLabel { line, value } => {
                Cow::from(format!("line {}: {:?} is not a label", line, value))
            }
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for DatasetError {}

impl From<io::Error> for DatasetError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for DatasetError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

/// An ordered collection of labeled rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<FeatureRow>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `rows` after everything already in the dataset.
    pub fn extend(&mut self, rows: impl IntoIterator<Item = FeatureRow>) {
        self.rows.extend(rows);
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows carrying `label`.
    pub fn count(&self, label: Label) -> usize {
        self.rows.iter().filter(|r| r.label == label).count()
    }

    /// Write out the dataset to the path provided, replacing any file there.
    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let path = path.as_ref();
        let handle = File::create(path)?;
        self.to_writer(handle)?;
        info!("Wrote {} rows to {}", self.len(), path.display());
        Ok(())
    }

    /// Write out the dataset to the [io::Write]able object provided.
    pub fn to_writer(&self, writer: impl io::Write) -> Result<(), DatasetError> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
        writer.write_record(dataset_header())?;
        for row in &self.rows {
            let record = row
                .features
                .values()
                .iter()
                .map(f64::to_string)
                .chain(std::iter::once(row.label.index().to_string()));
            writer.write_record(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a dataset from the path provided.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        Self::from_reader(File::open(path)?)
    }

    /// Read a dataset from the [io::Read]able object provided.
    pub fn from_reader(reader: impl io::Read) -> Result<Self, DatasetError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let header: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_owned()).collect();
        if header != dataset_header() {
            return Err(DatasetError::BadHeader(header));
        }

        let rows = reader
            .records()
            .map(|record| parse_row(&record?))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    /// Reads every path in order and concatenates the results.
    pub fn concat<P: AsRef<Path>>(paths: &[P]) -> Result<Self, DatasetError> {
        let mut dataset = Self::new();
        for path in paths {
            let part = Self::from_path(path)?;
            info!("Loaded {} rows from {}", part.len(), path.as_ref().display());
            dataset.extend(part.rows);
        }
        Ok(dataset)
    }
}

impl FromIterator<FeatureRow> for Dataset {
    fn from_iter<I: IntoIterator<Item = FeatureRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

fn parse_row(record: &StringRecord) -> Result<FeatureRow, DatasetError> {
    let line = record.position().map(|p| p.line()).unwrap_or(0);
    if record.len() != FEATURE_WIDTH + 1 {
        return Err(DatasetError::BadWidth {
            line,
            width: record.len(),
        });
    }

    let mut features = [0.0; FEATURE_WIDTH];
    for (column, (slot, field)) in features.iter_mut().zip(record.iter()).enumerate() {
        *slot = field.trim().parse().map_err(|_| DatasetError::BadValue {
            line,
            column,
            value: field.to_owned(),
        })?;
    }

    let label_field = &record[FEATURE_WIDTH];
    let label = label_field
        .parse::<Label>()
        .map_err(|_| DatasetError::BadLabel {
            line,
            value: label_field.to_owned(),
        })?;

    Ok(FeatureRow::new(FeatureVector::new(features), label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn row(seed: f64, label: Label) -> FeatureRow {
        let mut v = [0.0; FEATURE_WIDTH];
        v.iter_mut()
            .enumerate()
            .for_each(|(i, x)| *x = seed * (i as f64 + 1.0) - 0.1);
        FeatureRow::new(FeatureVector::new(v), label)
    }

    #[test]
    fn write_then_read_gives_the_same_rows() {
        let dataset: Dataset = vec![
            row(1.5, Label::NoPress),
            row(-37.25, Label::Top),
            row(1.0 / 3.0, Label::Left),
            row(1e-9, Label::Right),
        ]
        .into_iter()
        .collect();

        let file = NamedTempFile::new().unwrap();
        dataset.to_path(file.path()).unwrap();
        let back = Dataset::from_path(file.path()).unwrap();

        assert_eq!(back, dataset);
    }

    #[test]
    fn output_starts_with_the_header() {
        let dataset: Dataset = vec![row(1.0, Label::Left)].into_iter().collect();
        let mut buf = Vec::new();
        dataset.to_writer(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Bx0,By0,Bz0,Bx1,By1,Bz1,Bx2,By2,Bz2,Bx3,By3,Bz3,Bx4,By4,Bz4,label")
        );
        assert!(lines.next().unwrap().ends_with(",2"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn empty_dataset_is_just_a_header() {
        let mut buf = Vec::new();
        Dataset::new().to_writer(&mut buf).unwrap();
        let back = Dataset::from_reader(buf.as_slice()).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn wrong_header_is_rejected() {
        let text = "a,b,c\n1,2,3\n";
        assert!(matches!(
            Dataset::from_reader(text.as_bytes()),
            Err(DatasetError::BadHeader(_))
        ));
    }

    #[test]
    fn bad_rows_are_rejected() {
        let header = dataset_header().join(",");
        let short = format!("{}\n1,2,3\n", header);
        assert!(matches!(
            Dataset::from_reader(short.as_bytes()),
            Err(DatasetError::BadWidth { width: 3, .. })
        ));

        let label = format!("{}\n{}7\n", header, "0,".repeat(FEATURE_WIDTH));
        assert!(matches!(
            Dataset::from_reader(label.as_bytes()),
            Err(DatasetError::BadLabel { .. })
        ));

        let value = format!("{}\nx,{}1\n", header, "0,".repeat(FEATURE_WIDTH - 1));
        assert!(matches!(
            Dataset::from_reader(value.as_bytes()),
            Err(DatasetError::BadValue { column: 0, .. })
        ));
    }

    #[test]
    fn concat_keeps_file_order() {
        let a: Dataset = vec![row(1.0, Label::Top)].into_iter().collect();
        let b: Dataset = vec![row(2.0, Label::Left), row(3.0, Label::Right)]
            .into_iter()
            .collect();
        let fa = NamedTempFile::new().unwrap();
        let fb = NamedTempFile::new().unwrap();
        a.to_path(fa.path()).unwrap();
        b.to_path(fb.path()).unwrap();

        let both = Dataset::concat(&[fa.path(), fb.path()]).unwrap();
        let labels: Vec<Label> = both.rows().iter().map(|r| r.label).collect();
        assert_eq!(labels, vec![Label::Top, Label::Left, Label::Right]);
        assert_eq!(both.count(Label::Left), 1);
    }
}
