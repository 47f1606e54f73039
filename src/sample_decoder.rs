//! Decodes the ASCII lines a ReSkin board streams over serial.
//!
//! In burst mode the board prints one reading per line: for every
//! magnetometer a temperature followed by `Bx`, `By` and `Bz`, separated by
//! tabs or spaces (commas are tolerated too):
//!
//! ```text
//! 31.5	-120.25	44.0	-1022.5	31.6	-98.0	51.75	-987.0 ...
//! ```
//!
//! Boards flashed with temperature filtering drop the temperature and send
//! three values per magnetometer.

use nom::{
    branch::alt,
    character::complete::{char, space0, space1},
    combinator::{all_consuming, value},
    multi::separated_list1,
    number::complete::double,
    sequence::delimited,
    Finish, IResult,
};

use std::fmt;

use crate::VALUES_PER_MAG;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub line: String,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not decode reading {:?}", self.line)
    }
}

impl std::error::Error for DecodeError {}

fn separator(s: &str) -> IResult<&str, ()> {
    alt((value((), delimited(space0, char(','), space0)), value((), space1)))(s)
}

fn parse_values(s: &str) -> IResult<&str, Vec<f64>> {
    all_consuming(delimited(space0, separated_list1(separator, double), space0))(s)
}

/// Parses one line into its numeric values. With `temp_filtered`, a line of
/// exactly three values per magnetometer is widened back to four per
/// magnetometer with a zero in each temperature slot, so downstream code
/// always sees the same layout. Lines of any other length come back as they
/// are and are left for the consumer to reject.
pub fn decode_reading(
    line: &str,
    num_mags: usize,
    temp_filtered: bool,
) -> Result<Vec<f64>, DecodeError> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    let values = match parse_values(trimmed).finish() {
        Ok((_, values)) => values,
        Err(_) => {
            return Err(DecodeError {
                line: trimmed.to_owned(),
            })
        }
    };

    if temp_filtered && values.len() == num_mags * (VALUES_PER_MAG - 1) {
        return Ok(values
            .chunks(VALUES_PER_MAG - 1)
            .flat_map(|axes| std::iter::once(0.0).chain(axes.iter().copied()))
            .collect());
    }
    Ok(values)
}
