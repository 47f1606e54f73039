//! ReSkin is a soft magnetic skin: a thin elastomer loaded with magnetic
//! particles sits over a board of five magnetometers, and pressing the skin
//! shifts the field each magnetometer sees. This crate is the host-side
//! software that reads those magnetometers, records labeled datasets of
//! where the skin was pressed, and plots the live field with an optional
//! press-location prediction on top.
//!
//! Every tool follows the same shape:
//!
//! 1. poll a [`SampleSource`](sample_source::SampleSource) for a few seconds
//!    to [estimate a baseline](baseline::estimate_baseline),
//! 2. subtract that baseline from every later reading,
//! 3. either [collect labeled rows](collector::collect_labeled) or push the
//!    readings through the [live feed](visual_feed::VisualFeed).

#![warn(missing_docs)]
pub mod acquisition;
pub mod args;
pub mod baseline;
pub mod collector;
pub mod config;
pub mod dataset;
pub mod dummy_source;
pub mod features;
pub mod gui;
pub mod inference;
pub mod ring_buffer;
pub mod sample_decoder;
pub mod sample_source;
pub mod serial_source;
pub mod session;
pub mod visual_feed;

/// Magnetometers on a ReSkin board.
pub const NUM_MAGS: usize = 5;

/// Values each magnetometer reports: a temperature, then Bx, By, Bz.
pub const VALUES_PER_MAG: usize = 4;

/// Width of a well-formed raw reading.
pub const RAW_WIDTH: usize = NUM_MAGS * VALUES_PER_MAG;

/// An iterator function that transposes the order of iteration based on
/// [this StackOverflow answer](https://stackoverflow.com/a/75477884/17443903).
/// Transposing zero rows yields nothing.
pub struct TransposeIter<I, T>
where
    I: IntoIterator<Item = T>,
{
    iterators: Vec<I::IntoIter>,
}

#[allow(missing_docs)]
pub trait TransposableIter<I, T>
where
    Self: Sized,
    Self: IntoIterator<Item = I>,
    I: IntoIterator<Item = T>,
{
    fn transpose(self) -> TransposeIter<I, T> {
        let iterators: Vec<_> = self.into_iter().map(|i| i.into_iter()).collect();
        TransposeIter { iterators }
    }
}

impl<I, T> Iterator for TransposeIter<I, T>
where
    I: IntoIterator<Item = T>,
{
    type Item = Vec<T>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.iterators.is_empty() {
            return None;
        }
        let output: Option<Vec<T>> = self.iterators.iter_mut().map(|iter| iter.next()).collect();
        output
    }
}

impl<I, T, Any> TransposableIter<I, T> for Any
where
    Any: IntoIterator<Item = I>,
    I: IntoIterator<Item = T>,
{
}
