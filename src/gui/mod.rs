//! Terminal front end for the live monitor.

mod error;
mod live_plot;

pub use error::GuiError;
pub use live_plot::{live_plot, LivePlot};
