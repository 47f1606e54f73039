use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, warn};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame, Terminal,
};
use std::{
    io,
    time::{Duration, Instant},
};

use super::GuiError;
use crate::features::{channel_names, Label, AXES};
use crate::ring_buffer::RingBuffer;
use crate::sample_source::SampleSource;
use crate::visual_feed::{FeedFrame, RenderSink, VisualFeed};
use crate::NUM_MAGS;

/// Field strength shown on every plot, in sensor units either side of zero.
const Y_LIMIT: f64 = 1000.0;

const AXIS_COLORS: [Color; 3] = [Color::Red, Color::Green, Color::Cyan];

/// What is on screen: the last frame the feed handed over.
pub struct LivePlot {
    names: Vec<String>,
    points: Vec<Vec<(f64, f64)>>,
    prediction: Option<Label>,
    capacity: usize,
    show_prediction: bool,
    connected: bool,
}

impl LivePlot {
    /// A blank plot with room for `capacity` samples per channel.
    pub fn new(capacity: usize, show_prediction: bool) -> Self {
        Self {
            names: channel_names(),
            points: vec![],
            prediction: None,
            capacity,
            show_prediction,
            connected: true,
        }
    }
}

impl RenderSink for LivePlot {
    fn render(&mut self, frame: FeedFrame<'_>) {
        self.points = frame.channels.iter().map(RingBuffer::points).collect();
        self.prediction = frame.prediction;
    }
}

/// Takes over the terminal and plots `feed` until `q` is pressed. A source
/// that goes away leaves the last frame on screen, marked as disconnected.
pub fn live_plot(
    feed: &mut VisualFeed,
    source: &mut dyn SampleSource,
    tick_rate: Duration,
) -> Result<(), GuiError> {
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let capacity = feed.channels().first().map_or(0, RingBuffer::capacity);
    let mut plot = LivePlot::new(capacity, feed.has_overlay());
    let res = run_app(&mut terminal, feed, source, &mut plot, tick_rate);

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    feed: &mut VisualFeed,
    source: &mut dyn SampleSource,
    plot: &mut LivePlot,
    tick_rate: Duration,
) -> Result<(), GuiError> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| ui(f, &*plot))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if let KeyCode::Char('q') = key.code {
                    info!("Monitor closed");
                    return Ok(());
                }
            }
        }
        if last_tick.elapsed() >= tick_rate {
            if plot.connected && !source.is_alive() {
                warn!("Sensor stopped responding");
            }
            plot.connected = source.is_alive();
            feed.tick(source, plot);
            last_tick = Instant::now();
        }
    }
}

/// One row per magnetometer, one column per axis, with the prediction line
/// underneath when an overlay is running.
fn ui(f: &mut Frame, plot: &LivePlot) {
    let footer = if plot.show_prediction || !plot.connected { 3 } else { 0 };
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(footer)])
        .split(f.size());

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, NUM_MAGS as u32); NUM_MAGS])
        .split(outer[0]);
    for (mag, row) in rows.iter().enumerate() {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, AXES.len() as u32); 3])
            .split(*row);
        for (axis, cell) in cells.iter().enumerate() {
            draw_channel(f, plot, mag * AXES.len() + axis, *cell);
        }
    }

    if footer > 0 {
        let text = match (plot.connected, plot.prediction) {
            (false, _) => "Sensor disconnected, press q to quit".to_owned(),
            (true, Some(label)) => format!("Current press location: {}", label),
            (true, None) => "Current press location: unknown".to_owned(),
        };
        let paragraph = Paragraph::new(text).block(Block::default().borders(Borders::ALL));
        f.render_widget(paragraph, outer[1]);
    }
}

fn draw_channel(f: &mut Frame, plot: &LivePlot, channel: usize, area: Rect) {
    let color = AXIS_COLORS[channel % AXIS_COLORS.len()];
    let data = plot.points.get(channel).map_or(&[][..], Vec::as_slice);
    let chart = Chart::new(vec![Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(data)])
    .block(
        Block::default()
            .title(plot.names[channel].as_str())
            .borders(Borders::ALL),
    )
    .x_axis(
        Axis::default()
            .style(Style::default().fg(Color::White))
            .bounds([0.0, plot.capacity as f64]),
    )
    .y_axis(
        Axis::default()
            .style(Style::default().fg(Color::White))
            .bounds([-Y_LIMIT, Y_LIMIT])
            .labels(
                ["-1000", "0", "1000"]
                    .iter()
                    .cloned()
                    .map(Span::from)
                    .collect(),
            ),
    );

    f.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn screen(plot: &LivePlot) -> String {
        let mut terminal = Terminal::new(TestBackend::new(150, 50)).unwrap();
        terminal.draw(|f| ui(f, plot)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn every_channel_gets_a_plot() {
        let plot = LivePlot::new(100, false);
        let text = screen(&plot);
        for name in channel_names() {
            assert!(text.contains(&name), "{} missing", name);
        }
        assert!(!text.contains("Current press location"));
    }

    #[test]
    fn prediction_is_shown_with_an_overlay() {
        let mut plot = LivePlot::new(100, true);
        let mut buffers: Vec<RingBuffer<f64>> = (0..15).map(|_| RingBuffer::new(100)).collect();
        buffers[0].push(500.0);
        plot.render(FeedFrame {
            channels: &buffers,
            prediction: Some(Label::Left),
        });
        assert_eq!(plot.points[0], vec![(0.0, 500.0)]);
        assert!(screen(&plot).contains("Current press location: Left"));
    }

    #[test]
    fn lost_sensor_is_flagged() {
        let mut plot = LivePlot::new(100, false);
        plot.connected = false;
        assert!(screen(&plot).contains("Sensor disconnected"));
    }
}
