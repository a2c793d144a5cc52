//! # Chart Widgets
//!
//! One line chart per channel.

use ratatui::layout::{Alignment, Constraint};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::Span;
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, LegendPosition, Paragraph};

use crate::telemetry::Channel;

/// Placeholder shown before the first sample
pub const WAITING_MESSAGE: &str = "Waiting for data...";

/// X axis title, shown on the bottom row of charts
pub const TIME_AXIS_TITLE: &str = "Time (s)";

/// Line color per channel
pub fn channel_color(channel: Channel) -> Color {
    match channel {
        Channel::Temperature => Color::Red,
        Channel::Voltage => Color::Blue,
        Channel::Current => Color::Green,
        Channel::Power => Color::Magenta,
    }
}

/// Whether the channel sits on the bottom row of the 2x2 grid
pub fn is_bottom_row(channel: Channel) -> bool {
    matches!(channel, Channel::Current | Channel::Power)
}

/// Min, mid and max labels for an axis
pub fn axis_labels(bounds: [f64; 2], precision: usize) -> Vec<Span<'static>> {
    let [lo, hi] = bounds;
    let mid = (lo + hi) / 2.0;

    [lo, mid, hi]
        .iter()
        .map(|v| Span::raw(format!("{:.*}", precision, v)))
        .collect()
}

fn panel_block(channel: Channel) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            channel.title(),
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
}

/// Line chart of one channel over the buffered time range
///
/// # Arguments
///
/// * `channel` - Channel being drawn (sets title, color and labels)
/// * `data` - (time, value) points, oldest first
/// * `x_bounds` - Time range
/// * `y_bounds` - Value range, already padded
pub fn build_chart<'a>(
    channel: Channel,
    data: &'a [(f64, f64)],
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) -> Chart<'a> {
    let dataset = Dataset::default()
        .name(channel.label())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(channel_color(channel)))
        .data(data);

    let x_title = if is_bottom_row(channel) { TIME_AXIS_TITLE } else { "" };
    let y_precision = if channel == Channel::Current { 2 } else { 1 };

    Chart::new(vec![dataset])
        .block(panel_block(channel))
        .x_axis(
            Axis::default()
                .title(x_title)
                .style(Style::default().fg(Color::Gray))
                .bounds(x_bounds)
                .labels(axis_labels(x_bounds, 0)),
        )
        .y_axis(
            Axis::default()
                .title(channel.label())
                .style(Style::default().fg(Color::Gray))
                .bounds(y_bounds)
                .labels(axis_labels(y_bounds, y_precision)),
        )
        .legend_position(Some(LegendPosition::TopRight))
        .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)))
}

/// Empty panel for a channel with no samples yet
pub fn waiting_panel(channel: Channel) -> Paragraph<'static> {
    Paragraph::new(WAITING_MESSAGE)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray))
        .block(panel_block(channel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_colors() {
        assert_eq!(channel_color(Channel::Temperature), Color::Red);
        assert_eq!(channel_color(Channel::Voltage), Color::Blue);
        assert_eq!(channel_color(Channel::Current), Color::Green);
        assert_eq!(channel_color(Channel::Power), Color::Magenta);
    }

    #[test]
    fn test_bottom_row() {
        assert!(!is_bottom_row(Channel::Temperature));
        assert!(!is_bottom_row(Channel::Voltage));
        assert!(is_bottom_row(Channel::Current));
        assert!(is_bottom_row(Channel::Power));
    }

    #[test]
    fn test_axis_labels() {
        let labels = axis_labels([10.0, 40.0], 1);
        let text: Vec<String> = labels.iter().map(|s| s.content.to_string()).collect();
        assert_eq!(text, vec!["10.0", "25.0", "40.0"]);
    }

    #[test]
    fn test_axis_labels_integer_precision() {
        let labels = axis_labels([0.0, 99.0], 0);
        let text: Vec<String> = labels.iter().map(|s| s.content.to_string()).collect();
        assert_eq!(text, vec!["0", "50", "99"]);
    }
}
