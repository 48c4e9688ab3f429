use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Gauge, Paragraph},
};

use crate::board::{ChartTarget, ProgressBar, Tone};
use crate::ui::utils::{format_vote_value, truncate_label};

/// Chart values are fractional for weighted votes; bars take integers.
const VALUE_SCALE: f64 = 100.0;
const MIN_BAR_WIDTH: u16 = 3;
const MAX_BAR_WIDTH: u16 = 14;
const BAR_GAP: u16 = 1;

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Affirmative => Color::Green,
        Tone::Warning => Color::Yellow,
    }
}

/// Render one target: participation gauge on top, results chart below.
pub fn render_target(f: &mut Frame, target: &ChartTarget, area: Rect) {
    let block = Block::default()
        .title(target.key.title())
        .borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Participation
            Constraint::Min(0),    // Results
        ])
        .split(inner);

    match &target.bar {
        Some(bar) => render_vote_gauge(f, bar, chunks[0]),
        None => render_placeholder(f, "Waiting for votes...", chunks[0]),
    }
    render_target_chart(f, target, chunks[1]);
}

pub fn render_vote_gauge(f: &mut Frame, bar: &ProgressBar, area: Rect) {
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(tone_color(bar.tone)).bg(Color::Black))
        .ratio(bar.ratio())
        .label(format!("{} ({:.1}%)", bar.label, bar.percent));
    f.render_widget(gauge, area);
}

pub fn render_target_chart(f: &mut Frame, target: &ChartTarget, area: Rect) {
    let Some(chart) = target.chart.as_ref().filter(|c| !c.bars.is_empty()) else {
        render_placeholder(f, "No results yet", area);
        return;
    };

    let count = chart.bars.len() as u16;
    let bar_width = (area.width.saturating_sub(BAR_GAP * count) / count.max(1))
        .clamp(MIN_BAR_WIDTH, MAX_BAR_WIDTH);

    let bars: Vec<Bar<'_>> = chart
        .bars
        .iter()
        .map(|bar| {
            Bar::default()
                .value((bar.value * VALUE_SCALE).round() as u64)
                .label(Line::styled(
                    truncate_label(&bar.label, bar_width as usize),
                    Style::default().fg(bar.border),
                ))
                .text_value(format_vote_value(bar.value))
                .style(Style::default().fg(bar.fill))
                .value_style(
                    Style::default()
                        .fg(Color::Black)
                        .bg(bar.fill)
                        .add_modifier(Modifier::BOLD),
                )
        })
        .collect();

    let max = (chart.max_value() * VALUE_SCALE).round().max(1.0) as u64;
    let bar_chart = BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(BAR_GAP)
        .max(max)
        .label_style(Style::default().fg(Color::White));
    f.render_widget(bar_chart, area);
}

fn render_placeholder(f: &mut Frame, text: &str, area: Rect) {
    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))
        .alignment(Alignment::Center);
    f.render_widget(paragraph, area);
}
