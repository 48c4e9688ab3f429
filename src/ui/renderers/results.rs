use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::board::ChartTarget;
use crate::results::TargetKey;
use crate::types::App;
use crate::ui::charts::render_target;

const GROUPS_PER_ROW: usize = 3;

/// Render the live results dashboard
pub fn render(f: &mut Frame, app: &App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Charts
            Constraint::Length(3), // Status
        ])
        .split(f.size());

    render_title(f, app, main_chunks[0]);
    if app.board.is_empty() {
        render_waiting(f, app, main_chunks[1]);
    } else {
        render_charts(f, app, main_chunks[1]);
    }
    render_status(f, app, main_chunks[2]);
}

fn render_title(f: &mut Frame, app: &App, area: Rect) {
    let question = match app.question_count {
        Some(count) => format!("Question {}/{}", app.query.question_no, count),
        None => format!("Question {}", app.query.question_no),
    };
    let event = match &app.query.comp_slug {
        Some(comp) => format!("{}/{}", comp, app.query.event_slug),
        None => app.query.event_slug.clone(),
    };
    let block = Block::default()
        .title(format!("votewatch - {} - {}", event, question))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let (auto_text, auto_style) = if app.auto_refresh {
        (format!("auto: on ({}s)", app.interval.as_secs()), Style::default().fg(Color::Green))
    } else {
        ("auto: off".to_string(), Style::default().fg(Color::DarkGray))
    };
    let nav = Line::from(vec![
        Span::raw("q: quit | a: auto-refresh | r: refresh | ←/→: question | Tab: settings | "),
        Span::styled(auto_text, auto_style.add_modifier(Modifier::BOLD)),
    ]);
    f.render_widget(Paragraph::new(nav), inner);
}

fn render_waiting(f: &mut Frame, app: &App, area: Rect) {
    let text = if app.last_error.is_some() {
        "No results could be loaded for this question yet."
    } else {
        "Waiting for the first results..."
    };
    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

/// Global results on top, group results in rows underneath.
fn render_charts(f: &mut Frame, app: &App, area: Rect) {
    let global = app.board.target(TargetKey::Global);
    let groups: Vec<&ChartTarget> = app
        .board
        .targets()
        .filter(|t| t.key != TargetKey::Global)
        .collect();

    let rows = groups.len().div_ceil(GROUPS_PER_ROW);
    let constraints: Vec<Constraint> = match (global.is_some(), rows) {
        (true, 0) => vec![Constraint::Min(0)],
        (true, _) => std::iter::once(Constraint::Ratio(1, 2))
            .chain(std::iter::repeat(Constraint::Ratio(1, 2 * rows as u32)).take(rows))
            .collect(),
        (false, _) => vec![Constraint::Ratio(1, rows as u32); rows],
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let mut next = 0;
    if let Some(target) = global {
        render_target(f, target, chunks[0]);
        next = 1;
    }
    for (row, row_targets) in groups.chunks(GROUPS_PER_ROW).enumerate() {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, GROUPS_PER_ROW as u32); GROUPS_PER_ROW])
            .split(chunks[next + row]);
        for (column, target) in row_targets.iter().enumerate() {
            render_target(f, target, columns[column]);
        }
    }
}

/// Notification first, then the last error, then poll statistics.
fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let (text, style) = if let Some(msg) = &app.notification {
        let style = if msg.starts_with("✅") {
            Style::default().fg(Color::Green)
        } else if msg.starts_with("❌") {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Yellow)
        };
        (msg.clone(), style)
    } else if let Some((at, error)) = &app.last_error {
        (
            format!("❌ {} Last request failed: {}", at.format("%H:%M:%S"), error),
            Style::default().fg(Color::Red),
        )
    } else {
        let updated = app
            .last_update
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        (
            format!(
                "Updated: {} | Polls: {} ok, {} failed | Quorum: {}% \
                 | Redraws: {} | Charts: {} | Up: {}s",
                updated,
                app.polls_ok,
                app.polls_failed,
                app.board.quorum().percent(),
                app.board.redraws(),
                app.board.live_charts(),
                app.start_time.elapsed().as_secs()
            ),
            Style::default(),
        )
    };

    let status = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, area);
}
